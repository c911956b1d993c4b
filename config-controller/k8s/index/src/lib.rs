//! Mesh configuration cross-reference index.
//!
//! An [`Index`] is built per request from the objects fetched from each cluster, the mesh
//! registry's snapshot, and the known workloads and namespaces. It answers the questions that
//! validation needs to ask of the configuration as a whole:
//!
//! - Which hosts resolve to services or `ServiceEntry` hosts (see [`host`]).
//! - Which objects are visible from a namespace under `exportTo` rules (see [`export_to`]).
//! - Whether a destination rule applies circuit breaking to a service version (see [`subset`]).
//! - What each object references (see [`references`]).
//!
//! ```text
//! [ Gateway ] <- [ VirtualService ] -> [ Service ] <- [ DestinationRule ] <- [ ServiceEntry ]
//!      |                                                    |
//!      v                                                    v
//! [ Workload ] <- [ Sidecar | AuthorizationPolicy | PeerAuthentication | ... ]
//! ```

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod export_to;
pub mod host;
mod index;
mod mesh_info;
pub mod references;
pub mod subset;

pub use self::{
    index::{Index, IndexBuilder},
    mesh_info::MeshInfo,
    subset::has_circuit_breaker,
};
