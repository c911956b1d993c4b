//! Services over the mesh configuration engine: listing and editing configuration across
//! clusters, validating it with cross-references, and resolving write permissions.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use mesh_config_core as core;
pub use mesh_config_k8s_api as k8s;
pub use mesh_config_k8s_index as index;
pub use mesh_config_validation as validation;

mod args;
pub mod cache;
pub mod clusters;
pub mod config;
pub mod permissions;
pub mod store;
pub mod validations;

#[cfg(test)]
mod fake;

pub use self::{
    args::Args,
    cache::ObjectCache,
    clusters::Clusters,
    config::{ConfigDetails, ConfigList, ConfigService, MultiClusterList},
    permissions::{AccessPolicy, PermissionResolver},
    store::KubeStore,
    validations::{ValidationService, Validations},
};
