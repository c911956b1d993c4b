//! Core model of the mesh configuration engine.
//!
//! Every Istio configuration resource is represented by a single [`ConfigObject`] type whose
//! kind-specific payload is a [`ConfigSpec`] variant. Criteria parsing, selector filtering,
//! validation results and permissions are all expressed over this model so that the indexing and
//! validation crates never need to know how objects were fetched.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod criteria;
mod error;
pub mod kind;
pub mod object;
pub mod permissions;
pub mod references;
pub mod selector;
pub mod store;
pub mod validation;

pub use self::{
    criteria::ConfigCriteria,
    error::{Error, Result},
    kind::ObjectKind,
    object::{ConfigObject, ConfigSpec},
    permissions::{AccessReview, ResourcePermissions, Verb},
    references::{
        IstioReferences, ObjectKey, ReferenceKey, ReferenceMap, ServiceReference, ValidationKey,
        WorkloadReference,
    },
    store::{MeshRegistry, ObjectStore, RegistryService, RegistrySnapshot, Workload},
    validation::{Check, IstioValidation, Severity, ValidationMap},
};
pub use mesh_config_k8s_api as k8s;

/// Selects objects in every namespace.
pub const ALL_NAMESPACES: &str = "";
