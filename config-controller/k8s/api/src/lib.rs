#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;
pub mod networking;
pub mod security;

pub use self::labels::Selector;
pub use k8s_openapi::api::{
    self,
    core::v1::{Namespace, Pod, Service},
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
pub use kube::{
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Resource, ResourceExt,
};
