//! `networking.istio.io` resources.

pub mod destination_rule;
pub mod envoy_filter;
pub mod gateway;
pub mod service_entry;
pub mod sidecar;
pub mod virtual_service;
pub mod workload_entry;

pub use self::{
    destination_rule::{DestinationRule, DestinationRuleSpec},
    envoy_filter::{EnvoyFilter, EnvoyFilterSpec},
    gateway::{Gateway, GatewaySpec},
    service_entry::{ServiceEntry, ServiceEntrySpec},
    sidecar::{Sidecar, SidecarSpec},
    virtual_service::{VirtualService, VirtualServiceSpec},
    workload_entry::{WorkloadEntry, WorkloadEntrySpec, WorkloadGroup, WorkloadGroupSpec},
};

use crate::labels::Map;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "networking.istio.io";

/// Workload selection as expressed by `Sidecar` and `EnvoyFilter`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct WorkloadLabels {
    #[serde(default)]
    pub labels: Map,
}

/// Workload selection as expressed by `DestinationRule` and the security resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSelector {
    #[serde(default)]
    pub match_labels: Map,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct PortSelector {
    #[serde(default)]
    pub number: u32,
}
