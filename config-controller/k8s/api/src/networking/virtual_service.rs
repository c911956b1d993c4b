use super::PortSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures traffic routing for a set of hosts.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema,
)]
#[kube(
    group = "networking.istio.io",
    version = "v1beta1",
    kind = "VirtualService",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServiceSpec {
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Gateway names as `name` or `namespace/name`. The reserved name `mesh` means all sidecars.
    #[serde(default)]
    pub gateways: Vec<String>,

    #[serde(default)]
    pub http: Vec<HttpRoute>,

    #[serde(default)]
    pub tcp: Vec<TcpRoute>,

    #[serde(default)]
    pub tls: Vec<TlsRoute>,

    #[serde(default)]
    pub export_to: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<serde_json::Value>,

    #[serde(default)]
    pub route: Vec<RouteDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TcpRoute {
    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<serde_json::Value>,

    #[serde(default)]
    pub route: Vec<RouteDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsRoute {
    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<serde_json::Value>,

    #[serde(default)]
    pub route: Vec<RouteDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct RouteDestination {
    pub destination: Destination,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Destination {
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortSelector>,
}

impl VirtualServiceSpec {
    /// Iterates over every route destination along with its JSON path in the spec.
    pub fn destinations(&self) -> impl Iterator<Item = (String, &RouteDestination)> + '_ {
        let http = self.http.iter().enumerate().flat_map(|(i, r)| {
            r.route
                .iter()
                .enumerate()
                .map(move |(j, d)| (format!("spec/http[{i}]/route[{j}]"), d))
        });
        let tcp = self.tcp.iter().enumerate().flat_map(|(i, r)| {
            r.route
                .iter()
                .enumerate()
                .map(move |(j, d)| (format!("spec/tcp[{i}]/route[{j}]"), d))
        });
        let tls = self.tls.iter().enumerate().flat_map(|(i, r)| {
            r.route
                .iter()
                .enumerate()
                .map(move |(j, d)| (format!("spec/tls[{i}]/route[{j}]"), d))
        });
        http.chain(tcp).chain(tls)
    }

    /// Iterates over the weighted route lists of every HTTP, TCP and TLS route.
    pub fn route_lists(&self) -> impl Iterator<Item = (String, &[RouteDestination])> + '_ {
        let http = self
            .http
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("spec/http[{i}]"), r.route.as_slice()));
        let tcp = self
            .tcp
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("spec/tcp[{i}]"), r.route.as_slice()));
        let tls = self
            .tls
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("spec/tls[{i}]"), r.route.as_slice()));
        http.chain(tcp).chain(tls)
    }
}
