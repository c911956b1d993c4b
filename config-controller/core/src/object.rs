use crate::{
    k8s::{
        labels::Map,
        networking::{
            DestinationRule, DestinationRuleSpec, EnvoyFilter, EnvoyFilterSpec, Gateway,
            GatewaySpec, ServiceEntry, ServiceEntrySpec, Sidecar, SidecarSpec, VirtualService,
            VirtualServiceSpec, WorkloadEntry, WorkloadEntrySpec, WorkloadGroup,
            WorkloadGroupSpec,
        },
        security::{
            AuthorizationPolicy, AuthorizationPolicySpec, PeerAuthentication,
            PeerAuthenticationSpec, RequestAuthentication, RequestAuthenticationSpec,
        },
        DynamicObject, ObjectMeta, Selector,
    },
    ObjectKey, ObjectKind,
};
use serde::Serialize;

/// A configuration resource observed on a single cluster.
///
/// Identity is `(cluster, namespace, kind, name)`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigObject {
    pub cluster: String,
    pub namespace: String,
    pub name: String,
    pub labels: Map,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(flatten)]
    pub spec: ConfigSpec,
}

/// The kind-specific payload of a [`ConfigObject`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "spec")]
pub enum ConfigSpec {
    Gateway(GatewaySpec),
    VirtualService(VirtualServiceSpec),
    DestinationRule(DestinationRuleSpec),
    ServiceEntry(ServiceEntrySpec),
    Sidecar(SidecarSpec),
    WorkloadEntry(WorkloadEntrySpec),
    WorkloadGroup(WorkloadGroupSpec),
    EnvoyFilter(EnvoyFilterSpec),
    AuthorizationPolicy(AuthorizationPolicySpec),
    PeerAuthentication(PeerAuthenticationSpec),
    RequestAuthentication(RequestAuthenticationSpec),
}

/// Typed Istio resources that can be converted into a [`ConfigObject`].
pub trait IntoConfigObject {
    fn into_parts(self) -> (ObjectMeta, ConfigSpec);
}

macro_rules! into_config_object {
    ($($resource:ident),+ $(,)?) => {
        $(
            impl IntoConfigObject for $resource {
                fn into_parts(self) -> (ObjectMeta, ConfigSpec) {
                    (self.metadata, ConfigSpec::$resource(self.spec))
                }
            }
        )+
    };
}

into_config_object!(
    Gateway,
    VirtualService,
    DestinationRule,
    ServiceEntry,
    Sidecar,
    WorkloadEntry,
    WorkloadGroup,
    EnvoyFilter,
    AuthorizationPolicy,
    PeerAuthentication,
    RequestAuthentication,
);

// === impl ConfigObject ===

impl ConfigObject {
    pub fn new(
        cluster: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        spec: ConfigSpec,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: namespace.into(),
            name: name.into(),
            labels: Map::default(),
            resource_version: None,
            spec,
        }
    }

    pub fn from_resource(cluster: impl Into<String>, resource: impl IntoConfigObject) -> Self {
        let (meta, spec) = resource.into_parts();
        Self::from_meta(cluster.into(), meta, spec)
    }

    /// Decodes an untyped API object of the given kind.
    pub fn from_dynamic(
        cluster: impl Into<String>,
        kind: ObjectKind,
        obj: DynamicObject,
    ) -> Result<Self, serde_json::Error> {
        let spec = obj
            .data
            .get("spec")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        let spec = ConfigSpec::from_json(kind, spec)?;
        Ok(Self::from_meta(cluster.into(), obj.metadata, spec))
    }

    fn from_meta(cluster: String, meta: ObjectMeta, spec: ConfigSpec) -> Self {
        Self {
            cluster,
            namespace: meta.namespace.unwrap_or_default(),
            name: meta.name.unwrap_or_default(),
            labels: meta.labels.unwrap_or_default(),
            resource_version: meta.resource_version,
            spec,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.spec.kind()
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.kind(), &self.namespace, &self.name)
    }

    /// The workload selector declared by the object, if it declares a non-empty one.
    ///
    /// Objects without a selector apply to their whole namespace.
    pub fn workload_selector(&self) -> Option<Selector> {
        let labels = match &self.spec {
            ConfigSpec::Gateway(gw) => Some(&gw.selector),
            ConfigSpec::Sidecar(sc) => sc.workload_selector.as_ref().map(|s| &s.labels),
            ConfigSpec::EnvoyFilter(ef) => ef.workload_selector.as_ref().map(|s| &s.labels),
            ConfigSpec::DestinationRule(dr) => {
                dr.workload_selector.as_ref().map(|s| &s.match_labels)
            }
            ConfigSpec::ServiceEntry(se) => se.workload_selector.as_ref().map(|s| &s.match_labels),
            ConfigSpec::AuthorizationPolicy(ap) => ap.selector.as_ref().map(|s| &s.match_labels),
            ConfigSpec::PeerAuthentication(pa) => pa.selector.as_ref().map(|s| &s.match_labels),
            ConfigSpec::RequestAuthentication(ra) => {
                ra.selector.as_ref().map(|s| &s.match_labels)
            }
            ConfigSpec::VirtualService(_)
            | ConfigSpec::WorkloadEntry(_)
            | ConfigSpec::WorkloadGroup(_) => None,
        }?;
        if labels.is_empty() {
            return None;
        }
        Some(Selector::from_map(labels.clone()))
    }

    /// The object's `exportTo` list, for kinds that carry one.
    pub fn export_to(&self) -> Option<&[String]> {
        match &self.spec {
            ConfigSpec::VirtualService(vs) => Some(&vs.export_to),
            ConfigSpec::DestinationRule(dr) => Some(&dr.export_to),
            ConfigSpec::ServiceEntry(se) => Some(&se.export_to),
            _ => None,
        }
    }

    pub fn as_gateway(&self) -> Option<&GatewaySpec> {
        match &self.spec {
            ConfigSpec::Gateway(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_virtual_service(&self) -> Option<&VirtualServiceSpec> {
        match &self.spec {
            ConfigSpec::VirtualService(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_destination_rule(&self) -> Option<&DestinationRuleSpec> {
        match &self.spec {
            ConfigSpec::DestinationRule(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_service_entry(&self) -> Option<&ServiceEntrySpec> {
        match &self.spec {
            ConfigSpec::ServiceEntry(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_sidecar(&self) -> Option<&SidecarSpec> {
        match &self.spec {
            ConfigSpec::Sidecar(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_authorization_policy(&self) -> Option<&AuthorizationPolicySpec> {
        match &self.spec {
            ConfigSpec::AuthorizationPolicy(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_peer_authentication(&self) -> Option<&PeerAuthenticationSpec> {
        match &self.spec {
            ConfigSpec::PeerAuthentication(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_request_authentication(&self) -> Option<&RequestAuthenticationSpec> {
        match &self.spec {
            ConfigSpec::RequestAuthentication(spec) => Some(spec),
            _ => None,
        }
    }
}

// === impl ConfigSpec ===

impl ConfigSpec {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Gateway(_) => ObjectKind::Gateway,
            Self::VirtualService(_) => ObjectKind::VirtualService,
            Self::DestinationRule(_) => ObjectKind::DestinationRule,
            Self::ServiceEntry(_) => ObjectKind::ServiceEntry,
            Self::Sidecar(_) => ObjectKind::Sidecar,
            Self::WorkloadEntry(_) => ObjectKind::WorkloadEntry,
            Self::WorkloadGroup(_) => ObjectKind::WorkloadGroup,
            Self::EnvoyFilter(_) => ObjectKind::EnvoyFilter,
            Self::AuthorizationPolicy(_) => ObjectKind::AuthorizationPolicy,
            Self::PeerAuthentication(_) => ObjectKind::PeerAuthentication,
            Self::RequestAuthentication(_) => ObjectKind::RequestAuthentication,
        }
    }

    pub fn from_json(kind: ObjectKind, spec: serde_json::Value) -> Result<Self, serde_json::Error> {
        use serde_json::from_value;

        Ok(match kind {
            ObjectKind::Gateway => Self::Gateway(from_value(spec)?),
            ObjectKind::VirtualService => Self::VirtualService(from_value(spec)?),
            ObjectKind::DestinationRule => Self::DestinationRule(from_value(spec)?),
            ObjectKind::ServiceEntry => Self::ServiceEntry(from_value(spec)?),
            ObjectKind::Sidecar => Self::Sidecar(from_value(spec)?),
            ObjectKind::WorkloadEntry => Self::WorkloadEntry(from_value(spec)?),
            ObjectKind::WorkloadGroup => Self::WorkloadGroup(from_value(spec)?),
            ObjectKind::EnvoyFilter => Self::EnvoyFilter(from_value(spec)?),
            ObjectKind::AuthorizationPolicy => Self::AuthorizationPolicy(from_value(spec)?),
            ObjectKind::PeerAuthentication => Self::PeerAuthentication(from_value(spec)?),
            ObjectKind::RequestAuthentication => Self::RequestAuthentication(from_value(spec)?),
        })
    }
}
