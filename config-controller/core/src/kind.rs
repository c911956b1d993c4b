use crate::k8s::{networking, security, ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The configuration kinds managed by the engine.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub enum ObjectKind {
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
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported object kind: {0}")]
pub struct UnknownKind(pub String);

// === impl ObjectKind ===

impl ObjectKind {
    pub const ALL: [ObjectKind; 11] = [
        Self::Gateway,
        Self::VirtualService,
        Self::DestinationRule,
        Self::ServiceEntry,
        Self::Sidecar,
        Self::WorkloadEntry,
        Self::WorkloadGroup,
        Self::EnvoyFilter,
        Self::AuthorizationPolicy,
        Self::PeerAuthentication,
        Self::RequestAuthentication,
    ];

    /// The plural resource name, used in requests and in RBAC reviews.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Gateway => "gateways",
            Self::VirtualService => "virtualservices",
            Self::DestinationRule => "destinationrules",
            Self::ServiceEntry => "serviceentries",
            Self::Sidecar => "sidecars",
            Self::WorkloadEntry => "workloadentries",
            Self::WorkloadGroup => "workloadgroups",
            Self::EnvoyFilter => "envoyfilters",
            Self::AuthorizationPolicy => "authorizationpolicies",
            Self::PeerAuthentication => "peerauthentications",
            Self::RequestAuthentication => "requestauthentications",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gateway => "Gateway",
            Self::VirtualService => "VirtualService",
            Self::DestinationRule => "DestinationRule",
            Self::ServiceEntry => "ServiceEntry",
            Self::Sidecar => "Sidecar",
            Self::WorkloadEntry => "WorkloadEntry",
            Self::WorkloadGroup => "WorkloadGroup",
            Self::EnvoyFilter => "EnvoyFilter",
            Self::AuthorizationPolicy => "AuthorizationPolicy",
            Self::PeerAuthentication => "PeerAuthentication",
            Self::RequestAuthentication => "RequestAuthentication",
        }
    }

    /// The lowercase singular name used in validation and reference keys.
    pub fn object_type(&self) -> String {
        self.kind().to_ascii_lowercase()
    }

    pub fn group(&self) -> &'static str {
        match self {
            Self::AuthorizationPolicy | Self::PeerAuthentication | Self::RequestAuthentication => {
                security::GROUP
            }
            _ => networking::GROUP,
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            Self::EnvoyFilter => "v1alpha3",
            _ => "v1beta1",
        }
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group(), self.version())
    }

    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group(), self.version(), self.kind());
        ApiResource::from_gvk_with_plural(&gvk, self.plural())
    }

    /// Whether the kind carries an `exportTo` visibility list.
    pub fn is_exportable(&self) -> bool {
        matches!(
            self,
            Self::VirtualService | Self::DestinationRule | Self::ServiceEntry
        )
    }
}

impl FromStr for ObjectKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.plural() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plural_names_round_trip() {
        for kind in ObjectKind::ALL {
            assert_eq!(kind.plural().parse::<ObjectKind>(), Ok(kind));
        }
        assert_eq!(
            "rules-bad".parse::<ObjectKind>(),
            Err(UnknownKind("rules-bad".to_string()))
        );
    }

    #[test]
    fn api_resources() {
        let ar = ObjectKind::EnvoyFilter.api_resource();
        assert_eq!(ar.api_version, "networking.istio.io/v1alpha3");
        assert_eq!(ar.plural, "envoyfilters");

        let ar = ObjectKind::PeerAuthentication.api_resource();
        assert_eq!(ar.group, "security.istio.io");
        assert_eq!(ObjectKind::PeerAuthentication.object_type(), "peerauthentication");
    }
}
