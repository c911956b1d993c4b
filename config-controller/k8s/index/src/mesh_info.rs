/// Holds mesh-wide settings that affect how hosts and selectors resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshInfo {
    /// E.g. "cluster.local"
    pub dns_domain: String,

    /// The namespace whose selector-less policies apply mesh-wide.
    pub root_namespace: String,

    /// The workload label that identifies a service version.
    pub version_label: String,
}

impl Default for MeshInfo {
    fn default() -> Self {
        Self {
            dns_domain: "cluster.local".to_string(),
            root_namespace: "istio-system".to_string(),
            version_label: "version".to_string(),
        }
    }
}

impl MeshInfo {
    pub fn service_fqdn(&self, ns: &str, svc: &str) -> String {
        format!("{}.{}.svc.{}", svc, ns, self.dns_domain)
    }
}
