use crate::{Checker, Finding};
use mesh_config_core::{
    k8s::{networking::destination_rule::TlsMode, security::MtlsMode},
    Check, ConfigObject, ObjectKind,
};
use mesh_config_k8s_index::{host::Host, Index};

/// Compares destination-rule TLS settings with the peer authentication that applies to the
/// destination's namespace.
#[derive(Clone, Debug, Default)]
pub struct MtlsChecker;

/// Flags namespaces with more than one selector-less peer authentication.
#[derive(Clone, Debug, Default)]
pub struct PeerAuthenticationChecker;

// === impl MtlsChecker ===

impl Checker for MtlsChecker {
    fn name(&self) -> &'static str {
        "mtls"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for dr in index.of_kind(ObjectKind::DestinationRule) {
            let tls = match dr
                .as_destination_rule()
                .and_then(|spec| spec.traffic_policy.as_ref())
                .and_then(|tp| tp.tls_mode())
            {
                Some(tls) => tls,
                None => continue,
            };
            let pa = match effective_policy(index, &target_namespace(index, dr)) {
                Some(pa) => pa,
                None => continue,
            };
            let mode = pa
                .as_peer_authentication()
                .and_then(|spec| spec.mtls_mode());

            match (tls, mode) {
                (TlsMode::Disable, Some(MtlsMode::Strict)) => {
                    findings.push((
                        dr.key(),
                        Check::error(
                            "KIA0204",
                            format!(
                                "mTLS is disabled for this host, but PeerAuthentication {}/{} requires STRICT mTLS",
                                pa.namespace, pa.name
                            ),
                            "spec/trafficPolicy/tls/mode",
                        ),
                    ));
                    findings.push((
                        pa.key(),
                        Check::error(
                            "KIA0402",
                            format!(
                                "STRICT mTLS is contradicted by DestinationRule {}/{} disabling mTLS",
                                dr.namespace, dr.name
                            ),
                            "spec/mtls/mode",
                        ),
                    ));
                }
                (TlsMode::IstioMutual, Some(MtlsMode::Disable)) => {
                    findings.push((
                        dr.key(),
                        Check::error(
                            "KIA0205",
                            format!(
                                "ISTIO_MUTUAL is required for this host, but PeerAuthentication {}/{} disables mTLS",
                                pa.namespace, pa.name
                            ),
                            "spec/trafficPolicy/tls/mode",
                        ),
                    ));
                }
                _ => {}
            }
        }
        findings
    }
}

/// The namespace whose workloads receive the destination rule's traffic. Hosts that are not
/// services resolve to the rule's own namespace.
fn target_namespace(index: &Index, dr: &ConfigObject) -> String {
    let host = match dr.as_destination_rule() {
        Some(spec) => Host::parse(&spec.host, &dr.namespace, &index.mesh().dns_domain),
        None => return dr.namespace.clone(),
    };
    match host {
        Host::Service { namespace, .. } => namespace,
        _ => dr.namespace.clone(),
    }
}

/// The selector-less peer authentication with a mode that governs `namespace`, falling back to
/// the mesh-wide policy in the root namespace.
fn effective_policy<'a>(index: &'a Index, namespace: &str) -> Option<&'a ConfigObject> {
    let namespace_wide = |ns: &str| {
        index
            .of_kind(ObjectKind::PeerAuthentication)
            .filter(|pa| pa.namespace == ns && pa.workload_selector().is_none())
            .find(|pa| {
                pa.as_peer_authentication()
                    .and_then(|spec| spec.mtls_mode())
                    .map_or(false, |mode| mode != MtlsMode::Unset)
            })
    };
    namespace_wide(namespace).or_else(|| namespace_wide(&index.mesh().root_namespace))
}

// === impl PeerAuthenticationChecker ===

impl Checker for PeerAuthenticationChecker {
    fn name(&self) -> &'static str {
        "peer_authentication"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        crate::namespace_wide_duplicates(index, ObjectKind::PeerAuthentication)
            .into_iter()
            .map(|pa| {
                (
                    pa.key(),
                    Check::warning(
                        "KIA0401",
                        "More than one selector-less PeerAuthentication in the same namespace",
                        "spec",
                    ),
                )
            })
            .collect()
    }
}
