use crate::{Checker, Finding};
use mesh_config_core::{Check, ObjectKind};
use mesh_config_k8s_index::Index;

/// Flags namespace-scoped policies whose workload selector matches nothing in their namespace.
#[derive(Clone, Debug, Default)]
pub struct NoWorkloadChecker;

const KINDS: [ObjectKind; 5] = [
    ObjectKind::Sidecar,
    ObjectKind::EnvoyFilter,
    ObjectKind::AuthorizationPolicy,
    ObjectKind::PeerAuthentication,
    ObjectKind::RequestAuthentication,
];

impl Checker for NoWorkloadChecker {
    fn name(&self) -> &'static str {
        "workload_selector"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for kind in KINDS {
            for obj in index.of_kind(kind) {
                let selector = match obj.workload_selector() {
                    Some(selector) => selector,
                    None => continue,
                };
                if index
                    .selected_workloads(Some(obj.namespace.as_str()), &selector)
                    .next()
                    .is_none()
                {
                    let path = match kind {
                        ObjectKind::Sidecar | ObjectKind::EnvoyFilter => "spec/workloadSelector",
                        _ => "spec/selector",
                    };
                    findings.push((
                        obj.key(),
                        Check::warning(
                            "KIA0004",
                            "No matching workload found for the selector in this namespace",
                            path,
                        ),
                    ));
                }
            }
        }
        findings
    }
}
