use crate::{Checker, Finding};
use mesh_config_core::{Check, ObjectKind};
use mesh_config_k8s_index::{host::split_namespaced, Index};

/// Checks sidecar egress hosts.
#[derive(Clone, Debug, Default)]
pub struct EgressHostChecker;

/// Flags namespaces with more than one selector-less sidecar.
#[derive(Clone, Debug, Default)]
pub struct DefaultSidecarChecker;

impl Checker for EgressHostChecker {
    fn name(&self) -> &'static str {
        "sidecar_egress"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for sc in index.of_kind(ObjectKind::Sidecar) {
            let spec = match sc.as_sidecar() {
                Some(spec) => spec,
                None => continue,
            };
            for (i, egress) in spec.egress.iter().enumerate() {
                for (j, entry) in egress.hosts.iter().enumerate() {
                    let (ns, host) = split_namespaced(entry);
                    if host.starts_with('*') {
                        continue;
                    }
                    let ns = match ns {
                        Some(".") | None => sc.namespace.as_str(),
                        Some("*") | Some("~") => continue,
                        Some(ns) => ns,
                    };
                    if !index.resolves_host(host, ns) {
                        findings.push((
                            sc.key(),
                            Check::warning(
                                "KIA1004",
                                "This host has no matching entry in the service registry",
                                format!("spec/egress[{i}]/hosts[{j}]"),
                            ),
                        ));
                    }
                }
            }
        }
        findings
    }
}

impl Checker for DefaultSidecarChecker {
    fn name(&self) -> &'static str {
        "sidecar_default"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        crate::namespace_wide_duplicates(index, ObjectKind::Sidecar)
            .into_iter()
            .map(|sc| {
                (
                    sc.key(),
                    Check::warning(
                        "KIA1005",
                        "More than one selector-less Sidecar in the same namespace",
                        "spec/workloadSelector",
                    ),
                )
            })
            .collect()
    }
}
