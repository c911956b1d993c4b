use crate::{Checker, Finding};
use mesh_config_core::{Check, ObjectKind};
use mesh_config_k8s_index::Index;

/// Checks that authorization rules name known namespaces and hosts.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationPolicyChecker;

impl Checker for AuthorizationPolicyChecker {
    fn name(&self) -> &'static str {
        "authorization_policy"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for ap in index.of_kind(ObjectKind::AuthorizationPolicy) {
            let spec = match ap.as_authorization_policy() {
                Some(spec) => spec,
                None => continue,
            };

            for (i, rule) in spec.rules.iter().enumerate() {
                for (j, from) in rule.from.iter().enumerate() {
                    for (k, ns) in from.source.namespaces.iter().enumerate() {
                        if !is_pattern(ns) && !index.has_namespace(ns) {
                            findings.push((
                                ap.key(),
                                Check::error(
                                    "KIA0101",
                                    "Namespace not found for this rule",
                                    format!("spec/rules[{i}]/from[{j}]/source/namespaces[{k}]"),
                                ),
                            ));
                        }
                    }
                }

                for (j, to) in rule.to.iter().enumerate() {
                    for (k, host) in to.operation.hosts.iter().enumerate() {
                        let host = strip_port(host);
                        if !is_pattern(host) && !index.resolves_host(host, &ap.namespace) {
                            findings.push((
                                ap.key(),
                                Check::error(
                                    "KIA0102",
                                    "Unable to find a service for this host",
                                    format!("spec/rules[{i}]/to[{j}]/operation/hosts[{k}]"),
                                ),
                            ));
                        }
                    }
                }
            }
        }
        findings
    }
}

/// Prefix, suffix and presence matches are not checked against known names.
fn is_pattern(value: &str) -> bool {
    value.starts_with('*') || value.ends_with('*')
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => host,
    }
}
