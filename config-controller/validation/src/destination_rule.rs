use crate::{Checker, Finding};
use mesh_config_core::{k8s::networking::DestinationRuleSpec, Check, ConfigObject, ObjectKind};
use mesh_config_k8s_index::{host::Host, Index};

/// Flags destination rules that configure the same host and subset as another rule.
#[derive(Clone, Debug, Default)]
pub struct MultiMatchChecker;

/// Checks that a destination rule's host exists and that its subsets select workloads.
#[derive(Clone, Debug, Default)]
pub struct DestinationRuleChecker;

// === impl MultiMatchChecker ===

impl Checker for MultiMatchChecker {
    fn name(&self) -> &'static str {
        "destination_rule_multimatch"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let rules = index
            .of_kind(ObjectKind::DestinationRule)
            .filter_map(|o| {
                let spec = o.as_destination_rule()?;
                Some((o, spec, index.fqdn(&spec.host, &o.namespace)))
            })
            .collect::<Vec<_>>();

        let mut findings = Vec::new();
        for (i, (a, a_spec, a_host)) in rules.iter().enumerate() {
            for (b, b_spec, b_host) in rules.iter().skip(i + 1) {
                if a_host != b_host || !same_workloads(a_spec, b_spec) {
                    continue;
                }
                if let Some(subset) = overlapping_subset(a_spec, b_spec) {
                    let message = format!(
                        "More than one DestinationRules for the same host subset combination: {a_host} {subset}"
                    );
                    findings.push((a.key(), Check::warning("KIA0201", &message, "spec/host")));
                    findings.push((b.key(), Check::warning("KIA0201", &message, "spec/host")));
                }
            }
        }
        findings
    }
}

fn same_workloads(a: &DestinationRuleSpec, b: &DestinationRuleSpec) -> bool {
    let labels = |dr: &DestinationRuleSpec| {
        dr.workload_selector
            .as_ref()
            .map(|s| s.match_labels.clone())
            .unwrap_or_default()
    };
    labels(a) == labels(b)
}

/// A rule without subsets covers the whole host, so it overlaps with any other rule.
fn overlapping_subset(a: &DestinationRuleSpec, b: &DestinationRuleSpec) -> Option<String> {
    if a.subsets.is_empty() || b.subsets.is_empty() {
        return Some("*".to_string());
    }
    a.subsets
        .iter()
        .find(|s| b.subsets.iter().any(|o| o.name == s.name))
        .map(|s| s.name.clone())
}

// === impl DestinationRuleChecker ===

impl Checker for DestinationRuleChecker {
    fn name(&self) -> &'static str {
        "destination_rule"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for dr in index.of_kind(ObjectKind::DestinationRule) {
            let spec = match dr.as_destination_rule() {
                Some(spec) => spec,
                None => continue,
            };

            if !index.resolves_host(&spec.host, &dr.namespace) {
                findings.push((
                    dr.key(),
                    Check::error(
                        "KIA0202",
                        "This host has no matching entry in the service registry (service, workload or service entries)",
                        "spec/host",
                    ),
                ));
                continue;
            }

            findings.extend(unmatched_subsets(index, dr, spec));
        }
        findings
    }
}

/// Subsets of an in-mesh host whose labels select no workload in the host's namespace.
fn unmatched_subsets<'a>(
    index: &'a Index,
    dr: &'a ConfigObject,
    spec: &'a DestinationRuleSpec,
) -> impl Iterator<Item = Finding> + 'a {
    let host = Host::parse(&spec.host, &dr.namespace, &index.mesh().dns_domain);
    let namespace = host.as_service().map(|(ns, _)| ns.to_string());
    spec.subsets
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.labels.is_empty())
        .filter(move |(_, s)| match namespace.as_deref() {
            Some(ns) => !index.any_workload_matches(Some(ns), &s.labels),
            None => false,
        })
        .map(move |(i, _)| {
            (
                dr.key(),
                Check::warning(
                    "KIA0203",
                    "This subset's labels are not found in any matching host",
                    format!("spec/subsets[{i}]"),
                ),
            )
        })
}
