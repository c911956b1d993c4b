use crate::{Checker, Finding};
use mesh_config_core::{
    k8s::{labels::Map, networking::GatewaySpec},
    Check, ConfigObject, ObjectKind,
};
use mesh_config_k8s_index::{
    host::{hosts_match, split_namespaced},
    Index,
};

/// Flags gateways that select overlapping workloads and declare the same host on the same port.
#[derive(Clone, Debug, Default)]
pub struct MultiMatchChecker;

/// Flags gateways whose selector matches no workload.
#[derive(Clone, Debug, Default)]
pub struct SelectorChecker;

// === impl MultiMatchChecker ===

impl Checker for MultiMatchChecker {
    fn name(&self) -> &'static str {
        "gateway_multimatch"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let gateways = index
            .of_kind(ObjectKind::Gateway)
            .filter_map(|o| o.as_gateway().map(|spec| (o, spec)))
            .collect::<Vec<_>>();

        let mut findings = Vec::new();
        for (i, (a, a_spec)) in gateways.iter().enumerate() {
            for (b, b_spec) in gateways.iter().skip(i + 1) {
                if !selectors_overlap(&a_spec.selector, &b_spec.selector) {
                    continue;
                }
                for (path, host) in conflicts(a, a_spec, b, b_spec) {
                    findings.push((a.key(), duplicate(&host, path)));
                }
                for (path, host) in conflicts(b, b_spec, a, a_spec) {
                    findings.push((b.key(), duplicate(&host, path)));
                }
            }
        }
        findings
    }
}

fn duplicate(host: &str, path: String) -> Check {
    Check::warning(
        "KIA0301",
        format!("More than one Gateway for the same host port combination: {host}"),
        path,
    )
}

/// Two selectors overlap unless they require different values for the same label.
fn selectors_overlap(a: &Map, b: &Map) -> bool {
    a.iter()
        .all(|(k, v)| b.get(k).map_or(true, |other| other == v))
}

/// The hosts of `a` that collide with a host on the same port of `b`.
fn conflicts(
    a: &ConfigObject,
    a_spec: &GatewaySpec,
    b: &ConfigObject,
    b_spec: &GatewaySpec,
) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (i, server) in a_spec.servers.iter().enumerate() {
        let port = server.port.as_ref().map(|p| p.number);
        for (j, host) in server.hosts.iter().enumerate() {
            let host_a = server_host(host, &a.namespace);
            let collides = b_spec
                .servers
                .iter()
                .filter(|s| s.port.as_ref().map(|p| p.number) == port)
                .flat_map(|s| s.hosts.iter())
                .any(|h| {
                    let host_b = server_host(h, &b.namespace);
                    host_a.0 == host_b.0 && hosts_match(host_a.1, host_b.1)
                });
            if collides {
                out.push((format!("spec/servers[{i}]/hosts[{j}]"), host.clone()));
            }
        }
    }
    out
}

/// Splits a server host into the namespace it exposes and the host. `*` and `.` prefixes are
/// treated as unscoped.
fn server_host<'h>(host: &'h str, gateway_ns: &str) -> (Option<String>, &'h str) {
    match split_namespaced(host) {
        (Some("*"), host) | (None, host) => (None, host),
        (Some("."), host) => (Some(gateway_ns.to_string()), host),
        (Some(ns), host) => (Some(ns.to_string()), host),
    }
}

// === impl SelectorChecker ===

impl Checker for SelectorChecker {
    fn name(&self) -> &'static str {
        "gateway_selector"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        index
            .of_kind(ObjectKind::Gateway)
            .filter_map(|gw| {
                let selector = gw.workload_selector()?;
                if index.selected_workloads(None, &selector).next().is_some() {
                    return None;
                }
                Some((
                    gw.key(),
                    Check::warning(
                        "KIA0302",
                        "No matching workload found for gateway selector in any namespace",
                        "spec/selector",
                    ),
                ))
            })
            .collect()
    }
}
