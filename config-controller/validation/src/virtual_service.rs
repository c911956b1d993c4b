use crate::{Checker, Finding};
use mesh_config_core::{
    k8s::networking::{virtual_service::RouteDestination, VirtualServiceSpec},
    Check, ConfigObject, ObjectKind,
};
use mesh_config_k8s_index::{
    host::{hosts_match, split_namespaced},
    references::gateway_key,
    Index,
};

/// Checks a virtual service's hosts, destinations, weights, gateways and subsets.
#[derive(Clone, Debug, Default)]
pub struct VirtualServiceChecker;

impl Checker for VirtualServiceChecker {
    fn name(&self) -> &'static str {
        "virtual_service"
    }

    fn check(&self, index: &Index) -> Vec<Finding> {
        let mut findings = Vec::new();
        for vs in index.of_kind(ObjectKind::VirtualService) {
            let spec = match vs.as_virtual_service() {
                Some(spec) => spec,
                None => continue,
            };
            let key = vs.key();
            let mut push = |check| findings.push((key.clone(), check));

            for (path, dest) in spec.destinations() {
                if !index.resolves_host(&dest.destination.host, &vs.namespace) {
                    push(Check::error(
                        "KIA1101",
                        "DestinationWeight on route doesn't have a valid service (host not found)",
                        format!("{path}/destination/host"),
                    ));
                } else if let Some(subset) = dest.destination.subset.as_deref() {
                    if !subset_exists(index, vs, dest, subset) {
                        push(Check::warning(
                            "KIA1107",
                            format!("Subset {subset} not found"),
                            format!("{path}/destination"),
                        ));
                    }
                }
            }

            for (j, host) in spec.hosts.iter().enumerate() {
                if !host_resolves(index, vs, spec, host) {
                    push(Check::warning(
                        "KIA1102",
                        "VirtualService host does not match any service, ServiceEntry or gateway host",
                        format!("spec/hosts[{j}]"),
                    ));
                }
            }

            for (path, routes) in spec.route_lists() {
                if routes.len() > 1 {
                    let sum = routes
                        .iter()
                        .map(|r| i64::from(r.weight.unwrap_or(0)))
                        .sum::<i64>();
                    if sum != 100 {
                        push(Check::error(
                            "KIA1104",
                            format!("Weight sum should be 100, found {sum}"),
                            format!("{path}/route"),
                        ));
                    }
                }
            }

            for (k, gw) in spec.gateways.iter().enumerate() {
                if gw == "mesh" {
                    continue;
                }
                if !index.contains(&gateway_key(gw, &vs.namespace)) {
                    push(Check::error(
                        "KIA1105",
                        "VirtualService is pointing to a non-existent gateway",
                        format!("spec/gateways[{k}]"),
                    ));
                }
            }
        }
        findings
    }
}

/// Looks for `subset` in the destination rules visible from the virtual service whose host
/// matches the destination.
fn subset_exists(index: &Index, vs: &ConfigObject, dest: &RouteDestination, subset: &str) -> bool {
    let dest_host = index.fqdn(&dest.destination.host, &vs.namespace);
    index
        .visible_from(ObjectKind::DestinationRule, &vs.namespace)
        .filter_map(|dr| dr.as_destination_rule().map(|spec| (dr, spec)))
        .filter(|(dr, spec)| hosts_match(&index.fqdn(&spec.host, &dr.namespace), &dest_host))
        .any(|(_, spec)| spec.subsets.iter().any(|s| s.name == subset))
}

fn host_resolves(index: &Index, vs: &ConfigObject, spec: &VirtualServiceSpec, host: &str) -> bool {
    if index.resolves_host(host, &vs.namespace) {
        return true;
    }

    // Hosts exposed through a bound gateway need not be mesh services.
    spec.gateways
        .iter()
        .filter(|gw| gw.as_str() != "mesh")
        .filter_map(|gw| index.get(&gateway_key(gw, &vs.namespace)))
        .filter_map(|gw| gw.as_gateway())
        .flat_map(|gw| gw.servers.iter().flat_map(|s| s.hosts.iter()))
        .any(|h| hosts_match(split_namespaced(h).1, host))
}
