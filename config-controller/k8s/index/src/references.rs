//! Directional references from configuration objects to services, workloads and other objects.

use crate::{
    host::{hosts_match, Host},
    Index,
};
use mesh_config_core::{
    ConfigObject, ConfigSpec, IstioReferences, ObjectKey, ObjectKind, ReferenceMap,
    ServiceReference, WorkloadReference,
};

/// Computes the references declared by every indexed object.
pub fn reference_map(index: &Index) -> ReferenceMap {
    index
        .objects()
        .iter()
        .map(|obj| (obj.key(), references(index, obj)))
        .collect()
}

/// Computes what `obj` references, by inspecting its spec.
pub fn references(index: &Index, obj: &ConfigObject) -> IstioReferences {
    let mut refs = IstioReferences::default();
    match &obj.spec {
        ConfigSpec::VirtualService(_) => virtual_service(index, obj, &mut refs),
        ConfigSpec::DestinationRule(dr) => {
            let host = Host::parse(&dr.host, &obj.namespace, &index.mesh().dns_domain);
            if let Some((ns, name)) = host.as_service() {
                refs.add_service(ServiceReference::new(ns, name));
            }
            let dr_host = index.fqdn(&dr.host, &obj.namespace);
            for vs in index.visible_from(ObjectKind::VirtualService, &obj.namespace) {
                if destination_hosts(index, vs).any(|h| hosts_match(&h, &dr_host)) {
                    refs.add_object(vs.key());
                }
            }
        }
        ConfigSpec::Gateway(_) => {
            let key = obj.key();
            for vs in index.of_kind(ObjectKind::VirtualService) {
                if gateway_keys(vs).any(|k| k == key) {
                    refs.add_object(vs.key());
                }
            }
            selected_workloads(index, obj, None, &mut refs);
        }
        ConfigSpec::ServiceEntry(se) => {
            for dr in index.visible_from(ObjectKind::DestinationRule, &obj.namespace) {
                let dr_host = match dr.as_destination_rule() {
                    Some(spec) => index.fqdn(&spec.host, &dr.namespace),
                    None => continue,
                };
                if se
                    .hosts
                    .iter()
                    .any(|h| hosts_match(&index.fqdn(h, &obj.namespace), &dr_host))
                {
                    refs.add_object(dr.key());
                }
            }
        }
        ConfigSpec::Sidecar(_)
        | ConfigSpec::AuthorizationPolicy(_)
        | ConfigSpec::PeerAuthentication(_)
        | ConfigSpec::RequestAuthentication(_)
        | ConfigSpec::EnvoyFilter(_) => {
            selected_workloads(index, obj, Some(obj.namespace.as_str()), &mut refs);
        }
        ConfigSpec::WorkloadEntry(_) | ConfigSpec::WorkloadGroup(_) => {}
    }
    refs
}

fn virtual_service(index: &Index, obj: &ConfigObject, refs: &mut IstioReferences) {
    let vs = match obj.as_virtual_service() {
        Some(vs) => vs,
        None => return,
    };
    let domain = &index.mesh().dns_domain;

    for (_, dest) in vs.destinations() {
        let host = Host::parse(&dest.destination.host, &obj.namespace, domain);
        if let Some((ns, name)) = host.as_service() {
            refs.add_service(ServiceReference::new(ns, name));
        }
    }

    for key in gateway_keys(obj) {
        refs.add_object(key);
    }

    let hosts = destination_hosts(index, obj).collect::<Vec<_>>();
    for dr in index.visible_from(ObjectKind::DestinationRule, &obj.namespace) {
        if let Some(spec) = dr.as_destination_rule() {
            let dr_host = index.fqdn(&spec.host, &dr.namespace);
            if hosts.iter().any(|h| hosts_match(h, &dr_host)) {
                refs.add_object(dr.key());
            }
        }
    }
}

/// The fully-qualified destination hosts of a virtual service.
fn destination_hosts<'a>(
    index: &'a Index,
    vs: &'a ConfigObject,
) -> impl Iterator<Item = String> + 'a {
    vs.as_virtual_service()
        .into_iter()
        .flat_map(|spec| spec.destinations())
        .map(move |(_, d)| index.fqdn(&d.destination.host, &vs.namespace))
}

/// The gateways bound by a virtual service. The reserved `mesh` gateway is skipped.
pub fn gateway_keys(vs: &ConfigObject) -> impl Iterator<Item = ObjectKey> + '_ {
    vs.as_virtual_service()
        .into_iter()
        .flat_map(|spec| spec.gateways.iter())
        .filter(|gw| gw.as_str() != "mesh")
        .map(move |gw| gateway_key(gw, &vs.namespace))
}

/// Resolves a gateway reference given as `name`, `namespace/name` or a service-style hostname.
pub fn gateway_key(gateway: &str, namespace: &str) -> ObjectKey {
    if let Some((ns, name)) = gateway.split_once('/') {
        return ObjectKey::new(ObjectKind::Gateway, ns, name);
    }
    match gateway.split('.').collect::<Vec<_>>().as_slice() {
        [name, ns, ..] => ObjectKey::new(ObjectKind::Gateway, *ns, *name),
        _ => ObjectKey::new(ObjectKind::Gateway, namespace, gateway),
    }
}

fn selected_workloads(
    index: &Index,
    obj: &ConfigObject,
    namespace: Option<&str>,
    refs: &mut IstioReferences,
) {
    if let Some(selector) = obj.workload_selector() {
        for w in index.selected_workloads(namespace, &selector) {
            refs.add_workload(WorkloadReference::new(&w.namespace, &w.name));
        }
    }
}
