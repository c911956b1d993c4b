//! Resolution of routing hosts to mesh services.

use mesh_config_core::k8s::networking::VirtualServiceSpec;

/// A routing host as interpreted relative to a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Host {
    /// A Kubernetes service in the mesh.
    Service { namespace: String, name: String },

    /// `*` or `*.suffix`. The suffix keeps its leading dot.
    Wildcard { suffix: String },

    /// Any other name, e.g. a `ServiceEntry` host.
    External(String),
}

impl Host {
    /// Parses `host` as it would be resolved from `default_ns`.
    ///
    /// Accepts `name`, `name.ns`, `name.ns.svc` and `name.ns.svc.<domain>`.
    pub fn parse(host: &str, default_ns: &str, domain: &str) -> Self {
        if let Some(suffix) = host.strip_prefix('*') {
            return Self::Wildcard {
                suffix: suffix.to_string(),
            };
        }

        let parts = host.split('.').collect::<Vec<_>>();
        let service = |namespace: &str| Self::Service {
            namespace: namespace.to_string(),
            name: parts[0].to_string(),
        };
        match parts.as_slice() {
            [name] if !name.is_empty() => service(default_ns),
            [_, ns] => service(*ns),
            [_, ns, "svc"] => service(*ns),
            [_, ns, "svc", rest @ ..] if rest.join(".") == domain => service(*ns),
            _ => Self::External(host.to_string()),
        }
    }

    /// The fully-qualified form used for host comparisons.
    pub fn fqdn(&self, domain: &str) -> String {
        match self {
            Self::Service { namespace, name } => format!("{name}.{namespace}.svc.{domain}"),
            Self::Wildcard { suffix } => format!("*{suffix}"),
            Self::External(host) => host.clone(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }

    pub fn as_service(&self) -> Option<(&str, &str)> {
        match self {
            Self::Service { namespace, name } => Some((namespace, name)),
            _ => None,
        }
    }
}

/// Returns true if two fully-qualified hosts overlap, honoring wildcards on either side.
pub fn hosts_match(a: &str, b: &str) -> bool {
    if a == b || a == "*" || b == "*" {
        return true;
    }
    let covers = |pattern: &str, host: &str| match pattern.strip_prefix('*') {
        Some(suffix) => host.ends_with(suffix),
        None => false,
    };
    covers(a, b) || covers(b, a)
}

/// Splits a `namespace/host` reference, as used by gateway servers and sidecar egress.
pub fn split_namespaced(host: &str) -> (Option<&str>, &str) {
    match host.split_once('/') {
        Some((ns, host)) => (Some(ns), host),
        None => (None, host),
    }
}

/// Returns true if `host`, declared in `host_ns`, names `service` in `service_ns`.
pub fn filter_by_host(
    host: &str,
    host_ns: &str,
    service: &str,
    service_ns: &str,
    domain: &str,
) -> bool {
    if service.is_empty() {
        return false;
    }
    match Host::parse(host, host_ns, domain) {
        Host::Service { namespace, name } => name == service && namespace == service_ns,
        _ => false,
    }
}

/// Returns true if one of the virtual service's hosts names `service` in `namespace`.
pub fn is_vs_valid_host(
    vs: &VirtualServiceSpec,
    namespace: &str,
    service: &str,
    domain: &str,
) -> bool {
    if service.is_empty() {
        return false;
    }
    vs.hosts
        .iter()
        .any(|h| filter_by_host(h, namespace, service, namespace, domain))
}
