use crate::{
    export_to,
    host::{hosts_match, Host},
    MeshInfo,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use mesh_config_core::{
    k8s::{labels::Map, Selector},
    ConfigObject, ObjectKey, ObjectKind, RegistryService, RegistrySnapshot, Workload,
};
use std::collections::BTreeSet;

/// An immutable, resolved view of the mesh configuration used to compute references and
/// validations.
///
/// Objects are keyed by (kind, namespace, name) regardless of the cluster they were read from.
#[derive(Debug, Default)]
pub struct Index {
    mesh: MeshInfo,
    objects: Vec<ConfigObject>,
    by_key: HashMap<ObjectKey, usize>,
    services: Vec<RegistryService>,
    service_names: HashSet<(String, String)>,
    workloads: Vec<Workload>,
    namespaces: BTreeSet<String>,
}

/// Accumulates the inputs of an [`Index`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    mesh: MeshInfo,
    local: Vec<ConfigObject>,
    registry: RegistrySnapshot,
    workloads: Vec<Workload>,
    namespaces: BTreeSet<String>,
}

// === impl IndexBuilder ===

impl IndexBuilder {
    pub fn new(mesh: MeshInfo) -> Self {
        Self {
            mesh,
            ..Default::default()
        }
    }

    /// Adds objects fetched from a cluster's object store.
    pub fn objects(mut self, objects: impl IntoIterator<Item = ConfigObject>) -> Self {
        self.local.extend(objects);
        self
    }

    /// Adds the mesh registry's view.
    pub fn registry(mut self, snapshot: RegistrySnapshot) -> Self {
        self.registry.services.extend(snapshot.services);
        self.registry.configuration.extend(snapshot.configuration);
        self
    }

    pub fn workloads(mut self, workloads: impl IntoIterator<Item = Workload>) -> Self {
        self.workloads.extend(workloads);
        self
    }

    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = String>) -> Self {
        self.namespaces.extend(namespaces);
        self
    }

    /// Merges locally fetched objects with the registry's configuration. A local object always
    /// takes precedence over a registry object with the same key; among local objects the first
    /// one seen is kept.
    pub fn build(self) -> Index {
        let mut index = Index {
            mesh: self.mesh,
            namespaces: self.namespaces,
            ..Default::default()
        };

        for obj in self.local {
            index.insert(obj);
        }
        for obj in self.registry.configuration {
            index.insert(obj);
        }

        for svc in self.registry.services {
            if index
                .service_names
                .insert((svc.namespace.clone(), svc.name.clone()))
            {
                index.namespaces.insert(svc.namespace.clone());
                index.services.push(svc);
            }
        }

        let mut seen = HashSet::new();
        for workload in self.workloads {
            if seen.insert((workload.namespace.clone(), workload.name.clone())) {
                index.namespaces.insert(workload.namespace.clone());
                index.workloads.push(workload);
            }
        }

        tracing::debug!(
            objects = index.objects.len(),
            services = index.services.len(),
            workloads = index.workloads.len(),
            namespaces = index.namespaces.len(),
            "Indexed mesh configuration"
        );
        index
    }
}

// === impl Index ===

impl Index {
    fn insert(&mut self, obj: ConfigObject) {
        let key = obj.key();
        if self.by_key.contains_key(&key) {
            tracing::trace!(%key, cluster = %obj.cluster, "Skipping duplicate object");
            return;
        }
        self.namespaces.insert(obj.namespace.clone());
        self.by_key.insert(key, self.objects.len());
        self.objects.push(obj);
    }

    pub fn mesh(&self) -> &MeshInfo {
        &self.mesh
    }

    pub fn objects(&self) -> &[ConfigObject] {
        &self.objects
    }

    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &ConfigObject> + '_ {
        self.objects.iter().filter(move |o| o.kind() == kind)
    }

    pub fn of_kind_in<'a>(
        &'a self,
        kind: ObjectKind,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a ConfigObject> + 'a {
        self.of_kind(kind).filter(move |o| o.namespace == namespace)
    }

    /// Objects of `kind` that may be referenced from `namespace`, in index order.
    pub fn visible_from<'a>(
        &'a self,
        kind: ObjectKind,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a ConfigObject> + 'a {
        self.of_kind(kind)
            .filter(move |o| export_to::is_visible(o, namespace))
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&ConfigObject> {
        self.by_key.get(key).map(|&i| &self.objects[i])
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn services(&self) -> &[RegistryService] {
        &self.services
    }

    pub fn service_exists(&self, namespace: &str, name: &str) -> bool {
        self.service_names
            .contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Workloads matched by `selector`, limited to `namespace` when one is given.
    pub fn selected_workloads<'a>(
        &'a self,
        namespace: Option<&'a str>,
        selector: &'a Selector,
    ) -> impl Iterator<Item = &'a Workload> + 'a {
        self.workloads
            .iter()
            .filter(move |w| namespace.map_or(true, |ns| w.namespace == ns))
            .filter(move |w| selector.matches_map(&w.labels))
    }

    pub fn any_workload_matches(&self, namespace: Option<&str>, labels: &Map) -> bool {
        let selector = Selector::from_map(labels.clone());
        let found = self.selected_workloads(namespace, &selector).next().is_some();
        found
    }

    /// The fully-qualified form of `host` as seen from `namespace`.
    pub fn fqdn(&self, host: &str, namespace: &str) -> String {
        Host::parse(host, namespace, &self.mesh.dns_domain).fqdn(&self.mesh.dns_domain)
    }

    /// Returns true if `host`, as declared in `namespace`, resolves to a registry service or to
    /// a host of a `ServiceEntry` visible from `namespace`.
    pub fn resolves_host(&self, host: &str, namespace: &str) -> bool {
        let domain = &self.mesh.dns_domain;
        let parsed = Host::parse(host, namespace, domain);
        match &parsed {
            Host::Service { namespace, name } if self.service_exists(namespace, name) => {
                return true
            }
            Host::Wildcard { .. } => {
                let fqdn = parsed.fqdn(domain);
                if self.services.iter().any(|s| hosts_match(&fqdn, &s.hostname)) {
                    return true;
                }
            }
            _ => {}
        }

        let fqdn = parsed.fqdn(domain);
        self.visible_from(ObjectKind::ServiceEntry, namespace)
            .filter_map(|se| se.as_service_entry().map(|spec| (se, spec)))
            .any(|(se, spec)| {
                spec.hosts.iter().any(|h| {
                    let se_host = self.fqdn(h, &se.namespace);
                    hosts_match(&se_host, host) || hosts_match(&se_host, &fqdn)
                })
            })
    }
}
