use crate::{
    k8s::labels::Map, selector::Labeled, AccessReview, ConfigObject, ObjectKind, Result, Verb,
};
use serde::Serialize;

/// Read/write access to the configuration objects of a single cluster.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// The name of the cluster this store talks to.
    fn cluster(&self) -> &str;

    /// Lists objects of `kind`, in every namespace when `namespace` is `None`.
    async fn list_objects(
        &self,
        namespace: Option<&str>,
        kind: ObjectKind,
    ) -> Result<Vec<ConfigObject>>;

    async fn get_object(&self, namespace: &str, kind: ObjectKind, name: &str)
        -> Result<ConfigObject>;

    async fn create_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        payload: serde_json::Value,
    ) -> Result<ConfigObject>;

    /// Applies `patch` as a JSON merge patch.
    async fn update_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<ConfigObject>;

    async fn delete_object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()>;

    /// Asks whether the current identity may perform each of `verbs` on `kind` in `namespace`.
    async fn self_access_review(
        &self,
        namespace: &str,
        kind: ObjectKind,
        verbs: &[Verb],
    ) -> Result<Vec<AccessReview>>;

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>>;

    async fn list_namespaces(&self) -> Result<Vec<String>>;
}

/// A mesh-wide view of services and configuration.
#[async_trait::async_trait]
pub trait MeshRegistry: Send + Sync {
    async fn snapshot(&self) -> Result<RegistrySnapshot>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub services: Vec<RegistryService>,
    pub configuration: Vec<ConfigObject>,
}

/// A service known to the mesh registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RegistryService {
    pub name: String,
    pub namespace: String,
    /// The fully-qualified hostname, e.g. `reviews.bookinfo.svc.cluster.local`.
    pub hostname: String,
}

/// A labeled workload instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Workload {
    pub name: String,
    pub namespace: String,
    pub labels: Map,
}

// === impl RegistryService ===

impl RegistryService {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, domain: &str) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        Self {
            hostname: format!("{name}.{namespace}.svc.{domain}"),
            name,
            namespace,
        }
    }
}

// === impl Workload ===

impl Workload {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, labels: Map) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels,
        }
    }
}

impl Labeled for Workload {
    fn labels(&self) -> &Map {
        &self.labels
    }
}
