//! An in-memory object store for tests.

use crate::core::{
    AccessReview, ConfigObject, ConfigSpec, Error, MeshRegistry, ObjectKind, ObjectStore,
    RegistryService, RegistrySnapshot, Result, Verb, Workload,
};
use ahash::AHashSet as HashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::Duration;

pub(crate) struct FakeStore {
    cluster: String,
    objects: Mutex<Vec<ConfigObject>>,
    workloads: Vec<Workload>,
    namespaces: Vec<String>,
    allowed: HashSet<Verb>,
    failing_reviews: HashSet<Verb>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
    delay: Option<Duration>,
    pub(crate) reads: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn new(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            objects: Mutex::new(Vec::new()),
            workloads: Vec::new(),
            namespaces: Vec::new(),
            allowed: Verb::ALL.into_iter().collect(),
            failing_reviews: HashSet::new(),
            unavailable: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            delay: None,
            reads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_objects(self, objects: impl IntoIterator<Item = ConfigObject>) -> Self {
        let cluster = self.cluster.clone();
        self.objects.lock().extend(objects.into_iter().map(|mut o| {
            o.cluster = cluster.clone();
            o
        }));
        self
    }

    pub(crate) fn with_workloads(mut self, workloads: impl IntoIterator<Item = Workload>) -> Self {
        self.workloads.extend(workloads);
        self
    }

    pub(crate) fn with_namespaces(mut self, namespaces: &[&str]) -> Self {
        self.namespaces
            .extend(namespaces.iter().map(|ns| ns.to_string()));
        self
    }

    pub(crate) fn allowing(mut self, verbs: &[Verb]) -> Self {
        self.allowed = verbs.iter().copied().collect();
        self
    }

    pub(crate) fn failing_review(mut self, verb: Verb) -> Self {
        self.failing_reviews.insert(verb);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    async fn io(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::upstream(
                &self.cluster,
                anyhow::anyhow!("connection refused"),
            ));
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::upstream(&self.cluster, anyhow::anyhow!("write failed")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStore for FakeStore {
    fn cluster(&self) -> &str {
        &self.cluster
    }

    async fn list_objects(
        &self,
        namespace: Option<&str>,
        kind: ObjectKind,
    ) -> Result<Vec<ConfigObject>> {
        self.io().await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|o| o.kind() == kind && namespace.map_or(true, |ns| o.namespace == ns))
            .cloned()
            .collect())
    }

    async fn get_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ConfigObject> {
        self.io().await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .iter()
            .find(|o| o.kind() == kind && o.namespace == namespace && o.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found(kind, namespace, name))
    }

    async fn create_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        payload: serde_json::Value,
    ) -> Result<ConfigObject> {
        self.io().await?;
        self.write()?;
        let name = payload["metadata"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let spec = ConfigSpec::from_json(kind, payload["spec"].clone())?;
        let obj = ConfigObject::new(&self.cluster, namespace, name, spec);
        self.objects.lock().push(obj.clone());
        Ok(obj)
    }

    async fn update_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<ConfigObject> {
        self.io().await?;
        self.write()?;
        let mut objects = self.objects.lock();
        let obj = objects
            .iter_mut()
            .find(|o| o.kind() == kind && o.namespace == namespace && o.name == name)
            .ok_or_else(|| Error::not_found(kind, namespace, name))?;
        let mut spec = serde_json::to_value(&obj.spec)?["spec"].take();
        if let Some(patch) = patch.get("spec") {
            merge(&mut spec, patch);
        }
        obj.spec = ConfigSpec::from_json(kind, spec)?;
        Ok(obj.clone())
    }

    async fn delete_object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        self.io().await?;
        self.write()?;
        let mut objects = self.objects.lock();
        let before = objects.len();
        objects.retain(|o| !(o.kind() == kind && o.namespace == namespace && o.name == name));
        if objects.len() == before {
            return Err(Error::not_found(kind, namespace, name));
        }
        Ok(())
    }

    async fn self_access_review(
        &self,
        _namespace: &str,
        _kind: ObjectKind,
        verbs: &[Verb],
    ) -> Result<Vec<AccessReview>> {
        self.io().await?;
        if let Some(verb) = verbs.iter().find(|v| self.failing_reviews.contains(*v)) {
            return Err(Error::upstream(
                &self.cluster,
                anyhow::anyhow!("review of {verb} failed"),
            ));
        }
        Ok(verbs
            .iter()
            .map(|&verb| AccessReview {
                verb,
                allowed: self.allowed.contains(&verb),
            })
            .collect())
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>> {
        self.io().await?;
        Ok(self
            .workloads
            .iter()
            .filter(|w| namespace.map_or(true, |ns| w.namespace == ns))
            .cloned()
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.io().await?;
        Ok(self.namespaces.clone())
    }
}

/// A mesh registry that knows a fixed set of services.
pub(crate) struct FakeRegistry {
    services: Vec<RegistryService>,
    unavailable: AtomicBool,
}

impl FakeRegistry {
    pub(crate) fn new(services: &[(&str, &str)]) -> Self {
        Self {
            services: services
                .iter()
                .map(|(ns, name)| RegistryService::new(*ns, *name, "cluster.local"))
                .collect(),
            unavailable: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl MeshRegistry for FakeRegistry {
    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::upstream("registry", anyhow::anyhow!("no registry")));
        }
        Ok(RegistrySnapshot {
            services: self.services.clone(),
            configuration: Vec::new(),
        })
    }
}

/// Applies a JSON merge patch.
fn merge(target: &mut serde_json::Value, patch: &serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (k, v) in patch {
                if v.is_null() {
                    target.remove(k);
                } else {
                    merge(target.entry(k.clone()).or_insert(serde_json::Value::Null), v);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
