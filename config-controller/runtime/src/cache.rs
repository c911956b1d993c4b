use crate::core::{AccessReview, ConfigObject, ObjectKind, ObjectStore, Result, Verb, Workload};
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use tokio::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Caches a cluster's object reads for a short time.
///
/// A successful write removes the written object's entry, and every cached listing of its kind,
/// before it returns. Failed writes leave the cache as it was.
pub struct ObjectCache<S> {
    inner: S,
    ttl: Duration,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    /// Bumped by every invalidation so that reads racing a write are not cached.
    epoch: u64,
    objects: HashMap<ObjectId, Entry<ConfigObject>>,
    lists: HashMap<(Option<String>, ObjectKind), Entry<Vec<ConfigObject>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ObjectId {
    namespace: String,
    kind: ObjectKind,
    name: String,
}

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

// === impl ObjectCache ===

impl<S> ObjectCache<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: RwLock::new(State::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn invalidate(&self, namespace: &str, kind: ObjectKind, name: &str) {
        let mut state = self.state.write();
        state.epoch += 1;
        state.objects.remove(&ObjectId::new(namespace, kind, name));
        state.lists.retain(|(_, k), _| *k != kind);
    }

    fn entry<T>(&self, value: T) -> Entry<T> {
        Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }
}

#[async_trait::async_trait]
impl<S: ObjectStore> ObjectStore for ObjectCache<S> {
    fn cluster(&self) -> &str {
        self.inner.cluster()
    }

    async fn list_objects(
        &self,
        namespace: Option<&str>,
        kind: ObjectKind,
    ) -> Result<Vec<ConfigObject>> {
        let key = (namespace.map(str::to_string), kind);
        let (cached, epoch) = {
            let state = self.state.read();
            let cached = state.lists.get(&key).and_then(Entry::fresh).cloned();
            (cached, state.epoch)
        };
        if let Some(objects) = cached {
            return Ok(objects);
        }

        let objects = self.inner.list_objects(namespace, kind).await?;
        let mut state = self.state.write();
        if state.epoch == epoch {
            state.lists.insert(key, self.entry(objects.clone()));
        }
        Ok(objects)
    }

    async fn get_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ConfigObject> {
        let id = ObjectId::new(namespace, kind, name);
        let (cached, epoch) = {
            let state = self.state.read();
            let cached = state.objects.get(&id).and_then(Entry::fresh).cloned();
            (cached, state.epoch)
        };
        if let Some(obj) = cached {
            return Ok(obj);
        }

        let obj = self.inner.get_object(namespace, kind, name).await?;
        let mut state = self.state.write();
        if state.epoch == epoch {
            state.objects.insert(id, self.entry(obj.clone()));
        }
        Ok(obj)
    }

    async fn create_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        payload: serde_json::Value,
    ) -> Result<ConfigObject> {
        let obj = self.inner.create_object(namespace, kind, payload).await?;
        self.invalidate(namespace, kind, &obj.name);
        Ok(obj)
    }

    async fn update_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<ConfigObject> {
        let obj = self.inner.update_object(namespace, kind, name, patch).await?;
        self.invalidate(namespace, kind, name);
        Ok(obj)
    }

    async fn delete_object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        self.inner.delete_object(namespace, kind, name).await?;
        self.invalidate(namespace, kind, name);
        Ok(())
    }

    async fn self_access_review(
        &self,
        namespace: &str,
        kind: ObjectKind,
        verbs: &[Verb],
    ) -> Result<Vec<AccessReview>> {
        self.inner.self_access_review(namespace, kind, verbs).await
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>> {
        self.inner.list_workloads(namespace).await
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.inner.list_namespaces().await
    }
}

// === impl ObjectId ===

impl ObjectId {
    fn new(namespace: &str, kind: ObjectKind, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            kind,
            name: name.to_string(),
        }
    }
}

// === impl Entry ===

impl<T> Entry<T> {
    fn fresh(&self) -> Option<&T> {
        if Instant::now() < self.expires_at {
            Some(&self.value)
        } else {
            None
        }
    }
}
