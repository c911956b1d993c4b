use crate::ObjectKind;
use ahash::AHashMap as HashMap;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::fmt;

/// Identifies a configuration object independently of the cluster it was read from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

pub type ValidationKey = ObjectKey;
pub type ReferenceKey = ObjectKey;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServiceReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkloadReference {
    pub name: String,
    pub namespace: String,
}

/// What a single object depends on, in first-seen order without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IstioReferences {
    pub service_references: Vec<ServiceReference>,
    pub object_references: Vec<ObjectKey>,
    pub workload_references: Vec<WorkloadReference>,
}

/// References keyed by the object that declares them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceMap(HashMap<ReferenceKey, IstioReferences>);

// === impl ObjectKey ===

impl ObjectKey {
    pub fn new(kind: ObjectKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind.object_type(), self.namespace, self.name)
    }
}

impl Serialize for ObjectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("objectType", &self.kind.object_type())?;
        map.serialize_entry("namespace", &self.namespace)?;
        map.serialize_entry("name", &self.name)?;
        map.end()
    }
}

// === impl ServiceReference ===

impl ServiceReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

// === impl WorkloadReference ===

impl WorkloadReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

// === impl IstioReferences ===

impl IstioReferences {
    pub fn is_empty(&self) -> bool {
        self.service_references.is_empty()
            && self.object_references.is_empty()
            && self.workload_references.is_empty()
    }

    pub fn add_service(&mut self, svc: ServiceReference) {
        push_unique(&mut self.service_references, svc);
    }

    pub fn add_object(&mut self, key: ObjectKey) {
        push_unique(&mut self.object_references, key);
    }

    pub fn add_workload(&mut self, workload: WorkloadReference) {
        push_unique(&mut self.workload_references, workload);
    }

    pub fn merge(&mut self, other: IstioReferences) {
        other
            .service_references
            .into_iter()
            .for_each(|s| self.add_service(s));
        other
            .object_references
            .into_iter()
            .for_each(|o| self.add_object(o));
        other
            .workload_references
            .into_iter()
            .for_each(|w| self.add_workload(w));
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

// === impl ReferenceMap ===

impl ReferenceMap {
    pub fn insert(&mut self, key: ReferenceKey, refs: IstioReferences) {
        self.0.entry(key).or_default().merge(refs);
    }

    pub fn get(&self, key: &ReferenceKey) -> Option<&IstioReferences> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ReferenceKey> {
        self.0.keys()
    }

    pub fn retain(&mut self, mut f: impl FnMut(&ReferenceKey) -> bool) {
        self.0.retain(|k, _| f(k));
    }
}

impl FromIterator<(ReferenceKey, IstioReferences)> for ReferenceMap {
    fn from_iter<T: IntoIterator<Item = (ReferenceKey, IstioReferences)>>(iter: T) -> Self {
        let mut map = Self::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Serializes with sorted, stringified keys so output is stable.
impl Serialize for ReferenceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries = self.0.iter().collect::<Vec<_>>();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in entries {
            map.serialize_entry(&k.to_string(), v)?;
        }
        map.end()
    }
}
