use crate::core::{Error, ObjectStore, Result};
use std::{collections::BTreeMap, sync::Arc};

/// The object stores of every configured cluster, one of which is the home cluster.
#[derive(Clone)]
pub struct Clusters {
    home: String,
    stores: Arc<BTreeMap<String, Arc<dyn ObjectStore>>>,
}

// === impl Clusters ===

impl Clusters {
    pub fn new(home: Arc<dyn ObjectStore>) -> Self {
        let name = home.cluster().to_string();
        let mut stores = BTreeMap::new();
        stores.insert(name.clone(), home);
        Self {
            home: name,
            stores: Arc::new(stores),
        }
    }

    /// Adds a remote cluster. A store for an already-known cluster name is ignored.
    pub fn with_remote(mut self, store: Arc<dyn ObjectStore>) -> Self {
        let stores = Arc::make_mut(&mut self.stores);
        let name = store.cluster().to_string();
        if stores.contains_key(&name) {
            tracing::warn!(cluster = %name, "Ignoring duplicate cluster");
        } else {
            stores.insert(name, store);
        }
        self
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn is_home(&self, cluster: &str) -> bool {
        self.home == cluster
    }

    pub fn get(&self, cluster: &str) -> Result<&Arc<dyn ObjectStore>> {
        self.stores
            .get(cluster)
            .ok_or_else(|| Error::UnknownCluster(cluster.to_string()))
    }

    pub fn home_store(&self) -> &Arc<dyn ObjectStore> {
        &self.stores[&self.home]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ObjectStore>)> {
        self.stores.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl std::fmt::Debug for Clusters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clusters")
            .field("home", &self.home)
            .field("clusters", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}
