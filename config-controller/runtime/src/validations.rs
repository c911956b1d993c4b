use crate::{
    clusters::Clusters,
    config::bounded,
    core::{
        ConfigObject, Error, MeshRegistry, ObjectKey, ObjectKind, ObjectStore, ReferenceMap,
        Result, ValidationMap, Workload,
    },
    index::{references, Index, IndexBuilder, MeshInfo},
    validation::{self, Scope, Validator},
};
use futures::future;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::{task::JoinSet, time::Duration};
use tokio_util::sync::CancellationToken;

/// Validates configuration against the mesh-wide view of every cluster.
#[derive(Clone)]
pub struct ValidationService {
    clusters: Clusters,
    registry: Arc<dyn MeshRegistry>,
    mesh: MeshInfo,
    validator: Validator,
    timeout: Duration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Validations {
    pub validations: ValidationMap,
    pub references: ReferenceMap,
}

/// What one cluster contributes to the index.
#[derive(Default)]
struct ClusterSnapshot {
    objects: Vec<ConfigObject>,
    workloads: Vec<Workload>,
    namespaces: Vec<String>,
}

// === impl ValidationService ===

impl ValidationService {
    pub fn new(
        clusters: Clusters,
        registry: Arc<dyn MeshRegistry>,
        mesh: MeshInfo,
        validator: Validator,
        timeout: Duration,
    ) -> Self {
        Self {
            clusters,
            registry,
            mesh,
            validator,
            timeout,
        }
    }

    /// Validates the objects in `scope`, as requested from `cluster`.
    ///
    /// The requested cluster must be readable; other clusters and the mesh registry contribute
    /// what they can. Cancellation abandons any in-flight checks.
    pub async fn get_validations(
        &self,
        cluster: &str,
        scope: Scope,
        cancel: &CancellationToken,
    ) -> Result<Validations> {
        self.clusters.get(cluster)?;
        let index = Arc::new(self.load(cluster, cancel).await?);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = self.run(index, scope) => res,
        }
    }

    async fn load(&self, requested: &str, cancel: &CancellationToken) -> Result<Index> {
        let snapshots = self.clusters.iter().map(|(cluster, store)| async move {
            let snapshot = bounded(cluster, self.timeout, cancel, snapshot(store.as_ref())).await;
            (cluster, snapshot)
        });
        let registry = bounded("registry", self.timeout, cancel, self.registry.snapshot());
        let (mut snapshots, registry) = tokio::join!(future::join_all(snapshots), registry);
        // The requested cluster's objects take precedence over copies read from other clusters.
        snapshots.sort_by_key(|(cluster, _)| *cluster != requested);

        let mut builder = IndexBuilder::new(self.mesh.clone());
        for (cluster, snapshot) in snapshots {
            match snapshot {
                Ok(snapshot) => {
                    builder = builder
                        .objects(snapshot.objects)
                        .workloads(snapshot.workloads)
                        .namespaces(snapshot.namespaces);
                }
                Err(error @ Error::Cancelled) => return Err(error),
                Err(error) if cluster == requested => return Err(error),
                Err(error) => {
                    tracing::warn!(%cluster, %error, "Validating without cluster");
                }
            }
        }
        match registry {
            Ok(registry) => builder = builder.registry(registry),
            Err(error @ Error::Cancelled) => return Err(error),
            Err(error) => tracing::warn!(%error, "Validating without the mesh registry"),
        }
        Ok(builder.build())
    }

    /// Runs each checker, and the reference builder, on the blocking pool.
    async fn run(&self, index: Arc<Index>, scope: Scope) -> Result<Validations> {
        let validations = Arc::new(Mutex::new(ValidationMap::default()));
        let mut tasks = JoinSet::new();
        for checker in self.validator.checkers() {
            let checker = checker.clone();
            let index = index.clone();
            let validations = validations.clone();
            tasks.spawn_blocking(move || {
                let findings = checker.check(&index);
                tracing::trace!(checker = checker.name(), findings = findings.len());
                validation::accumulate(&mut validations.lock(), findings);
            });
        }

        let refs = {
            let index = index.clone();
            tokio::task::spawn_blocking(move || references::reference_map(&index))
        };

        while let Some(res) = tasks.join_next().await {
            res.map_err(|e| Error::upstream("validation", e))?;
        }
        let mut references = refs.await.map_err(|e| Error::upstream("validation", e))?;

        let validations = std::mem::take(&mut *validations.lock());
        let validations = validation::finish(&index, &scope, validations);
        references.retain(|key| scope.contains(key));

        Ok(Validations {
            validations,
            references,
        })
    }
}

impl std::fmt::Debug for ValidationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationService")
            .field("clusters", &self.clusters)
            .field("mesh", &self.mesh)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Reads every kind, the workloads and the namespaces of a cluster.
async fn snapshot(store: &dyn ObjectStore) -> Result<ClusterSnapshot> {
    let lists = ObjectKind::ALL.map(|kind| store.list_objects(None, kind));
    let (lists, workloads, namespaces) = tokio::join!(
        future::try_join_all(lists),
        store.list_workloads(None),
        store.list_namespaces(),
    );
    Ok(ClusterSnapshot {
        objects: lists?.into_iter().flatten().collect(),
        workloads: workloads?,
        namespaces: namespaces?,
    })
}

/// Resolves request parameters into a validation scope.
///
/// An empty namespace selects the whole mesh. An unsupported kind is reported as not found.
pub fn scope(namespace: &str, kind: Option<&str>, name: Option<&str>) -> Result<Scope> {
    if namespace.is_empty() {
        return Ok(Scope::Mesh);
    }
    let kind = match kind.filter(|k| !k.is_empty()) {
        Some(kind) => kind.parse::<ObjectKind>()?,
        None => return Ok(Scope::Namespace(namespace.to_string())),
    };
    Ok(match name.filter(|n| !n.is_empty()) {
        Some(name) => Scope::Object(ObjectKey::new(kind, namespace, name)),
        None => Scope::Kind {
            namespace: namespace.to_string(),
            kind,
        },
    })
}

#[cfg(test)]
mod tests;
