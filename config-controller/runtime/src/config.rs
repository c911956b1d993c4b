use crate::{
    clusters::Clusters,
    core::{
        selector, ConfigCriteria, ConfigObject, Error, ObjectKind, ObjectStore,
        ResourcePermissions, Result, Verb,
    },
    permissions::PermissionResolver,
};
use futures::future;
use serde::Serialize;
use std::{collections::BTreeMap, future::Future, sync::Arc};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lists, fetches and writes configuration objects across clusters.
#[derive(Clone, Debug)]
pub struct ConfigService {
    clusters: Clusters,
    permissions: PermissionResolver,
    timeout: Duration,
}

/// The objects of one cluster that satisfy a [`ConfigCriteria`], grouped by kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConfigList {
    pub cluster: String,
    pub namespace: String,
    pub objects: BTreeMap<ObjectKind, Vec<ConfigObject>>,
}

/// Listings from every cluster that answered, and the errors of those that did not.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MultiClusterList {
    pub lists: Vec<ConfigList>,
    pub errors: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigDetails {
    pub object: ConfigObject,
    pub permissions: ResourcePermissions,
}

// === impl ConfigService ===

impl ConfigService {
    pub fn new(clusters: Clusters, permissions: PermissionResolver, timeout: Duration) -> Self {
        Self {
            clusters,
            permissions,
            timeout,
        }
    }

    pub fn clusters(&self) -> &Clusters {
        &self.clusters
    }

    /// Lists every included kind on `cluster` concurrently, then narrows the results by the
    /// criteria's label and workload selectors.
    pub async fn list_config(
        &self,
        cluster: &str,
        criteria: &ConfigCriteria,
        cancel: &CancellationToken,
    ) -> Result<ConfigList> {
        let store = self.clusters.get(cluster)?;
        let namespace = criteria.namespace();
        let lists = criteria.kinds.iter().map(|&kind| async move {
            let objects = store.list_objects(namespace, kind).await?;
            Ok::<_, Error>((kind, filter(criteria, kind, objects)))
        });
        let objects = self
            .bounded(cluster, cancel, future::try_join_all(lists))
            .await?
            .into_iter()
            .collect();

        Ok(ConfigList {
            cluster: cluster.to_string(),
            namespace: criteria.namespace.clone(),
            objects,
        })
    }

    /// Lists on every cluster in parallel. A failing cluster is reported in `errors` without
    /// affecting the others; cancellation fails the whole request.
    pub async fn list_config_all(
        &self,
        criteria: &ConfigCriteria,
        cancel: &CancellationToken,
    ) -> Result<MultiClusterList> {
        let results = future::join_all(
            self.clusters
                .names()
                .map(|cluster| async move {
                    (cluster, self.list_config(cluster, criteria, cancel).await)
                }),
        )
        .await;

        let mut out = MultiClusterList::default();
        for (cluster, result) in results {
            match result {
                Ok(list) => out.lists.push(list),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(error) => {
                    tracing::warn!(%cluster, %error, "Failed to list configuration");
                    out.errors.insert(cluster.to_string(), error.to_string());
                }
            }
        }
        Ok(out)
    }

    /// Fetches a single object with the caller's permissions on its kind.
    ///
    /// An unsupported `kind` is reported as not found.
    pub async fn get_config_details(
        &self,
        cluster: &str,
        namespace: &str,
        kind: &str,
        name: &str,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ConfigDetails> {
        let kind = kind.parse::<ObjectKind>()?;
        let store = self.clusters.get(cluster)?;
        let (object, permissions) = self
            .bounded(cluster, cancel, async {
                let (object, permissions) = tokio::join!(
                    store.get_object(namespace, kind, name),
                    self.permissions
                        .resolve(store.as_ref(), namespace, kind, identity, cancel),
                );
                Ok::<_, Error>((object?, permissions?))
            })
            .await?;
        Ok(ConfigDetails {
            object,
            permissions,
        })
    }

    pub async fn create_config(
        &self,
        cluster: &str,
        namespace: &str,
        kind: ObjectKind,
        payload: serde_json::Value,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ConfigObject> {
        let store = self.writable(cluster, namespace, kind, Verb::Create, identity)?;
        let obj = self
            .bounded(cluster, cancel, store.create_object(namespace, kind, payload))
            .await?;
        tracing::info!(%cluster, %namespace, %kind, name = %obj.name, "Created");
        Ok(obj)
    }

    /// Applies `patch` to an object as a JSON merge patch.
    pub async fn update_config(
        &self,
        cluster: &str,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        patch: serde_json::Value,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ConfigObject> {
        let store = self.writable(cluster, namespace, kind, Verb::Patch, identity)?;
        let obj = self
            .bounded(cluster, cancel, store.update_object(namespace, kind, name, patch))
            .await?;
        tracing::info!(%cluster, %namespace, %kind, %name, "Updated");
        Ok(obj)
    }

    pub async fn delete_config(
        &self,
        cluster: &str,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let store = self.writable(cluster, namespace, kind, Verb::Delete, identity)?;
        self.bounded(cluster, cancel, store.delete_object(namespace, kind, name))
            .await?;
        tracing::info!(%cluster, %namespace, %kind, %name, "Deleted");
        Ok(())
    }

    /// Rejects writes that no permission resolution could allow: updates and deletes on remote
    /// clusters, and any write by a non-admin identity. Everything else is left to the cluster's
    /// own RBAC.
    fn writable(
        &self,
        cluster: &str,
        namespace: &str,
        kind: ObjectKind,
        verb: Verb,
        identity: Option<&str>,
    ) -> Result<&Arc<dyn ObjectStore>> {
        let store = self.clusters.get(cluster)?;
        let remote_denied = !self.clusters.is_home(cluster) && verb != Verb::Create;
        let identity_denied = identity.map_or(false, |id| !self.permissions.policy().is_admin(id));
        if remote_denied || identity_denied {
            return Err(Error::AccessDenied {
                verb,
                kind,
                namespace: namespace.to_string(),
            });
        }
        Ok(store)
    }

    async fn bounded<T>(
        &self,
        cluster: &str,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        bounded(cluster, self.timeout, cancel, fut).await
    }
}

/// Runs `fut` until it completes, `timeout` elapses, or `cancel` fires.
pub(crate) async fn bounded<T>(
    cluster: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(res) => res,
            Err(_) => Err(Error::upstream(
                cluster,
                anyhow::anyhow!("timed out after {}s", timeout.as_secs()),
            )),
        },
    }
}

/// Applies a listing's label selector to every kind, and its workload selector to the kinds
/// that select workloads.
fn filter(
    criteria: &ConfigCriteria,
    kind: ObjectKind,
    objects: Vec<ConfigObject>,
) -> Vec<ConfigObject> {
    let objects = match criteria.label_selector.as_deref() {
        Some(selector) => selector::filter_by_selector(selector, objects),
        None => objects,
    };
    match criteria.workload_selector.as_deref() {
        Some(selector) if selects_workloads(kind) => {
            selector::filter_by_workload_selector(selector, objects)
        }
        _ => objects,
    }
}

fn selects_workloads(kind: ObjectKind) -> bool {
    matches!(
        kind,
        ObjectKind::Gateway
            | ObjectKind::Sidecar
            | ObjectKind::EnvoyFilter
            | ObjectKind::AuthorizationPolicy
            | ObjectKind::PeerAuthentication
            | ObjectKind::RequestAuthentication
    )
}
