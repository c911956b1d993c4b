use crate::{
    clusters::Clusters,
    config::bounded,
    core::{Error, ObjectKind, ObjectStore, ResourcePermissions, Result, Verb},
};
use futures::future;
use std::{collections::BTreeMap, sync::Arc};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Identities allowed to write configuration.
///
/// Loaded once at startup. When a request carries an identity that is not listed here, every
/// write permission is withheld.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    admins: Vec<String>,
}

/// Computes create, update and delete rights per cluster.
#[derive(Clone, Debug)]
pub struct PermissionResolver {
    clusters: Clusters,
    policy: Arc<AccessPolicy>,
    timeout: Duration,
}

// === impl AccessPolicy ===

impl AccessPolicy {
    pub fn new(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Matches `identity` against the admin list. A bare user name matches the local part of a
    /// `user@domain` entry and vice versa.
    pub fn is_admin(&self, identity: &str) -> bool {
        let local = |s: &str| s.split_once('@').map_or(s, |(user, _)| user).to_string();
        self.admins.iter().any(|admin| {
            admin == identity
                || (!admin.contains('@') && *admin == local(identity))
                || (!identity.contains('@') && local(admin) == identity)
        })
    }

    fn allows_writes(&self, identity: Option<&str>) -> bool {
        identity.map_or(true, |id| self.is_admin(id))
    }
}

// === impl PermissionResolver ===

impl PermissionResolver {
    pub fn new(clusters: Clusters, policy: Arc<AccessPolicy>, timeout: Duration) -> Self {
        Self {
            clusters,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Resolves permissions on a single cluster.
    ///
    /// Each verb is reviewed independently; a review that fails or times out denies that verb
    /// only. Remote clusters never grant update or delete. Cancellation fails the resolution.
    pub async fn resolve(
        &self,
        store: &dyn ObjectStore,
        namespace: &str,
        kind: ObjectKind,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResourcePermissions> {
        if !self.policy.allows_writes(identity) {
            tracing::debug!(identity, "Identity is read-only");
            return Ok(ResourcePermissions::default());
        }

        let cluster = store.cluster();
        let reviews = Verb::ALL.map(|verb| async move {
            let review = bounded(
                cluster,
                self.timeout,
                cancel,
                store.self_access_review(namespace, kind, &[verb]),
            )
            .await;
            match review {
                Ok(reviews) => Ok(reviews.into_iter().any(|r| r.verb == verb && r.allowed)),
                Err(Error::Cancelled) => Err(Error::Cancelled),
                Err(error) => {
                    tracing::warn!(
                        %cluster,
                        %namespace,
                        %kind,
                        %verb,
                        %error,
                        "Access review failed"
                    );
                    Ok(false)
                }
            }
        });
        let [create, update, delete] = future::try_join_all(reviews)
            .await?
            .try_into()
            .unwrap_or([false; 3]);

        let perms = ResourcePermissions {
            create,
            update,
            delete,
        };
        if self.clusters.is_home(cluster) {
            Ok(perms)
        } else {
            Ok(perms.observe_only())
        }
    }

    /// Resolves permissions on every cluster concurrently.
    pub async fn resolve_all(
        &self,
        namespace: &str,
        kind: ObjectKind,
        identity: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, ResourcePermissions>> {
        let clusters = self.clusters.iter().map(|(name, store)| async move {
            let perms = self
                .resolve(store.as_ref(), namespace, kind, identity, cancel)
                .await?;
            Ok::<_, Error>((name.to_string(), perms))
        });
        Ok(future::try_join_all(clusters).await?.into_iter().collect())
    }
}
