use crate::{
    core::{
        AccessReview, ConfigObject, Error, MeshRegistry, ObjectKind, ObjectStore, RegistryService,
        RegistrySnapshot, Result, Verb, Workload,
    },
    k8s::{DynamicObject, Namespace, Pod, ResourceExt, Service},
};
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams},
    core::TypeMeta,
    Client,
};

/// An [`ObjectStore`] backed by a cluster's API server.
///
/// Also serves as the [`MeshRegistry`], reporting the cluster's services.
#[derive(Clone)]
pub struct KubeStore {
    cluster: String,
    client: Client,
    dns_domain: String,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(cluster: impl Into<String>, client: Client, dns_domain: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            client,
            dns_domain: dns_domain.into(),
        }
    }

    fn api(&self, namespace: Option<&str>, kind: ObjectKind) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn decode(&self, kind: ObjectKind, obj: DynamicObject) -> Result<ConfigObject> {
        Ok(ConfigObject::from_dynamic(&self.cluster, kind, obj)?)
    }

    fn error(
        &self,
        error: kube::Error,
        verb: Option<Verb>,
        kind: ObjectKind,
        namespace: &str,
        name: &str,
    ) -> Error {
        match (&error, verb) {
            (kube::Error::Api(rsp), _) if rsp.code == 404 => {
                Error::not_found(kind, namespace, name)
            }
            (kube::Error::Api(rsp), Some(verb)) if rsp.code == 403 => Error::AccessDenied {
                verb,
                kind,
                namespace: namespace.to_string(),
            },
            _ => Error::upstream(&self.cluster, error),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    fn cluster(&self) -> &str {
        &self.cluster
    }

    async fn list_objects(
        &self,
        namespace: Option<&str>,
        kind: ObjectKind,
    ) -> Result<Vec<ConfigObject>> {
        let list = self
            .api(namespace, kind)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::upstream(&self.cluster, e))?;

        let mut objects = Vec::with_capacity(list.items.len());
        for obj in list.items {
            let name = obj.name_any();
            let ns = obj.namespace().unwrap_or_default();
            match self.decode(kind, obj) {
                Ok(obj) => objects.push(obj),
                Err(error) => {
                    tracing::warn!(
                        cluster = %self.cluster,
                        %kind,
                        namespace = %ns,
                        %name,
                        %error,
                        "Skipping malformed object"
                    );
                }
            }
        }
        Ok(objects)
    }

    async fn get_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ConfigObject> {
        let obj = self
            .api(Some(namespace), kind)
            .get(name)
            .await
            .map_err(|e| self.error(e, None, kind, namespace, name))?;
        self.decode(kind, obj)
    }

    async fn create_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        payload: serde_json::Value,
    ) -> Result<ConfigObject> {
        let mut obj: DynamicObject = serde_json::from_value(payload)?;
        obj.types = Some(TypeMeta {
            api_version: kind.api_version(),
            kind: kind.kind().to_string(),
        });
        obj.metadata.namespace = Some(namespace.to_string());
        let name = obj.name_any();

        let created = self
            .api(Some(namespace), kind)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| self.error(e, Some(Verb::Create), kind, namespace, &name))?;
        self.decode(kind, created)
    }

    async fn update_object(
        &self,
        namespace: &str,
        kind: ObjectKind,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<ConfigObject> {
        let updated = self
            .api(Some(namespace), kind)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| self.error(e, Some(Verb::Patch), kind, namespace, name))?;
        self.decode(kind, updated)
    }

    async fn delete_object(&self, namespace: &str, kind: ObjectKind, name: &str) -> Result<()> {
        self.api(Some(namespace), kind)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| self.error(e, Some(Verb::Delete), kind, namespace, name))?;
        Ok(())
    }

    async fn self_access_review(
        &self,
        namespace: &str,
        kind: ObjectKind,
        verbs: &[Verb],
    ) -> Result<Vec<AccessReview>> {
        let api = Api::<SelfSubjectAccessReview>::all(self.client.clone());
        let mut reviews = Vec::with_capacity(verbs.len());
        for &verb in verbs {
            let review = SelfSubjectAccessReview {
                spec: SelfSubjectAccessReviewSpec {
                    resource_attributes: Some(ResourceAttributes {
                        namespace: Some(namespace.to_string()),
                        verb: Some(verb.as_str().to_string()),
                        group: Some(kind.group().to_string()),
                        resource: Some(kind.plural().to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            };
            let review = api
                .create(&PostParams::default(), &review)
                .await
                .map_err(|e| Error::upstream(&self.cluster, e))?;
            reviews.push(AccessReview {
                verb,
                allowed: review.status.map_or(false, |s| s.allowed),
            });
        }
        Ok(reviews)
    }

    async fn list_workloads(&self, namespace: Option<&str>) -> Result<Vec<Workload>> {
        let api = match namespace {
            Some(ns) => Api::<Pod>::namespaced(self.client.clone(), ns),
            None => Api::<Pod>::all(self.client.clone()),
        };
        let pods = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::upstream(&self.cluster, e))?;
        Ok(pods
            .items
            .into_iter()
            .map(|pod| {
                let namespace = pod.namespace().unwrap_or_default();
                let name = pod.name_any();
                Workload::new(namespace, name, pod.metadata.labels.unwrap_or_default())
            })
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces = Api::<Namespace>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::upstream(&self.cluster, e))?;
        Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
    }
}

#[async_trait::async_trait]
impl MeshRegistry for KubeStore {
    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let services = Api::<Service>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::upstream(&self.cluster, e))?;
        Ok(RegistrySnapshot {
            services: services
                .items
                .iter()
                .map(|svc| {
                    RegistryService::new(
                        svc.namespace().unwrap_or_default(),
                        svc.name_any(),
                        &self.dns_domain,
                    )
                })
                .collect(),
            configuration: Vec::new(),
        })
    }
}
