use super::*;
use crate::{
    core::{ConfigSpec, ServiceReference},
    fake::{FakeRegistry, FakeStore},
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn object(kind: ObjectKind, namespace: &str, name: &str, spec: serde_json::Value) -> ConfigObject {
    let spec = ConfigSpec::from_json(kind, spec).expect("valid spec");
    ConfigObject::new("", namespace, name, spec)
}

fn reviews_vs() -> ConfigObject {
    object(
        ObjectKind::VirtualService,
        "bookinfo",
        "reviews",
        json!({
            "hosts": ["reviews"],
            "http": [{ "route": [{ "destination": { "host": "reviews", "subset": "v1" } }] }],
        }),
    )
}

fn reviews_dr() -> ConfigObject {
    object(
        ObjectKind::DestinationRule,
        "bookinfo",
        "reviews",
        json!({
            "host": "reviews",
            "subsets": [{ "name": "v1", "labels": { "version": "v1" } }],
        }),
    )
}

fn reviews_v1() -> Workload {
    Workload::new(
        "bookinfo",
        "reviews-v1",
        maplit::btreemap! {
            "app".to_string() => "reviews".to_string(),
            "version".to_string() => "v1".to_string(),
        },
    )
}

struct Mesh {
    home: Arc<FakeStore>,
    east: Arc<FakeStore>,
    registry: Arc<FakeRegistry>,
    service: ValidationService,
}

/// The virtual service lives in the home cluster, its destination rule in `east`.
fn mesh() -> Mesh {
    let home = Arc::new(
        FakeStore::new("home")
            .with_objects(vec![reviews_vs()])
            .with_workloads(vec![reviews_v1()])
            .with_namespaces(&["bookinfo"]),
    );
    let east = Arc::new(
        FakeStore::new("east")
            .with_objects(vec![reviews_dr()])
            .with_namespaces(&["bookinfo"]),
    );
    let registry = Arc::new(FakeRegistry::new(&[("bookinfo", "reviews")]));
    let clusters = Clusters::new(home.clone()).with_remote(east.clone());
    let service = ValidationService::new(
        clusters,
        registry.clone(),
        MeshInfo::default(),
        Validator::default(),
        Duration::from_secs(5),
    );
    Mesh {
        home,
        east,
        registry,
        service,
    }
}

fn vs_key() -> ObjectKey {
    ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "reviews")
}

fn codes(validations: &Validations, key: &ObjectKey) -> Vec<&'static str> {
    let mut codes = validations
        .validations
        .get(key)
        .unwrap_or_else(|| panic!("missing validation for {key}"))
        .checks
        .iter()
        .map(|c| c.code)
        .collect::<Vec<_>>();
    codes.sort_unstable();
    codes
}

#[tokio::test]
async fn validates_against_every_cluster() {
    let mesh = mesh();
    let scope = Scope::Namespace("bookinfo".to_string());

    let out = mesh
        .service
        .get_validations("home", scope, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out.validations.len(), 2);
    assert_eq!(codes(&out, &vs_key()), Vec::<&str>::new());
    assert!(out.validations.get(&vs_key()).unwrap().valid);

    let refs = out.references.get(&vs_key()).expect("references");
    assert_eq!(
        refs.service_references,
        vec![ServiceReference::new("bookinfo", "reviews")]
    );
    assert_eq!(
        refs.object_references,
        vec![ObjectKey::new(ObjectKind::DestinationRule, "bookinfo", "reviews")]
    );
}

#[tokio::test]
async fn unavailable_remote_degrades() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .try_init()
        .ok();

    let mesh = mesh();
    mesh.east.set_unavailable(true);

    let out = mesh
        .service
        .get_validations("home", Scope::Mesh, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(codes(&out, &vs_key()), vec!["KIA1107"]);
    assert!(out.validations.get(&vs_key()).unwrap().valid);
}

#[tokio::test]
async fn unavailable_registry_degrades() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .try_init()
        .ok();

    let mesh = mesh();
    mesh.registry.set_unavailable(true);

    let out = mesh
        .service
        .get_validations("home", Scope::Mesh, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(codes(&out, &vs_key()), vec!["KIA1101", "KIA1102"]);
    assert!(!out.validations.get(&vs_key()).unwrap().valid);
}

#[tokio::test]
async fn requested_cluster_must_be_readable() {
    let mesh = mesh();
    mesh.home.set_unavailable(true);

    let err = mesh
        .service
        .get_validations("home", Scope::Mesh, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable { ref cluster, .. } if cluster == "home"));

    let out = mesh
        .service
        .get_validations("east", Scope::Mesh, &CancellationToken::new())
        .await
        .unwrap();
    assert!(out.validations.get(&vs_key()).is_none());
}

#[tokio::test]
async fn unknown_cluster_is_rejected() {
    let mesh = mesh();
    let err = mesh
        .service
        .get_validations("west", Scope::Mesh, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCluster(_)));
}

#[tokio::test]
async fn retains_requested_object() {
    let mesh = mesh();

    let out = mesh
        .service
        .get_validations("home", Scope::Object(vs_key()), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        out.validations.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
        vec![vs_key()]
    );
    assert_eq!(out.references.keys().cloned().collect::<Vec<_>>(), vec![vs_key()]);
}

#[tokio::test]
async fn missing_object_has_no_results() {
    let mesh = mesh();
    let key = ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "missing");

    let out = mesh
        .service
        .get_validations("home", Scope::Object(key), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out, Validations::default());
}

#[tokio::test]
async fn references_unknown_services() {
    let home = Arc::new(FakeStore::new("home").with_objects(vec![object(
        ObjectKind::VirtualService,
        "test",
        "product-vs",
        json!({
            "hosts": ["product"],
            "gateways": ["mesh"],
            "http": [{ "route": [{ "destination": { "host": "product", "subset": "v1" } }] }],
            "tcp": [
                { "route": [{ "destination": { "host": "product2" } }] },
                { "route": [{ "destination": { "host": "product" } }] },
            ],
        }),
    )]));
    let service = ValidationService::new(
        Clusters::new(home),
        Arc::new(FakeRegistry::new(&[])),
        MeshInfo::default(),
        Validator::default(),
        Duration::from_secs(5),
    );
    let key = ObjectKey::new(ObjectKind::VirtualService, "test", "product-vs");

    let out = service
        .get_validations("home", Scope::Object(key.clone()), &CancellationToken::new())
        .await
        .unwrap();
    let refs = out.references.get(&key).expect("references");
    assert_eq!(
        refs.service_references,
        vec![
            ServiceReference::new("test", "product"),
            ServiceReference::new("test", "product2"),
        ]
    );
    assert!(refs.object_references.is_empty());
    assert!(refs.workload_references.is_empty());
}

#[tokio::test]
async fn repeated_validation_is_stable() {
    let mesh = mesh();
    mesh.east.set_unavailable(true);
    let cancel = CancellationToken::new();

    let first = mesh
        .service
        .get_validations("home", Scope::Mesh, &cancel)
        .await
        .unwrap();
    let second = mesh
        .service
        .get_validations("home", Scope::Mesh, &cancel)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cancellation_abandons_validation() {
    let mesh = mesh();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = mesh
        .service
        .get_validations("home", Scope::Mesh, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn parses_scope() {
    assert_eq!(scope("", Some("gateways"), None).unwrap(), Scope::Mesh);
    assert_eq!(
        scope("bookinfo", None, None).unwrap(),
        Scope::Namespace("bookinfo".to_string())
    );
    assert_eq!(
        scope("bookinfo", Some("destinationrules"), Some("")).unwrap(),
        Scope::Kind {
            namespace: "bookinfo".to_string(),
            kind: ObjectKind::DestinationRule,
        }
    );
    assert_eq!(
        scope("bookinfo", Some("virtualservices"), Some("reviews")).unwrap(),
        Scope::Object(vs_key())
    );
    assert!(scope("bookinfo", Some("rules-bad"), Some("x"))
        .unwrap_err()
        .is_not_found());
}
