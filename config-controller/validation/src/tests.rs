use super::*;
use maplit::btreemap;
use mesh_config_core::{
    object::IntoConfigObject, IstioValidation, RegistryService, RegistrySnapshot, Severity,
    Workload,
};
use mesh_config_k8s_index::{IndexBuilder, MeshInfo};
use pretty_assertions::assert_eq;

fn load(yaml: &str) -> Vec<ConfigObject> {
    yaml.split("\n---\n")
        .filter(|doc| !doc.trim().is_empty())
        .map(|doc| {
            let value: serde_yaml::Value = serde_yaml::from_str(doc).expect("valid fixture");
            let kind = value["kind"].as_str().expect("fixture kind").to_string();
            match kind.as_str() {
                "Gateway" => parse::<mesh_config_core::k8s::networking::Gateway>(doc),
                "VirtualService" => parse::<mesh_config_core::k8s::networking::VirtualService>(doc),
                "DestinationRule" => parse::<mesh_config_core::k8s::networking::DestinationRule>(doc),
                "ServiceEntry" => parse::<mesh_config_core::k8s::networking::ServiceEntry>(doc),
                "Sidecar" => parse::<mesh_config_core::k8s::networking::Sidecar>(doc),
                "AuthorizationPolicy" => {
                    parse::<mesh_config_core::k8s::security::AuthorizationPolicy>(doc)
                }
                "PeerAuthentication" => {
                    parse::<mesh_config_core::k8s::security::PeerAuthentication>(doc)
                }
                "RequestAuthentication" => {
                    parse::<mesh_config_core::k8s::security::RequestAuthentication>(doc)
                }
                kind => panic!("unexpected fixture kind {kind}"),
            }
        })
        .collect()
}

fn parse<T>(doc: &str) -> ConfigObject
where
    T: serde::de::DeserializeOwned + IntoConfigObject,
{
    let resource: T = serde_yaml::from_str(doc).expect("valid fixture");
    ConfigObject::from_resource("east", resource)
}

fn index(yaml: &str) -> Index {
    let mesh = MeshInfo::default();
    let services = [
        ("bookinfo", "reviews"),
        ("bookinfo", "ratings"),
        ("bookinfo", "productpage"),
        ("istio-system", "istio-ingressgateway"),
    ]
    .into_iter()
    .map(|(ns, name)| RegistryService::new(ns, name, &mesh.dns_domain))
    .collect();

    IndexBuilder::new(mesh)
        .objects(load(yaml))
        .registry(RegistrySnapshot {
            services,
            configuration: vec![],
        })
        .workloads(vec![
            Workload::new(
                "bookinfo",
                "reviews-v1",
                btreemap! { "app".into() => "reviews".into(), "version".into() => "v1".into() },
            ),
            Workload::new(
                "bookinfo",
                "reviews-v2",
                btreemap! { "app".into() => "reviews".into(), "version".into() => "v2".into() },
            ),
            Workload::new(
                "istio-system",
                "istio-ingressgateway",
                btreemap! { "istio".into() => "ingressgateway".into() },
            ),
        ])
        .namespaces(vec!["bookinfo".to_string(), "istio-system".to_string()])
        .build()
}

fn validate(yaml: &str) -> ValidationMap {
    Validator::default().validate(&index(yaml), &Scope::Mesh)
}

fn codes(validations: &ValidationMap, kind: ObjectKind, ns: &str, name: &str) -> Vec<&'static str> {
    let mut codes = validations
        .get(&ObjectKey::new(kind, ns, name))
        .unwrap_or_else(|| panic!("missing validation for {kind} {ns}/{name}"))
        .checks
        .iter()
        .map(|c| c.code)
        .collect::<Vec<_>>();
    codes.sort_unstable();
    codes
}

const BOOKINFO: &str = r#"
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: bookinfo-gateway
  namespace: bookinfo
spec:
  selector:
    istio: ingressgateway
  servers:
  - port:
      number: 80
      name: http
      protocol: HTTP
    hosts:
    - "bookinfo.example.com"
---
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: bookinfo
  namespace: bookinfo
spec:
  hosts:
  - bookinfo.example.com
  gateways:
  - bookinfo-gateway
  http:
  - route:
    - destination:
        host: productpage
---
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: reviews
  namespace: bookinfo
spec:
  hosts:
  - reviews
  http:
  - route:
    - destination:
        host: reviews
        subset: v1
      weight: 50
    - destination:
        host: reviews
        subset: v2
      weight: 50
---
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: reviews
  namespace: bookinfo
spec:
  host: reviews
  subsets:
  - name: v1
    labels:
      version: v1
  - name: v2
    labels:
      version: v2
"#;

#[test]
fn valid_configuration() {
    let validations = validate(BOOKINFO);
    assert_eq!(validations.len(), 4);
    for (key, validation) in validations.iter() {
        assert_eq!(validation, &IstioValidation::default(), "{key}");
    }
}

#[test]
fn idempotent() {
    let validator = Validator::default();
    for yaml in [BOOKINFO.to_string(), format!("{BOOKINFO}\n---\n{BROKEN_VS}")] {
        let idx = index(&yaml);
        let first = validator.validate(&idx, &Scope::Mesh);
        let second = validator.validate(&idx, &Scope::Mesh);
        assert_eq!(first, second);
    }
}

const BROKEN_VS: &str = r#"
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: broken
  namespace: bookinfo
spec:
  hosts:
  - details
  gateways:
  - missing-gateway
  http:
  - route:
    - destination:
        host: details
    - destination:
        host: reviews
        subset: v3
      weight: 20
"#;

#[test]
fn virtual_service_checks() {
    let validations = validate(&format!("{BOOKINFO}\n---\n{BROKEN_VS}"));
    assert_eq!(
        codes(&validations, ObjectKind::VirtualService, "bookinfo", "broken"),
        vec!["KIA1101", "KIA1102", "KIA1104", "KIA1105", "KIA1107"]
    );

    let broken = validations
        .get(&ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "broken"))
        .unwrap();
    assert!(!broken.valid);
    let paths = broken
        .checks
        .iter()
        .map(|c| (c.code, c.path.as_str()))
        .collect::<Vec<_>>();
    assert!(paths.contains(&("KIA1101", "spec/http[0]/route[0]/destination/host")));
    assert!(paths.contains(&("KIA1107", "spec/http[0]/route[1]/destination")));
    assert!(paths.contains(&("KIA1104", "spec/http[0]/route")));
    assert!(paths.contains(&("KIA1105", "spec/gateways[0]")));
}

const OVERSIZED_WEIGHTS: &str = r#"
apiVersion: networking.istio.io/v1beta1
kind: VirtualService
metadata:
  name: oversized
  namespace: bookinfo
spec:
  hosts:
  - reviews
  http:
  - route:
    - destination:
        host: reviews
      weight: 2147483647
    - destination:
        host: ratings
      weight: 2147483647
  - route:
    - destination:
        host: reviews
      weight: 2147483647
    - destination:
        host: ratings
      weight: 2147483647
    - destination:
        host: productpage
      weight: 102
"#;

#[test]
fn oversized_weights_are_reported() {
    let validations = validate(OVERSIZED_WEIGHTS);
    let oversized = validations
        .get(&ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "oversized"))
        .unwrap();
    assert!(!oversized.valid);
    let paths = oversized
        .checks
        .iter()
        .map(|c| (c.code, c.path.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            ("KIA1104", "spec/http[0]/route"),
            ("KIA1104", "spec/http[1]/route"),
        ]
    );
}

#[test]
fn gateway_checks() {
    let validations = validate(&format!(
        r#"{BOOKINFO}
---
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: duplicate
  namespace: istio-system
spec:
  selector:
    istio: ingressgateway
  servers:
  - port:
      number: 80
      name: http
      protocol: HTTP
    hosts:
    - "*.example.com"
---
apiVersion: networking.istio.io/v1beta1
kind: Gateway
metadata:
  name: orphan
  namespace: istio-system
spec:
  selector:
    istio: egressgateway
  servers:
  - port:
      number: 80
      name: http
      protocol: HTTP
    hosts:
    - "bookinfo.example.com"
"#
    ));

    assert_eq!(
        codes(&validations, ObjectKind::Gateway, "bookinfo", "bookinfo-gateway"),
        vec!["KIA0301"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::Gateway, "istio-system", "duplicate"),
        vec!["KIA0301"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::Gateway, "istio-system", "orphan"),
        vec!["KIA0302"]
    );

    // The selector is matched against workloads in every namespace.
    let orphan = validations
        .get(&ObjectKey::new(ObjectKind::Gateway, "istio-system", "orphan"))
        .unwrap();
    assert_eq!(
        orphan.checks[0].message,
        "No matching workload found for gateway selector in any namespace"
    );
}

#[test]
fn destination_rule_checks() {
    let validations = validate(&format!(
        r#"{BOOKINFO}
---
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: reviews-dup
  namespace: bookinfo
spec:
  host: reviews.bookinfo.svc.cluster.local
  subsets:
  - name: v2
    labels:
      version: v2
  - name: v3
    labels:
      version: v3
---
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: details
  namespace: bookinfo
spec:
  host: details
"#
    ));

    assert_eq!(
        codes(&validations, ObjectKind::DestinationRule, "bookinfo", "reviews"),
        vec!["KIA0201"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::DestinationRule, "bookinfo", "reviews-dup"),
        vec!["KIA0201", "KIA0203"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::DestinationRule, "bookinfo", "details"),
        vec!["KIA0202"]
    );
}

#[test]
fn mtls_checks() {
    let validations = validate(
        r#"
apiVersion: security.istio.io/v1beta1
kind: PeerAuthentication
metadata:
  name: default
  namespace: istio-system
spec:
  mtls:
    mode: STRICT
---
apiVersion: security.istio.io/v1beta1
kind: PeerAuthentication
metadata:
  name: extra
  namespace: istio-system
spec: {}
---
apiVersion: security.istio.io/v1beta1
kind: PeerAuthentication
metadata:
  name: default
  namespace: bookinfo
spec:
  mtls:
    mode: DISABLE
---
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: ingress
  namespace: bookinfo
spec:
  host: istio-ingressgateway.istio-system.svc.cluster.local
  trafficPolicy:
    tls:
      mode: DISABLE
---
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: ratings
  namespace: istio-system
spec:
  host: ratings.bookinfo.svc.cluster.local
  trafficPolicy:
    tls:
      mode: ISTIO_MUTUAL
"#,
    );

    assert_eq!(
        codes(&validations, ObjectKind::DestinationRule, "bookinfo", "ingress"),
        vec!["KIA0204"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::DestinationRule, "istio-system", "ratings"),
        vec!["KIA0205"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::PeerAuthentication, "istio-system", "default"),
        vec!["KIA0401", "KIA0402"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::PeerAuthentication, "istio-system", "extra"),
        vec!["KIA0401"]
    );
    assert!(validations
        .get(&ObjectKey::new(ObjectKind::PeerAuthentication, "bookinfo", "default"))
        .unwrap()
        .valid);
}

#[test]
fn security_policy_checks() {
    let validations = validate(
        r#"
apiVersion: security.istio.io/v1beta1
kind: AuthorizationPolicy
metadata:
  name: allow-frontend
  namespace: bookinfo
spec:
  selector:
    matchLabels:
      app: reviews
  rules:
  - from:
    - source:
        namespaces: ["bookinfo", "frontend", "team-*"]
    to:
    - operation:
        hosts: ["reviews:9080", "details", "*.example.com"]
---
apiVersion: security.istio.io/v1beta1
kind: RequestAuthentication
metadata:
  name: jwt
  namespace: bookinfo
spec:
  selector:
    matchLabels:
      app: productpage
  jwtRules:
  - issuer: "https://issuer.example.com"
  - jwksUri: "https://issuer.example.com/jwks"
"#,
    );

    let ap = validations
        .get(&ObjectKey::new(ObjectKind::AuthorizationPolicy, "bookinfo", "allow-frontend"))
        .unwrap();
    assert!(!ap.valid);
    assert_eq!(
        ap.checks
            .iter()
            .map(|c| (c.code, c.path.as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("KIA0101", "spec/rules[0]/from[0]/source/namespaces[1]"),
            ("KIA0102", "spec/rules[0]/to[0]/operation/hosts[1]"),
        ]
    );

    assert_eq!(
        codes(&validations, ObjectKind::RequestAuthentication, "bookinfo", "jwt"),
        vec!["KIA0004", "KIA1301"]
    );
    let ra = validations
        .get(&ObjectKey::new(ObjectKind::RequestAuthentication, "bookinfo", "jwt"))
        .unwrap();
    assert!(ra
        .checks
        .iter()
        .any(|c| c.severity == Severity::Warning && c.path == "spec/selector"));
}

#[test]
fn sidecar_checks() {
    let validations = validate(
        r#"
apiVersion: networking.istio.io/v1beta1
kind: Sidecar
metadata:
  name: default
  namespace: bookinfo
spec:
  egress:
  - hosts:
    - "./reviews.bookinfo.svc.cluster.local"
    - "istio-system/*"
    - "bookinfo/details.bookinfo.svc.cluster.local"
---
apiVersion: networking.istio.io/v1beta1
kind: Sidecar
metadata:
  name: other
  namespace: bookinfo
spec: {}
---
apiVersion: networking.istio.io/v1beta1
kind: Sidecar
metadata:
  name: ratings
  namespace: bookinfo
spec:
  workloadSelector:
    labels:
      app: ratings
"#,
    );

    assert_eq!(
        codes(&validations, ObjectKind::Sidecar, "bookinfo", "default"),
        vec!["KIA1004", "KIA1005"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::Sidecar, "bookinfo", "other"),
        vec!["KIA1005"]
    );
    assert_eq!(
        codes(&validations, ObjectKind::Sidecar, "bookinfo", "ratings"),
        vec!["KIA0004"]
    );
}

#[test]
fn retains_requested_scope() {
    let idx = index(&format!("{BOOKINFO}\n---\n{BROKEN_VS}"));
    let validator = Validator::default();

    let key = ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "broken");
    let validations = validator.validate(&idx, &Scope::Object(key.clone()));
    assert_eq!(validations.len(), 1);
    assert!(!validations.get(&key).unwrap().valid);

    let validations = validator.validate(
        &idx,
        &Scope::Kind {
            namespace: "bookinfo".to_string(),
            kind: ObjectKind::DestinationRule,
        },
    );
    assert_eq!(validations.len(), 1);

    let validations = validator.validate(&idx, &Scope::Namespace("other".to_string()));
    assert!(validations.is_empty());

    let missing = ObjectKey::new(ObjectKind::VirtualService, "bookinfo", "missing");
    assert!(validator
        .validate(&idx, &Scope::Object(missing))
        .is_empty());
}
