//! Traffic-policy resolution across a destination rule and its subsets.

use crate::{host::filter_by_host, MeshInfo};
use mesh_config_core::{k8s::networking::destination_rule::Subset, ConfigObject};

/// Returns true if `dr` declares a connection pool or outlier detection policy that applies to
/// `version` of `service` in `namespace`.
///
/// Rule-level policy applies to every version. A subset's policy applies to the version named by
/// its version label, or by its name when unlabeled. An empty `version` is satisfied by any
/// subset's policy.
pub fn has_circuit_breaker(
    mesh: &MeshInfo,
    dr: &ConfigObject,
    namespace: &str,
    service: &str,
    version: &str,
) -> bool {
    let spec = match dr.as_destination_rule() {
        Some(spec) => spec,
        None => return false,
    };
    if !filter_by_host(&spec.host, &dr.namespace, service, namespace, &mesh.dns_domain) {
        return false;
    }

    if spec
        .traffic_policy
        .as_ref()
        .map_or(false, |tp| tp.has_circuit_breaker())
    {
        return true;
    }

    spec.subsets
        .iter()
        .filter(|s| version.is_empty() || subset_version(mesh, s) == version)
        .any(|s| {
            s.traffic_policy
                .as_ref()
                .map_or(false, |tp| tp.has_circuit_breaker())
        })
}

fn subset_version<'s>(mesh: &MeshInfo, subset: &'s Subset) -> &'s str {
    subset
        .labels
        .get(&mesh.version_label)
        .map(String::as_str)
        .unwrap_or(&subset.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_config_core::k8s::networking::DestinationRule;
    use rstest::rstest;

    fn load(yaml: &str) -> ConfigObject {
        let dr: DestinationRule = serde_yaml::from_str(yaml).expect("valid fixture");
        ConfigObject::from_resource("east", dr)
    }

    const RULE_LEVEL: &str = r#"
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: reviews-cb
  namespace: bookinfo
spec:
  host: reviews
  trafficPolicy:
    connectionPool:
      tcp:
        maxConnections: 100
    outlierDetection:
      consecutive5xxErrors: 7
  subsets:
  - name: v1
    labels:
      version: v1
  - name: v2
    labels:
      version: v2
"#;

    #[rstest]
    #[case("bookinfo", "reviews", "", true)]
    #[case("bookinfo", "reviews", "v1", true)]
    #[case("bookinfo", "reviews", "v2", true)]
    #[case("bookinfo", "reviews", "v3", true)]
    #[case("bookinfo", "reviews-bad", "", false)]
    #[case("other", "reviews", "", false)]
    #[case("bookinfo", "", "", false)]
    #[case("bookinfo", "", "v1", false)]
    fn rule_level_policy_covers_all_versions(
        #[case] namespace: &str,
        #[case] service: &str,
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        let dr = load(RULE_LEVEL);
        assert_eq!(
            has_circuit_breaker(&MeshInfo::default(), &dr, namespace, service, version),
            expected
        );
    }

    #[test]
    fn subset_policy_covers_its_version() {
        let mesh = MeshInfo::default();
        let dr = load(
            r#"
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: reviews-cb
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
    trafficPolicy:
      connectionPool:
        http:
          http1MaxPendingRequests: 1
"#,
        );

        assert!(!has_circuit_breaker(&mesh, &dr, "bookinfo", "reviews", "v1"));
        assert!(has_circuit_breaker(&mesh, &dr, "bookinfo", "reviews", "v2"));
        assert!(has_circuit_breaker(&mesh, &dr, "bookinfo", "reviews", ""));
        assert!(!has_circuit_breaker(&mesh, &dr, "bookinfo", "reviews-bad", ""));
    }

    #[test]
    fn policy_without_limits_is_not_a_circuit_breaker() {
        let mesh = MeshInfo::default();
        let dr = load(
            r#"
apiVersion: networking.istio.io/v1beta1
kind: DestinationRule
metadata:
  name: reviews-tls
  namespace: bookinfo
spec:
  host: reviews.bookinfo.svc.cluster.local
  trafficPolicy:
    tls:
      mode: ISTIO_MUTUAL
"#,
        );

        assert!(!has_circuit_breaker(&mesh, &dr, "bookinfo", "reviews", ""));
    }
}
