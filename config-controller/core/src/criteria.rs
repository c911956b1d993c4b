use crate::ObjectKind;
use serde::Serialize;
use std::collections::BTreeSet;

/// A structured inclusion set for configuration listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCriteria {
    /// Empty when every namespace is requested.
    pub namespace: String,
    pub all_namespaces: bool,
    pub kinds: BTreeSet<ObjectKind>,
    pub label_selector: Option<String>,
    pub workload_selector: Option<String>,
}

// === impl ConfigCriteria ===

impl ConfigCriteria {
    /// Resolves request parameters into criteria.
    ///
    /// `kinds` is a comma-separated list of plural resource names. Unrecognized names are
    /// ignored; an empty list selects every kind.
    pub fn parse(
        namespace: &str,
        kinds: &str,
        label_selector: &str,
        workload_selector: &str,
        all_namespaces: bool,
    ) -> Self {
        let kinds = if kinds.trim().is_empty() {
            ObjectKind::ALL.into_iter().collect()
        } else {
            kinds
                .split(',')
                .filter_map(|token| token.trim().parse::<ObjectKind>().ok())
                .collect()
        };

        Self {
            namespace: if all_namespaces {
                String::new()
            } else {
                namespace.to_string()
            },
            all_namespaces,
            kinds,
            label_selector: non_empty(label_selector),
            workload_selector: non_empty(workload_selector),
        }
    }

    pub fn includes(&self, kind: ObjectKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// The namespace to list from, or `None` for every namespace.
    pub fn namespace(&self) -> Option<&str> {
        if self.all_namespaces || self.namespace.is_empty() {
            return None;
        }
        Some(&self.namespace)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Some(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_kinds_include_everything() {
        let criteria = ConfigCriteria::parse("", "", "", "", true);
        assert_eq!(criteria.namespace, "");
        assert_eq!(criteria.namespace(), None);
        for kind in ObjectKind::ALL {
            assert!(criteria.includes(kind), "{kind} should be included");
        }
        assert_eq!(criteria.label_selector, None);
        assert_eq!(criteria.workload_selector, None);
    }

    #[test]
    fn parses_listed_kinds() {
        let criteria = ConfigCriteria::parse(
            "bookinfo",
            "gateways,virtualservices,destinationrules,serviceentries",
            "app=reviews",
            "",
            false,
        );
        assert_eq!(criteria.namespace(), Some("bookinfo"));
        assert!(criteria.includes(ObjectKind::Gateway));
        assert!(criteria.includes(ObjectKind::VirtualService));
        assert!(criteria.includes(ObjectKind::DestinationRule));
        assert!(criteria.includes(ObjectKind::ServiceEntry));
        assert!(!criteria.includes(ObjectKind::Sidecar));
        assert!(!criteria.includes(ObjectKind::PeerAuthentication));
        assert_eq!(criteria.label_selector.as_deref(), Some("app=reviews"));
    }

    #[test]
    fn ignores_unknown_kinds() {
        let criteria = ConfigCriteria::parse("bookinfo", "rules-bad,notakind", "", "", false);
        assert!(criteria.kinds.is_empty());
        for kind in ObjectKind::ALL {
            assert!(!criteria.includes(kind));
        }

        let criteria = ConfigCriteria::parse("bookinfo", " sidecars , bogus", "", "", false);
        assert_eq!(criteria.kinds, Some(ObjectKind::Sidecar).into_iter().collect());
    }

    #[test]
    fn all_namespaces_clears_namespace() {
        let criteria = ConfigCriteria::parse("bookinfo", "gateways", "", "app=gw", true);
        assert_eq!(criteria.namespace, "");
        assert!(criteria.all_namespaces);
        assert_eq!(criteria.workload_selector.as_deref(), Some("app=gw"));
    }
}
