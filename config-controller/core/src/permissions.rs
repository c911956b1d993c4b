use serde::{Deserialize, Serialize};
use std::fmt;

/// Write rights on a (cluster, namespace, kind).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourcePermissions {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

/// The RBAC verbs reviewed for configuration writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Patch,
    Delete,
}

/// The outcome of a self-access review for a single verb.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccessReview {
    pub verb: Verb,
    pub allowed: bool,
}

// === impl ResourcePermissions ===

impl ResourcePermissions {
    pub fn from_reviews(reviews: &[AccessReview]) -> Self {
        let allowed = |verb: Verb| reviews.iter().any(|r| r.verb == verb && r.allowed);
        Self {
            create: allowed(Verb::Create),
            update: allowed(Verb::Patch),
            delete: allowed(Verb::Delete),
        }
    }

    /// Strips update and delete rights, as applies to remote clusters.
    pub fn observe_only(self) -> Self {
        Self {
            update: false,
            delete: false,
            ..self
        }
    }
}

// === impl Verb ===

impl Verb {
    pub const ALL: [Verb; 3] = [Verb::Create, Verb::Patch, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
