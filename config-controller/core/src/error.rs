use crate::{kind::UnknownKind, ObjectKind, Verb};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: ObjectKind,
        namespace: String,
        name: String,
    },

    #[error("{verb} {kind} in namespace {namespace:?} is not permitted")]
    AccessDenied {
        verb: Verb,
        kind: ObjectKind,
        namespace: String,
    },

    #[error("cluster {cluster} is unavailable: {source}")]
    UpstreamUnavailable {
        cluster: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

// === impl Error ===

impl Error {
    pub fn not_found(
        kind: ObjectKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn upstream(cluster: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::UpstreamUnavailable {
            cluster: cluster.into(),
            source: source.into(),
        }
    }

    /// Both unsupported kinds and missing objects are reported to callers as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownKind(_))
    }
}
