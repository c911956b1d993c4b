//! Mesh configuration validation.
//!
//! Each [`Checker`] inspects the whole [`Index`] and reports findings against the objects it
//! finds fault with. Checkers are independent of each other, so a [`Validator`] may run them in
//! any order (or concurrently) and accumulate their findings into a single [`ValidationMap`].
//! Findings never fail a request: an object that cannot be fully evaluated is reported with a
//! warning instead.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod authorization_policy;
pub mod destination_rule;
pub mod gateway;
pub mod mtls;
pub mod request_authentication;
pub mod sidecar;
pub mod virtual_service;
pub mod workload_selector;

#[cfg(test)]
mod tests;

use mesh_config_core::{Check, ConfigObject, ObjectKey, ObjectKind, ValidationKey, ValidationMap};
use mesh_config_k8s_index::Index;
use std::sync::Arc;

pub type Finding = (ValidationKey, Check);

/// A single validation rule evaluated over the indexed configuration.
pub trait Checker: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, index: &Index) -> Vec<Finding>;
}

/// The objects whose validations are requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Mesh,
    Namespace(String),
    Object(ObjectKey),
    /// Every object of a kind in a namespace.
    Kind { namespace: String, kind: ObjectKind },
}

/// Runs a set of checkers.
#[derive(Clone)]
pub struct Validator {
    checkers: Vec<Arc<dyn Checker>>,
}

// === impl Scope ===

impl Scope {
    pub fn contains(&self, key: &ObjectKey) -> bool {
        match self {
            Self::Mesh => true,
            Self::Namespace(ns) => key.namespace == *ns,
            Self::Object(k) => k == key,
            Self::Kind { namespace, kind } => key.namespace == *namespace && key.kind == *kind,
        }
    }
}

// === impl Validator ===

impl Default for Validator {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(gateway::MultiMatchChecker),
            Arc::new(gateway::SelectorChecker),
            Arc::new(virtual_service::VirtualServiceChecker),
            Arc::new(destination_rule::MultiMatchChecker),
            Arc::new(destination_rule::DestinationRuleChecker),
            Arc::new(mtls::MtlsChecker),
            Arc::new(mtls::PeerAuthenticationChecker),
            Arc::new(workload_selector::NoWorkloadChecker),
            Arc::new(authorization_policy::AuthorizationPolicyChecker),
            Arc::new(sidecar::EgressHostChecker),
            Arc::new(sidecar::DefaultSidecarChecker),
            Arc::new(request_authentication::JwtRuleChecker),
        ])
    }
}

impl Validator {
    pub fn new(checkers: Vec<Arc<dyn Checker>>) -> Self {
        Self { checkers }
    }

    pub fn checkers(&self) -> &[Arc<dyn Checker>] {
        &self.checkers
    }

    /// Runs every checker over the full index and returns the verdicts of objects in `scope`.
    pub fn validate(&self, index: &Index, scope: &Scope) -> ValidationMap {
        let mut validations = ValidationMap::default();
        for checker in &self.checkers {
            let findings = checker.check(index);
            tracing::trace!(checker = checker.name(), findings = findings.len());
            accumulate(&mut validations, findings);
        }
        finish(index, scope, validations)
    }
}

/// Appends findings to their objects' verdicts.
pub fn accumulate(validations: &mut ValidationMap, findings: Vec<Finding>) {
    for (key, check) in findings {
        validations.insert_check(key, check);
    }
}

/// Ensures every indexed object in `scope` has a verdict and drops the rest.
pub fn finish(index: &Index, scope: &Scope, mut validations: ValidationMap) -> ValidationMap {
    for obj in index.objects() {
        let key = obj.key();
        if scope.contains(&key) {
            validations.ensure(key);
        }
    }
    validations.retain(|key| scope.contains(key));
    validations
}

/// Selector-less objects of `kind` that share their namespace with another selector-less
/// object of the same kind.
pub(crate) fn namespace_wide_duplicates(index: &Index, kind: ObjectKind) -> Vec<&ConfigObject> {
    let namespace_wide = index
        .of_kind(kind)
        .filter(|o| o.workload_selector().is_none())
        .collect::<Vec<_>>();
    namespace_wide
        .iter()
        .filter(|o| {
            namespace_wide
                .iter()
                .filter(|other| other.namespace == o.namespace)
                .count()
                > 1
        })
        .copied()
        .collect()
}
