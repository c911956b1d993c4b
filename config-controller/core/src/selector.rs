//! Label-selector filtering over heterogeneous object collections.

use crate::{
    k8s::{labels::Map, Selector},
    ConfigObject,
};

/// An object exposing owner labels.
pub trait Labeled {
    fn labels(&self) -> &Map;
}

/// An object that applies to the workloads its selector matches.
pub trait SelectsWorkloads {
    /// Returns `None` when the object applies namespace-wide.
    fn workload_selector(&self) -> Option<Selector>;
}

/// Returns the objects whose owner labels satisfy `selector`.
///
/// An empty selector matches everything. A malformed selector matches nothing.
pub fn filter_by_selector<T: Labeled>(
    selector: &str,
    objects: impl IntoIterator<Item = T>,
) -> Vec<T> {
    let selector = match parse(selector) {
        Some(s) => s,
        None => return Vec::new(),
    };
    objects
        .into_iter()
        .filter(|o| selector.matches_map(o.labels()))
        .collect()
}

/// Returns the objects whose own workload selector matches `workload_labels`.
///
/// Objects without a selector are namespace-wide and are not returned.
pub fn filter_by_workload<T: SelectsWorkloads>(
    workload_labels: &Map,
    objects: impl IntoIterator<Item = T>,
) -> Vec<T> {
    objects
        .into_iter()
        .filter(|o| match o.workload_selector() {
            Some(selector) => selector.matches_map(workload_labels),
            None => false,
        })
        .collect()
}

/// Like [`filter_by_workload`], with the workload labels given as a selector expression.
pub fn filter_by_workload_selector<T: SelectsWorkloads>(
    workload_selector: &str,
    objects: impl IntoIterator<Item = T>,
) -> Vec<T> {
    let labels = match parse(workload_selector).and_then(|s| s.match_labels().cloned()) {
        Some(labels) => labels,
        None => return Vec::new(),
    };
    filter_by_workload(&labels, objects)
}

fn parse(selector: &str) -> Option<Selector> {
    match selector.parse::<Selector>() {
        Ok(selector) => Some(selector),
        Err(error) => {
            tracing::debug!(%error, selector, "Ignoring malformed selector");
            None
        }
    }
}

impl<T: Labeled + ?Sized> Labeled for &T {
    fn labels(&self) -> &Map {
        (**self).labels()
    }
}

impl<T: SelectsWorkloads + ?Sized> SelectsWorkloads for &T {
    fn workload_selector(&self) -> Option<Selector> {
        (**self).workload_selector()
    }
}

impl Labeled for ConfigObject {
    fn labels(&self) -> &Map {
        &self.labels
    }
}

impl SelectsWorkloads for ConfigObject {
    fn workload_selector(&self) -> Option<Selector> {
        ConfigObject::workload_selector(self)
    }
}
