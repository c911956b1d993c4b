use crate::ValidationKey;
use ahash::AHashMap as HashMap;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding against an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Check {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    /// A JSON path into the object, e.g. `spec/http[0]/route[1]/destination/host`.
    pub path: String,
}

/// The verdict for one object. An object with zero error checks is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IstioValidation {
    pub valid: bool,
    pub checks: Vec<Check>,
}

/// Validations keyed by object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationMap(HashMap<ValidationKey, IstioValidation>);

// === impl Check ===

impl Check {
    pub fn error(code: &'static str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn warning(
        code: &'static str,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.path, self.message)
    }
}

// === impl IstioValidation ===

impl Default for IstioValidation {
    fn default() -> Self {
        Self {
            valid: true,
            checks: Vec::new(),
        }
    }
}

impl IstioValidation {
    pub fn push(&mut self, check: Check) {
        if check.severity == Severity::Error {
            self.valid = false;
        }
        if !self.checks.contains(&check) {
            self.checks.push(check);
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.checks.iter().any(|c| c.code == code)
    }
}

// === impl ValidationMap ===

impl ValidationMap {
    /// Appends a finding to the object's verdict.
    pub fn insert_check(&mut self, key: ValidationKey, check: Check) {
        self.0.entry(key).or_default().push(check);
    }

    /// Records that `key` was evaluated, leaving any findings in place.
    pub fn ensure(&mut self, key: ValidationKey) {
        self.0.entry(key).or_default();
    }

    pub fn merge(&mut self, other: ValidationMap) {
        for (key, validation) in other.0 {
            let entry = self.0.entry(key).or_default();
            for check in validation.checks {
                entry.push(check);
            }
        }
    }

    pub fn get(&self, key: &ValidationKey) -> Option<&IstioValidation> {
        self.0.get(key)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&ValidationKey) -> bool) {
        self.0.retain(|k, _| f(k));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValidationKey, &IstioValidation)> {
        self.0.iter()
    }
}

impl Serialize for ValidationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries = self.0.iter().collect::<Vec<_>>();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, v) in entries {
            map.serialize_entry(&k.to_string(), v)?;
        }
        map.end()
    }
}
