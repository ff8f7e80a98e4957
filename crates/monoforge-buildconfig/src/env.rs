use std::collections::HashMap;

use monoforge_ci::Vendor;

/// Immutable snapshot of the process environment taken when a build
/// configuration request starts. Resolution never reads the live
/// environment, so a request is a pure function of its snapshot.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
    is_ci: bool,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        if let Some(vendor) = Vendor::infer() {
            tracing::debug!("detected CI vendor: {} ({})", vendor.name(), vendor.constant);
        }
        Self {
            vars: std::env::vars().collect(),
            is_ci: monoforge_ci::is_ci(),
        }
    }

    /// Builds a snapshot from explicit pairs; test seam.
    pub fn from_pairs<I, K, V>(pairs: I, is_ci: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            is_ci,
        }
    }

    pub fn is_ci(&self) -> bool {
        self.is_ci
    }

    /// A variable set to the empty string counts as unset.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn var_or_default(&self, name: &str) -> String {
        self.var(name).unwrap_or_default().to_string()
    }

    pub fn truthy(&self, name: &str) -> bool {
        matches!(self.var(name), Some("1") | Some("true"))
    }
}
