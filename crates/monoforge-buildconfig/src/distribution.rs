use std::{collections::HashMap, fmt};

use serde::Serialize;

/// The deployable shape a package builds into. Closed set; adding a new
/// target means teaching the flag algebra in the resolver about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Web,
    Desktop,
    Mobile,
    Ios,
    Android,
    Admin,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Web => "web",
            Distribution::Desktop => "desktop",
            Distribution::Mobile => "mobile",
            Distribution::Ios => "ios",
            Distribution::Android => "android",
            Distribution::Admin => "admin",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static lookup from package identity to its distribution target, plus
/// an alias table so a front end can accept `admin` in place of the
/// fully qualified package name.
///
/// Immutable once constructed; build it once at process start and pass
/// it by reference so tests can substitute their own table.
#[derive(Debug, Clone)]
pub struct DistributionTable {
    targets: HashMap<String, Distribution>,
    aliases: HashMap<String, String>,
}

impl DistributionTable {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Distribution)>,
    {
        let mut targets = HashMap::new();
        let mut aliases = HashMap::new();
        for (name, distribution) in entries {
            // every package is addressable by its unqualified name
            if let Some((_, short)) = name.rsplit_once('/') {
                aliases.insert(short.to_string(), name.clone());
            }
            targets.insert(name, distribution);
        }
        Self { targets, aliases }
    }

    pub fn with_alias(mut self, alias: &str, package_name: &str) -> Self {
        self.aliases
            .insert(alias.to_string(), package_name.to_string());
        self
    }

    /// The product packages that ship a deployable artifact.
    pub fn builtin() -> Self {
        Self::new([
            ("@acme/web".to_string(), Distribution::Web),
            ("@acme/electron".to_string(), Distribution::Desktop),
            ("@acme/mobile".to_string(), Distribution::Mobile),
            ("@acme/ios".to_string(), Distribution::Ios),
            ("@acme/android".to_string(), Distribution::Android),
            ("@acme/admin".to_string(), Distribution::Admin),
        ])
        .with_alias("desktop", "@acme/electron")
    }

    pub fn distribution_of(&self, package_name: &str) -> Option<Distribution> {
        self.targets.get(package_name).copied()
    }

    /// Resolves a user-supplied name to a fully qualified package name:
    /// identity for registered names, alias lookup otherwise.
    pub fn resolve_alias<'a>(&'a self, input: &'a str) -> Option<&'a str> {
        if self.targets.contains_key(input) {
            return Some(input);
        }
        self.aliases.get(input).map(|name| name.as_str())
    }

    pub fn packages(&self) -> impl Iterator<Item = (&str, Distribution)> {
        self.targets.iter().map(|(name, d)| (name.as_str(), *d))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case("@acme/web", Some(Distribution::Web) ; "web")]
    #[test_case("@acme/electron", Some(Distribution::Desktop) ; "desktop shell")]
    #[test_case("@acme/mobile", Some(Distribution::Mobile) ; "mobile web")]
    #[test_case("@acme/ios", Some(Distribution::Ios) ; "ios")]
    #[test_case("@acme/android", Some(Distribution::Android) ; "android")]
    #[test_case("@acme/admin", Some(Distribution::Admin) ; "admin console")]
    #[test_case("@acme/unregistered", None ; "unregistered")]
    fn test_builtin_targets(name: &str, want: Option<Distribution>) {
        assert_eq!(DistributionTable::builtin().distribution_of(name), want);
    }

    #[test]
    fn test_alias_resolution() {
        let table = DistributionTable::builtin();
        assert_eq!(table.resolve_alias("admin"), Some("@acme/admin"));
        assert_eq!(table.resolve_alias("electron"), Some("@acme/electron"));
        assert_eq!(table.resolve_alias("desktop"), Some("@acme/electron"));
        // identity for fully qualified names
        assert_eq!(table.resolve_alias("@acme/web"), Some("@acme/web"));
        assert_eq!(table.resolve_alias("nope"), None);
    }

    #[test]
    fn test_substitute_table() {
        let table = DistributionTable::new([("tool".to_string(), Distribution::Web)]);
        assert_eq!(table.distribution_of("tool"), Some(Distribution::Web));
        assert_eq!(table.distribution_of("@acme/web"), None);
    }
}
