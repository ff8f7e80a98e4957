use std::collections::BTreeMap;

use camino::Utf8Path;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<BTreeMap<String, ExportEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,
    // Unstructured fields kept for round trip capabilities
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// A single `exports` map entry: either a bare path or a map of
/// conditions to paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    Path(String),
    Conditions(BTreeMap<String, String>),
}

impl ExportEntry {
    fn resolve(&self) -> Option<&str> {
        match self {
            ExportEntry::Path(path) => Some(path),
            ExportEntry::Conditions(conditions) => conditions
                .get("default")
                .or_else(|| conditions.get("import"))
                .or_else(|| conditions.get("require"))
                .map(|s| s.as_str()),
        }
    }
}

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("unable to read package.json: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse package.json: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackageJson {
    pub fn load(path: &Utf8Path) -> Result<PackageJson, Error> {
        tracing::trace!("loading package.json from {}", path);
        let contents = std::fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<PackageJson, Error> {
        Ok(serde_json::from_str(contents)?)
    }

    // Utility method for easy construction of package.json during testing
    pub fn from_value(value: serde_json::Value) -> Result<PackageJson, Error> {
        Ok(serde_json::from_value(value)?)
    }

    /// The resolved entry point: `main`, falling back to the root `exports`
    /// mapping.
    pub fn entry(&self) -> Option<&str> {
        self.main
            .as_deref()
            .or_else(|| self.exports.as_ref()?.get(".")?.resolve())
    }

    pub fn all_dependencies(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.dev_dependencies
            .iter()
            .flatten()
            .chain(self.dependencies.iter().flatten())
    }

    /// Returns the command for script_name if it is non-empty
    pub fn command(&self, script_name: &str) -> Option<&str> {
        self.scripts
            .get(script_name)
            .filter(|command| !command.is_empty())
            .map(|command| command.as_str())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(json!({"name": "foo", "random-field": true}) ; "additional fields kept during round trip")]
    #[test_case(json!({"version": "1.2", "foo": "bar"}) ; "version")]
    #[test_case(json!({"name": "foo", "private": true}) ; "private flag")]
    #[test_case(json!({"dependencies": {"lodash": "^4.17.0"}, "foo": "bar"}) ; "dependencies")]
    #[test_case(json!({"devDependencies": {"vitest": "^1.0.0"}, "foo": "bar"}) ; "dev dependencies")]
    #[test_case(json!({"scripts": {"build": "vite build"}, "foo": "bar"}) ; "scripts")]
    #[test_case(json!({"main": "./src/index.ts"}) ; "main")]
    #[test_case(json!({"exports": {".": "./src/index.ts"}}) ; "string exports")]
    #[test_case(json!({"exports": {".": {"default": "./dist/index.js", "import": "./dist/index.mjs"}}}) ; "conditional exports")]
    fn test_roundtrip(json: serde_json::Value) {
        let package_json = PackageJson::from_value(json.clone()).unwrap();
        let actual = serde_json::to_value(package_json).unwrap();
        assert_eq!(actual, json);
    }

    #[test]
    fn test_entry_prefers_main() {
        let json = PackageJson::from_value(json!({
            "main": "./src/main.ts",
            "exports": {".": "./src/index.ts"},
        }))
        .unwrap();
        assert_eq!(json.entry(), Some("./src/main.ts"));
    }

    #[test]
    fn test_entry_from_exports() {
        let json = PackageJson::from_value(json!({
            "exports": {".": {"import": "./dist/index.mjs"}},
        }))
        .unwrap();
        assert_eq!(json.entry(), Some("./dist/index.mjs"));
    }

    #[test]
    fn test_entry_missing() {
        let json = PackageJson::from_value(json!({"name": "foo"})).unwrap();
        assert_eq!(json.entry(), None);
    }

    #[test]
    fn test_private_defaults_to_false() {
        let json = PackageJson::from_value(json!({"name": "foo"})).unwrap();
        assert!(!json.private);
    }

    #[test]
    fn test_empty_command_filtered() {
        let json = PackageJson::from_value(json!({"scripts": {"build": ""}})).unwrap();
        assert_eq!(json.command("build"), None);
    }

    #[test]
    fn test_load_from_str() {
        let json = PackageJson::load_from_str(r#"{"name": "foo", "private": true}"#).unwrap();
        assert_eq!(json.name.as_deref(), Some("foo"));
        assert!(json.private);
        assert!(matches!(
            PackageJson::load_from_str("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name": "foo", "version": "0.3.0"}"#).unwrap();
        let path = camino::Utf8PathBuf::try_from(path).unwrap();
        let json = PackageJson::load(&path).unwrap();
        assert_eq!(json.name.as_deref(), Some("foo"));
        assert_eq!(json.version.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::try_from(dir.path().join("package.json")).unwrap();
        assert!(matches!(PackageJson::load(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "{ not json").unwrap();
        let path = camino::Utf8PathBuf::try_from(path).unwrap();
        assert!(matches!(PackageJson::load(&path), Err(Error::Json(_))));
    }
}
