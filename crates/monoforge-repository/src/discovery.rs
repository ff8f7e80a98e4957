//! Strategies for discovering the members of a workspace.
//!
//! The actual enumeration is delegated to the host package manager's
//! workspace-listing command; this module only deals with its captured
//! output. Each strategy implements [`PackageDiscovery`] so callers can
//! swap in a canned list for tests or wrap a strategy in a cache.

use miette::Diagnostic;
use once_cell::sync::OnceCell;
use serde::Deserialize;

/// One line of the workspace listing: a package's name, its
/// workspace-relative location, and the locations of the workspace
/// packages it declares a dependency on, in declaration order.
///
/// Duplicate and self-referential entries are passed through untouched;
/// the graph builder is responsible for making sense of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub workspace_dependencies: Vec<String>,
}

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("unable to parse workspace listing: {0}")]
    Listing(#[from] serde_json::Error),
}

/// Parses the newline-delimited JSON output of the workspace-listing
/// command. Blank lines and any stray non-JSON output (progress bars,
/// warnings) are stripped before parsing.
pub fn parse_workspace_listing(raw: &str) -> Result<Vec<PackageMetadata>, Error> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).map_err(Error::Listing))
        .collect()
}

/// Defines a strategy for discovering packages in the workspace.
pub trait PackageDiscovery {
    fn discover_packages(&self) -> Result<Vec<PackageMetadata>, Error>;
}

/// Discovery over the captured stdout of the workspace-listing command.
pub struct ListingDiscovery {
    raw: String,
}

impl ListingDiscovery {
    pub fn new(raw: String) -> Self {
        Self { raw }
    }
}

impl PackageDiscovery for ListingDiscovery {
    fn discover_packages(&self) -> Result<Vec<PackageMetadata>, Error> {
        tracing::debug!("discovering packages from workspace listing");
        parse_workspace_listing(&self.raw)
    }
}

/// Discovery over an already-parsed metadata list.
pub struct StaticDiscovery(Vec<PackageMetadata>);

impl StaticDiscovery {
    pub fn new(metadata: Vec<PackageMetadata>) -> Self {
        Self(metadata)
    }
}

impl PackageDiscovery for StaticDiscovery {
    fn discover_packages(&self) -> Result<Vec<PackageMetadata>, Error> {
        Ok(self.0.clone())
    }
}

/// Memoizes the first successful response of the wrapped strategy to
/// prevent unnecessary work when discovery is consulted more than once
/// during a build.
pub struct CachingPackageDiscovery<P: PackageDiscovery> {
    primary: P,
    data: OnceCell<Vec<PackageMetadata>>,
}

impl<P: PackageDiscovery> CachingPackageDiscovery<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            data: OnceCell::new(),
        }
    }
}

impl<P: PackageDiscovery> PackageDiscovery for CachingPackageDiscovery<P> {
    fn discover_packages(&self) -> Result<Vec<PackageMetadata>, Error> {
        self.data
            .get_or_try_init(|| {
                tracing::debug!("discovering packages using primary strategy");
                self.primary.discover_packages()
            })
            .map(ToOwned::to_owned)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_listing_tolerates_noise() {
        let raw = concat!(
            "\n",
            "warning: workspaces are experimental\n",
            r#"{"name": "a", "location": "packages/a", "workspaceDependencies": ["packages/b"]}"#,
            "\n",
            "   \n",
            r#"{"name": "b", "location": "packages/b"}"#,
            "\n",
        );
        let metadata = parse_workspace_listing(raw).unwrap();
        assert_eq!(
            metadata,
            vec![
                PackageMetadata {
                    name: "a".into(),
                    location: "packages/a".into(),
                    workspace_dependencies: vec!["packages/b".into()],
                },
                PackageMetadata {
                    name: "b".into(),
                    location: "packages/b".into(),
                    workspace_dependencies: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_listing_rejects_malformed_object() {
        let raw = r#"{"name": 42}"#;
        assert!(matches!(
            parse_workspace_listing(raw),
            Err(Error::Listing(_))
        ));
    }

    #[test]
    fn test_listing_empty_input() {
        assert_eq!(parse_workspace_listing("").unwrap(), vec![]);
    }

    mod caching {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use pretty_assertions::assert_eq;

        use super::*;

        struct CountingDiscovery {
            call_count: AtomicUsize,
        }

        impl PackageDiscovery for CountingDiscovery {
            fn discover_packages(&self) -> Result<Vec<PackageMetadata>, Error> {
                self.call_count.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            }
        }

        #[test]
        fn test_caching_package_discovery() {
            let primary = CountingDiscovery {
                call_count: Default::default(),
            };
            let mut discovery = CachingPackageDiscovery::new(primary);

            let _first = discovery.discover_packages().unwrap();
            assert_eq!(*discovery.primary.call_count.get_mut(), 1);

            // Second call should use cached data and not increase call count
            let _second = discovery.discover_packages().unwrap();
            assert_eq!(*discovery.primary.call_count.get_mut(), 1);
        }
    }
}
