use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use camino::{Utf8Path, Utf8PathBuf};
use petgraph::graph::NodeIndex;

use crate::{discovery::PackageDiscovery, graph, package_json::PackageJson};

pub mod builder;

pub use builder::{Error, WorkspaceBuilder};

/// Index of a package within its owning [`Workspace`]. Dependency edges
/// are stored as indices rather than references so the arena stays free
/// of self-referential ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdx(usize);

/// One workspace member: the facts from its manifest plus the paths the
/// build pipeline derives from its location.
///
/// `resolved_dependencies` is write-once and only ever assigned by the
/// [`WorkspaceBuilder`]; an empty list is the legitimate terminal state
/// for a leaf package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Package {
    name: String,
    version: String,
    location: Utf8PathBuf,
    src_path: Utf8PathBuf,
    lib_path: Utf8PathBuf,
    dist_path: Utf8PathBuf,
    dep_cache_path: Utf8PathBuf,
    is_private: bool,
    manifest: PackageJson,
    workspace_dependencies: Vec<String>,
    resolved_dependencies: Vec<PackageIdx>,
}

impl Package {
    pub(crate) fn new(
        repo_root: &Utf8Path,
        name: String,
        location: String,
        workspace_dependencies: Vec<String>,
        manifest: PackageJson,
    ) -> Self {
        let location = Utf8PathBuf::from(location);
        let package_root = repo_root.join(&location);
        Self {
            name,
            version: manifest.version.clone().unwrap_or_else(|| "0.0.0".into()),
            src_path: package_root.join("src"),
            lib_path: package_root.join("lib"),
            dist_path: package_root.join("dist"),
            dep_cache_path: package_root.join("node_modules"),
            is_private: manifest.private,
            location,
            manifest,
            workspace_dependencies,
            resolved_dependencies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Workspace-relative location of the package.
    pub fn location(&self) -> &Utf8Path {
        &self.location
    }

    pub fn src_path(&self) -> &Utf8Path {
        &self.src_path
    }

    pub fn lib_path(&self) -> &Utf8Path {
        &self.lib_path
    }

    pub fn dist_path(&self) -> &Utf8Path {
        &self.dist_path
    }

    pub fn dep_cache_path(&self) -> &Utf8Path {
        &self.dep_cache_path
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn manifest(&self) -> &PackageJson {
        &self.manifest
    }

    pub fn entry(&self) -> Option<&str> {
        self.manifest.entry()
    }

    pub fn scripts(&self) -> &BTreeMap<String, String> {
        &self.manifest.scripts
    }

    pub fn dependencies(&self) -> Option<&BTreeMap<String, String>> {
        self.manifest.dependencies.as_ref()
    }

    pub fn dev_dependencies(&self) -> Option<&BTreeMap<String, String>> {
        self.manifest.dev_dependencies.as_ref()
    }

    /// Declared workspace dependency locations, in declaration order.
    pub fn workspace_dependencies(&self) -> &[String] {
        &self.workspace_dependencies
    }

    /// Direct workspace dependencies, in declaration order. Resolve the
    /// indices through [`Workspace::package`].
    pub fn resolved_dependencies(&self) -> &[PackageIdx] {
        &self.resolved_dependencies
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Node in the workspace graph mirror. `Root` is the synthetic sink that
/// leaf packages point at.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum PackageNode {
    Root,
    Package(String),
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageNode::Root => f.write_str("___ROOT___"),
            PackageNode::Package(name) => f.write_str(name),
        }
    }
}

/// The full set of packages in one monorepo checkout plus the dependency
/// graph among them. Built once per tool invocation; immutable afterwards.
#[derive(Debug)]
pub struct Workspace {
    name: Option<String>,
    version: Option<String>,
    root_dependencies: BTreeMap<String, String>,
    packages: Vec<Package>,
    by_name: HashMap<String, PackageIdx>,
    by_location: HashMap<Utf8PathBuf, PackageIdx>,
    graph: petgraph::Graph<PackageNode, ()>,
    node_lookup: HashMap<PackageNode, NodeIndex>,
}

impl Workspace {
    pub fn builder<D: PackageDiscovery>(
        repo_root: &Utf8Path,
        discovery: D,
    ) -> WorkspaceBuilder<'_, D> {
        WorkspaceBuilder::new(repo_root, discovery)
    }

    /// Workspace name from the root manifest, if the listing carried a
    /// root entry.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn root_dependencies(&self) -> &BTreeMap<String, String> {
        &self.root_dependencies
    }

    /// Returns the number of packages in the workspace, the root entry
    /// excluded.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn package(&self, idx: PackageIdx) -> &Package {
        &self.packages[idx.0]
    }

    pub fn package_by_name(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|idx| self.package(*idx))
    }

    /// Required lookup by name; fails with [`Error::PackageNotFound`]
    /// when the package is needed for a build request.
    pub fn package_named(&self, name: &str) -> Result<&Package, Error> {
        self.package_by_name(name)
            .ok_or_else(|| Error::PackageNotFound {
                name: name.to_string(),
            })
    }

    pub fn package_by_location(&self, location: &Utf8Path) -> Option<&Package> {
        self.by_location.get(location).map(|idx| self.package(*idx))
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// Direct workspace dependencies of `package`, in declaration order.
    pub fn immediate_dependencies<'a>(
        &'a self,
        package: &Package,
    ) -> impl Iterator<Item = &'a Package> + 'a {
        package
            .resolved_dependencies
            .clone()
            .into_iter()
            .map(move |idx| self.package(idx))
    }

    /// The set of packages `name` transitively depends on, excluding
    /// `name` itself.
    pub fn dependencies(&self, name: &str) -> HashSet<&Package> {
        let mut closure = self.closure_of(name, petgraph::Direction::Outgoing);
        closure.remove(name);
        closure
            .into_iter()
            .filter_map(|name| self.package_by_name(name))
            .collect()
    }

    /// The set of packages that transitively depend on `name`, excluding
    /// `name` itself.
    pub fn ancestors(&self, name: &str) -> HashSet<&Package> {
        let mut closure = self.closure_of(name, petgraph::Direction::Incoming);
        closure.remove(name);
        closure
            .into_iter()
            .filter_map(|name| self.package_by_name(name))
            .collect()
    }

    fn closure_of(&self, name: &str, direction: petgraph::Direction) -> HashSet<&str> {
        let index = self
            .node_lookup
            .get(&PackageNode::Package(name.to_string()));
        graph::transitive_closure(&self.graph, index.copied(), direction)
            .into_iter()
            .filter_map(|node| match node {
                PackageNode::Package(name) => Some(name.as_str()),
                PackageNode::Root => None,
            })
            .collect()
    }

    /// Defense-in-depth re-validation of the mirrored graph. The builder
    /// already rejects cycles and self-edges during resolution.
    pub fn validate(&self) -> Result<(), Error> {
        graph::validate_graph(&self.graph).map_err(Error::InvalidPackageGraph)
    }
}
