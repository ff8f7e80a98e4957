use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use tracing::warn;

use super::{Package, PackageIdx, PackageNode, Workspace};
use crate::{
    discovery::{self, CachingPackageDiscovery, PackageDiscovery, PackageMetadata},
    graph,
    package_json::{self, PackageJson},
};

pub struct WorkspaceBuilder<'a, D> {
    repo_root: &'a Utf8Path,
    discovery: D,
    manifests: Option<HashMap<String, PackageJson>>,
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("no package named \"{name}\" in the workspace")]
    PackageNotFound { name: String },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Discovery(#[from] discovery::Error),
    #[error("unable to load manifest for \"{location}\": {source}")]
    Manifest {
        location: String,
        #[source]
        source: package_json::Error,
    },
    #[error(
        "Failed to add package \"{name}\" from \"{location}\", it already exists at \
         \"{existing_location}\""
    )]
    DuplicateName {
        name: String,
        location: String,
        existing_location: String,
    },
    #[error("two workspace listing entries share the location \"{location}\"")]
    DuplicateLocation { location: String },
    #[error("cyclic dependency detected, starting at \"{start}\":\n\t{trace}")]
    CircularDependency { start: String, trace: String },
    #[error("public package \"{from}\" must not depend on private package \"{to}\"")]
    ForbiddenPrivateReference { from: String, to: String },
    #[error("Invalid package dependency graph: {0}")]
    InvalidPackageGraph(#[source] graph::Error),
}

impl<'a, D: PackageDiscovery> WorkspaceBuilder<'a, D> {
    pub fn new(repo_root: &'a Utf8Path, discovery: D) -> Self {
        Self {
            repo_root,
            discovery,
            manifests: None,
        }
    }

    /// Supply pre-parsed manifests keyed by location instead of reading
    /// them from disk. Locations absent from the map fall back to a disk
    /// read.
    pub fn with_manifests(mut self, manifests: Option<HashMap<String, PackageJson>>) -> Self {
        self.manifests = manifests;
        self
    }

    /// Swap the discovery strategy. Whatever strategy is selected is
    /// wrapped in a `CachingPackageDiscovery` at build time to prevent
    /// unnecessary work.
    pub fn with_discovery<D2: PackageDiscovery>(self, discovery: D2) -> WorkspaceBuilder<'a, D2> {
        WorkspaceBuilder {
            repo_root: self.repo_root,
            discovery,
            manifests: self.manifests,
        }
    }

    /// Build the [`Workspace`]: instantiate one [`Package`] per listing
    /// entry, then link every package to its declared workspace
    /// dependencies.
    #[tracing::instrument(skip(self))]
    pub fn build(self) -> Result<Workspace, Error> {
        let WorkspaceBuilder {
            repo_root,
            discovery,
            manifests,
        } = self;
        let discovery = CachingPackageDiscovery::new(discovery);
        let metadata = discovery.discover_packages()?;

        let mut state = ResolveState::default();
        let mut root_manifest = None;
        for entry in metadata {
            let manifest = load_manifest(repo_root, &entry.location, manifests.as_ref())?;
            if entry.location == "." {
                root_manifest = Some(manifest);
                continue;
            }
            state.add_package(repo_root, entry, manifest)?;
        }

        for idx in 0..state.packages.len() {
            state.resolve(PackageIdx(idx))?;
        }

        let root_manifest = root_manifest.unwrap_or_default();
        let workspace = Workspace {
            name: root_manifest.name,
            version: root_manifest.version,
            root_dependencies: root_manifest.dependencies.unwrap_or_default(),
            graph: petgraph::Graph::new(),
            node_lookup: HashMap::new(),
            packages: state.packages,
            by_name: state.by_name,
            by_location: state.by_location,
        };
        let workspace = mirror_graph(workspace);
        workspace.validate()?;
        Ok(workspace)
    }
}

fn load_manifest(
    repo_root: &Utf8Path,
    location: &str,
    manifests: Option<&HashMap<String, PackageJson>>,
) -> Result<PackageJson, Error> {
    if let Some(manifest) = manifests.and_then(|m| m.get(location)) {
        return Ok(manifest.clone());
    }
    let path = repo_root.join(location).join("package.json");
    PackageJson::load(&path).map_err(|source| Error::Manifest {
        location: location.to_string(),
        source,
    })
}

/// Per-package progress marker for the depth-first resolution. An
/// explicit tri-state rather than "resolved list is non-empty" so that
/// leaf packages are guarded too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Default)]
struct ResolveState {
    packages: Vec<Package>,
    by_name: HashMap<String, PackageIdx>,
    by_location: HashMap<Utf8PathBuf, PackageIdx>,
    marks: Vec<Mark>,
    in_flight: Vec<String>,
}

impl ResolveState {
    fn add_package(
        &mut self,
        repo_root: &Utf8Path,
        entry: PackageMetadata,
        manifest: PackageJson,
    ) -> Result<(), Error> {
        let PackageMetadata {
            name,
            location,
            workspace_dependencies,
        } = entry;
        let idx = PackageIdx(self.packages.len());
        if let Some(existing) = self.by_name.get(&name) {
            return Err(Error::DuplicateName {
                name,
                location,
                existing_location: self.packages[existing.0].location.to_string(),
            });
        }
        let package = Package::new(repo_root, name, location, workspace_dependencies, manifest);
        if self
            .by_location
            .insert(package.location.clone(), idx)
            .is_some()
        {
            return Err(Error::DuplicateLocation {
                location: package.location.to_string(),
            });
        }
        self.by_name.insert(package.name.clone(), idx);
        self.packages.push(package);
        self.marks.push(Mark::Unvisited);
        Ok(())
    }

    /// Post-order depth-first resolution of one package: every declared
    /// dependency is fully resolved before its index is appended, so
    /// `resolved_dependencies` preserves declaration order.
    fn resolve(&mut self, idx: PackageIdx) -> Result<(), Error> {
        if self.marks[idx.0] == Mark::Done {
            return Ok(());
        }
        self.marks[idx.0] = Mark::InProgress;
        self.in_flight.push(self.packages[idx.0].name.clone());

        let declared = self.packages[idx.0].workspace_dependencies.clone();
        for dep_location in &declared {
            let Some(&dep_idx) = self.by_location.get(Utf8Path::new(dep_location)) else {
                warn!(
                    "{} declares a dependency on {}, which is not part of the workspace; edge \
                     skipped",
                    self.packages[idx.0], dep_location
                );
                continue;
            };
            let dep_name = self.packages[dep_idx.0].name.clone();
            if self.marks[dep_idx.0] == Mark::InProgress {
                return Err(self.cycle_error(dep_name));
            }
            if !self.packages[idx.0].is_private && self.packages[dep_idx.0].is_private {
                return Err(Error::ForbiddenPrivateReference {
                    from: self.packages[idx.0].name.clone(),
                    to: dep_name,
                });
            }
            self.resolve(dep_idx)?;
            self.packages[idx.0].resolved_dependencies.push(dep_idx);
        }

        self.in_flight.pop();
        self.marks[idx.0] = Mark::Done;
        Ok(())
    }

    /// The reported trace is the in-flight stack sliced from the first
    /// occurrence of the offending name through the current package, with
    /// the offender repeated to close the loop.
    fn cycle_error(&self, start: String) -> Error {
        let position = self
            .in_flight
            .iter()
            .position(|name| *name == start)
            .unwrap_or(0);
        let mut trace = self.in_flight[position..].join(" -> ");
        trace.push_str(" -> ");
        trace.push_str(&start);
        Error::CircularDependency { start, trace }
    }
}

/// Mirrors the resolved edges into a petgraph graph for closure queries.
/// Leaf packages get an edge to the synthetic root node, matching the
/// shape downstream build ordering expects.
fn mirror_graph(mut workspace: Workspace) -> Workspace {
    let root_idx = workspace.graph.add_node(PackageNode::Root);
    workspace.node_lookup.insert(PackageNode::Root, root_idx);
    for package in &workspace.packages {
        let node = PackageNode::Package(package.name.clone());
        let idx = workspace.graph.add_node(node.clone());
        workspace.node_lookup.insert(node, idx);
    }
    let mut edges = Vec::new();
    for package in &workspace.packages {
        let from = workspace.node_lookup[&PackageNode::Package(package.name.clone())];
        if package.resolved_dependencies.is_empty() {
            edges.push((from, root_idx));
            continue;
        }
        for dep in &package.resolved_dependencies {
            let dep_name = &workspace.packages[dep.0].name;
            let to = workspace.node_lookup[&PackageNode::Package(dep_name.clone())];
            edges.push((from, to));
        }
    }
    for (from, to) in edges {
        workspace.graph.add_edge(from, to, ());
    }
    workspace
}
