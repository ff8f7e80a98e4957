use std::fmt::Display;

use itertools::Itertools;
use petgraph::{prelude::*, visit::depth_first_search, visit::Reversed};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cyclic dependency detected:\n{0}")]
    CyclicDependencies(String),
    #[error("{0} depends on itself")]
    SelfDependency(String),
}

pub fn transitive_closure<N, I: IntoIterator<Item = NodeIndex>>(
    graph: &Graph<N, ()>,
    indices: I,
    direction: petgraph::Direction,
) -> std::collections::HashSet<&N>
where
    N: std::hash::Hash + Eq,
{
    let mut visited = std::collections::HashSet::new();

    let visitor = |event| {
        if let petgraph::visit::DfsEvent::Discover(n, _) = event {
            visited.insert(
                graph
                    .node_weight(n)
                    .expect("node index found during dfs doesn't exist"),
            );
        }
    };

    match direction {
        petgraph::Direction::Outgoing => depth_first_search(&graph, indices, visitor),
        petgraph::Direction::Incoming => depth_first_search(Reversed(&graph), indices, visitor),
    };

    visited
}

pub fn validate_graph<G: Display>(graph: &Graph<G, ()>) -> Result<(), Error> {
    let cycles_lines = petgraph::algo::tarjan_scc(&graph)
        .into_iter()
        .filter(|cycle| cycle.len() > 1)
        .map(|cycle| {
            let packages = cycle.into_iter().map(|id| graph.node_weight(id).unwrap());
            format!("\t{}", packages.format(", "))
        })
        .join("\n");

    if !cycles_lines.is_empty() {
        return Err(Error::CyclicDependencies(cycles_lines));
    }

    for edge in graph.edge_references() {
        if edge.source() == edge.target() {
            let node = graph
                .node_weight(edge.source())
                .expect("edge pointed to missing node");
            return Err(Error::SelfDependency(node.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;
    use petgraph::graph::Graph;

    use super::*;

    #[test]
    fn test_cycle_err_message() {
        let mut g = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");

        g.add_edge(a, b, ());
        g.add_edge(b, c, ());
        g.add_edge(c, a, ());

        let result = validate_graph(&g);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_snapshot!(err.to_string(), @r###"
        cyclic dependency detected:
        	c, b, a
        "###);
    }

    #[test]
    fn test_self_dependency() {
        let mut g = Graph::new();
        let a = g.add_node("a");
        g.add_edge(a, a, ());

        let err = validate_graph(&g).unwrap_err();
        assert_eq!(err.to_string(), "a depends on itself");
    }
}
