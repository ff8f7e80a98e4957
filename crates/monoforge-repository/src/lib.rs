#![deny(clippy::all)]

pub mod discovery;
pub mod graph;
pub mod package_graph;
pub mod package_json;
