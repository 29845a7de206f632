//! Package import graph built with petgraph
//!
//! - **Directed Graph**: `A → B` means "package A imports package B"
//! - **Nodes**: every loaded package (import paths outside the loaded universe
//!   are dropped, they can never be marked changed)
//! - **Query**: reverse reachability, i.e. every package that imports one of
//!   the seeds directly or transitively

use crate::golang::Package;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct ImportGraph {
  graph: DiGraph<String, ()>,
  path_to_node: HashMap<String, NodeIndex>,
}

impl ImportGraph {
  /// Build the graph from a package listing. Duplicate import paths collapse
  /// into one node.
  pub fn from_packages(packages: &[Package]) -> Self {
    let mut graph = DiGraph::new();
    let mut path_to_node = HashMap::with_capacity(packages.len());

    for package in packages {
      path_to_node
        .entry(package.import_path.clone())
        .or_insert_with(|| graph.add_node(package.import_path.clone()));
    }

    for package in packages {
      let from = path_to_node[&package.import_path];
      for import in &package.imports {
        if let Some(&to) = path_to_node.get(import)
          && from != to
          && graph.find_edge(from, to).is_none()
        {
          graph.add_edge(from, to, ());
        }
      }
    }

    Self { graph, path_to_node }
  }

  /// Packages that import any of `seeds`, directly or transitively.
  ///
  /// Breadth-first over incoming edges; the seeds themselves are not included
  /// unless one of them imports another.
  pub fn transitive_importers<'s>(&self, seeds: impl IntoIterator<Item = &'s str>) -> HashSet<String> {
    let mut visited = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = seeds
      .into_iter()
      .filter_map(|seed| self.path_to_node.get(seed).copied())
      .collect();
    let mut importers = HashSet::new();

    while let Some(node) = queue.pop_front() {
      if !visited.insert(node) {
        continue;
      }
      for importer in self.graph.neighbors_directed(node, Direction::Incoming) {
        importers.insert(self.graph[importer].clone());
        queue.push_back(importer);
      }
    }

    importers
  }
}
