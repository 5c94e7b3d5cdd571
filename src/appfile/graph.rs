//! Compiled application dependency graph.
//!
//! Vertices are applications; an edge points from a dependent to each of
//! its dependencies. Construction rejects unknown dependencies and cycles.
//! Ordering follows Kahn's algorithm with alphabetical tie-breaking so that
//! a single-threaded walk is deterministic.

use super::File;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{mpsc, Arc};

/// A graph vertex wrapping one compiled application.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub file: Arc<File>,
}

impl Vertex {
    /// Vertex identity (the appfile ID).
    pub fn id(&self) -> &str {
        &self.file.id
    }

    /// Human-readable vertex name.
    pub fn name(&self) -> &str {
        &self.file.application.name
    }
}

/// Directed acyclic graph of compiled applications.
#[derive(Debug, Clone)]
pub struct Graph {
    vertices: IndexMap<String, Vertex>,
    root: String,
    down: HashMap<String, Vec<String>>,
    up: HashMap<String, Vec<String>>,
}

impl Graph {
    /// Build a graph from compiled files. `root` names the application the
    /// user operates on.
    pub fn new(files: Vec<File>, root: &str) -> Result<Self> {
        let mut vertices = IndexMap::new();
        for file in files {
            if vertices.contains_key(&file.id) {
                return Err(Error::graph(format!("duplicate vertex '{}'", file.id)));
            }
            vertices.insert(
                file.id.clone(),
                Vertex {
                    file: Arc::new(file),
                },
            );
        }

        if !vertices.contains_key(root) {
            return Err(Error::graph(format!("root '{}' is not in the graph", root)));
        }

        let mut down: HashMap<String, Vec<String>> = HashMap::new();
        let mut up: HashMap<String, Vec<String>> = HashMap::new();
        for id in vertices.keys() {
            down.insert(id.clone(), Vec::new());
            up.insert(id.clone(), Vec::new());
        }

        for (id, vertex) in &vertices {
            for dep in &vertex.file.application.dependencies {
                if dep == id {
                    return Err(Error::graph(format!("'{}' depends on itself", id)));
                }
                if !vertices.contains_key(dep) {
                    return Err(Error::graph(format!(
                        "'{}' depends on unknown application '{}'",
                        id, dep
                    )));
                }
                if let Some(edges) = down.get_mut(id) {
                    edges.push(dep.clone());
                }
                if let Some(edges) = up.get_mut(dep) {
                    edges.push(id.clone());
                }
            }
        }

        let graph = Self {
            vertices,
            root: root.to_string(),
            down,
            up,
        };

        let order = graph.leaves_first();
        if order.len() != graph.vertices.len() {
            let ordered: HashSet<&str> = order.iter().map(|v| v.id()).collect();
            let mut cycle_members: Vec<&str> = graph
                .vertices
                .keys()
                .map(String::as_str)
                .filter(|id| !ordered.contains(id))
                .collect();
            cycle_members.sort();
            return Err(Error::graph(format!(
                "dependency cycle detected involving: {}",
                cycle_members.join(", ")
            )));
        }

        Ok(graph)
    }

    /// The root vertex.
    pub fn root(&self) -> &Vertex {
        &self.vertices[&self.root]
    }

    /// Look up a vertex by ID.
    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// All vertices in declaration order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Dependencies of a vertex.
    pub fn down_edges(&self, id: &str) -> &[String] {
        self.down.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dependents of a vertex.
    pub fn up_edges(&self, id: &str) -> &[String] {
        self.up.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Vertices with no dependencies, sorted by ID.
    pub fn leaves(&self) -> Vec<&Vertex> {
        let mut leaves: Vec<&Vertex> = self
            .vertices
            .values()
            .filter(|v| self.down_edges(v.id()).is_empty())
            .collect();
        leaves.sort_by(|a, b| a.id().cmp(b.id()));
        leaves
    }

    /// Order starting at the leaves in which every dependency precedes all
    /// of its dependents. Vertices on a cycle are omitted.
    pub fn leaves_first(&self) -> Vec<&Vertex> {
        let mut pending: HashMap<&str, usize> = self
            .vertices
            .keys()
            .map(|id| (id.as_str(), self.down_edges(id).len()))
            .collect();

        let mut ready: BTreeSet<&str> = self.leaves().into_iter().map(Vertex::id).collect();

        let mut order = Vec::with_capacity(self.vertices.len());
        while let Some(current) = ready.pop_first() {
            order.push(&self.vertices[current]);
            for dependent in self.up_edges(current) {
                if let Some(degree) = pending.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        order
    }

    /// Visit every vertex, dependencies before dependents.
    ///
    /// Up to `parallelism` visits run at once. A vertex whose dependency
    /// failed (or was itself skipped) is not visited. Independent branches
    /// keep running; the first error observed is returned once every
    /// dispatched visit has finished.
    pub fn walk<F>(&self, parallelism: usize, f: F) -> Result<()>
    where
        F: Fn(&Vertex) -> Result<()> + Sync,
    {
        let parallelism = parallelism.max(1);
        let mut pending: HashMap<&str, usize> = self
            .vertices
            .keys()
            .map(|id| (id.as_str(), self.down_edges(id).len()))
            .collect();
        let mut ready: BTreeSet<&str> = pending
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut failed: HashSet<&str> = HashSet::new();
        let mut first_error: Option<Error> = None;

        let f = &f;
        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(&str, Result<()>)>();
            let mut in_flight = 0usize;

            loop {
                while in_flight < parallelism {
                    let Some(id) = ready.pop_first() else {
                        break;
                    };

                    let upstream_failed = self
                        .down_edges(id)
                        .iter()
                        .any(|dep| failed.contains(dep.as_str()));
                    if upstream_failed {
                        failed.insert(id);
                        release(self, id, &mut pending, &mut ready);
                        continue;
                    }

                    let vertex = &self.vertices[id];
                    let tx = tx.clone();
                    scope.spawn(move || {
                        let result = f(vertex);
                        let _ = tx.send((id, result));
                    });
                    in_flight += 1;
                }

                if in_flight == 0 {
                    break;
                }

                let Ok((id, result)) = rx.recv() else {
                    break;
                };
                in_flight -= 1;

                if let Err(e) = result {
                    failed.insert(id);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                release(self, id, &mut pending, &mut ready);
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Mark `id` complete and queue dependents whose dependencies are all done.
fn release<'g>(
    graph: &'g Graph,
    id: &str,
    pending: &mut HashMap<&'g str, usize>,
    ready: &mut BTreeSet<&'g str>,
) {
    for dependent in graph.up_edges(id) {
        if let Some(degree) = pending.get_mut(dependent.as_str()) {
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent.as_str());
            }
        }
    }
}
