use std::collections::{HashMap, HashSet};

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural violations of the per-net tree assumption.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StructuralError {
    #[error("net '{net}': parasitic network reachable from '{driver}' is not a tree ({edges} edges over {nodes} nodes)")]
    Cycle {
        net: String,
        driver: String,
        nodes: usize,
        edges: usize,
    },
}

/// Which RC-tree realization the analysis should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeVariant {
    /// Hash-map adjacency lists, good for sparse variable-size nets.
    Adjacency,
    /// Dense resistance matrix plus capacitance vector.
    Matrix,
}

/// Neutral per-net record extracted from one `*D_NET ... *END` block.
///
/// Capacitance and resistance writes are kept in file order so that the
/// last-write-wins rule survives tree construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetRecord {
    /// Net identifier as it appears in the file, `*` stripped.
    pub raw_id: String,
    /// Display name resolved through the name map (raw id if unmapped).
    pub name: String,
    /// Driver pin (direction `O`), at most one per net.
    pub driver: Option<String>,
    /// Load pins (direction `I`).
    pub loads: Vec<String>,
    /// `(node, capacitance)` writes in file order.
    pub caps: Vec<(String, f64)>,
    /// `(node_a, node_b, resistance)` edges in file order.
    pub edges: Vec<(String, String, f64)>,
    /// Raw pin id -> `<resolved>/<port>` display name.
    pub pin_names: HashMap<String, String>,
}

impl NetRecord {
    /// Display name for a pin, falling back to the raw identifier.
    pub fn display_name<'a>(&'a self, node: &'a str) -> &'a str {
        self.pin_names.get(node).map(|s| s.as_str()).unwrap_or(node)
    }
}

/// Adjacency-list RC tree.
///
/// Resistance and capacitance values are scaled by the configured unit
/// factors at insertion, so callers work in the file's natural units.
#[derive(Debug, Clone)]
pub struct RCTree {
    pub name: String,
    graph: HashMap<String, Vec<String>>,
    resistance: HashMap<(String, String), f64>,
    node_self_cap: HashMap<String, f64>,
    r_unit: f64,
    c_unit: f64,
}

impl RCTree {
    pub fn new(r_unit: f64, c_unit: f64) -> Self {
        RCTree {
            name: String::new(),
            graph: HashMap::new(),
            resistance: HashMap::new(),
            node_self_cap: HashMap::new(),
            r_unit,
            c_unit,
        }
    }

    /// Build a tree from a parsed net record.
    pub fn from_record(record: &NetRecord, r_unit: f64, c_unit: f64) -> Self {
        let mut tree = RCTree::new(r_unit, c_unit);
        tree.name = record.name.clone();
        for (node, cap) in &record.caps {
            tree.set_node_cap(node, *cap);
        }
        for (a, b, res) in &record.edges {
            tree.add_edge(a, b, *res);
        }
        tree
    }

    /// Canonical get-or-create: every referenced node has a defined
    /// capacitance, zero until set.
    fn touch(&mut self, node: &str) {
        self.node_self_cap.entry(node.to_string()).or_insert(0.0);
    }

    /// Add a symmetric-resistance edge. A repeated (a, b) pair overwrites
    /// the stored resistance without duplicating the adjacency entries.
    pub fn add_edge(&mut self, a: &str, b: &str, res: f64) {
        let res = res * self.r_unit;
        self.touch(a);
        self.touch(b);
        let key = (a.to_string(), b.to_string());
        if !self.resistance.contains_key(&key) {
            self.graph.entry(a.to_string()).or_default().push(b.to_string());
            self.graph.entry(b.to_string()).or_default().push(a.to_string());
        }
        self.resistance.insert(key, res);
        self.resistance.insert((b.to_string(), a.to_string()), res);
    }

    /// Set a node's self-capacitance. Last write wins.
    pub fn set_node_cap(&mut self, node: &str, cap: f64) {
        self.node_self_cap.insert(node.to_string(), cap * self.c_unit);
    }

    /// Finalization hook for API parity with the matrix form; the
    /// adjacency form is always ready for traversal.
    pub fn build(&mut self) {}

    pub fn contains(&self, node: &str) -> bool {
        self.node_self_cap.contains_key(node)
    }

    pub fn node_count(&self) -> usize {
        self.node_self_cap.len()
    }

    pub fn edge_count(&self) -> usize {
        self.resistance.len() / 2
    }

    pub fn neighbors(&self, node: &str) -> &[String] {
        self.graph.get(node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn self_cap(&self, node: &str) -> f64 {
        self.node_self_cap.get(node).copied().unwrap_or(0.0)
    }

    pub fn resistance_between(&self, a: &str, b: &str) -> f64 {
        self.resistance
            .get(&(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Check that the component reachable from `driver` is a tree.
    pub fn validate(&self, driver: &str) -> Result<(), StructuralError> {
        let mut visited = HashSet::new();
        let mut stack = vec![driver];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for neighbor in self.neighbors(node) {
                if !visited.contains(neighbor.as_str()) {
                    stack.push(neighbor.as_str());
                }
            }
        }

        let edges = self
            .resistance
            .keys()
            .filter(|(a, b)| a <= b && visited.contains(a.as_str()) && visited.contains(b.as_str()))
            .count();

        if !visited.is_empty() && edges >= visited.len() {
            return Err(StructuralError::Cycle {
                net: self.name.clone(),
                driver: driver.to_string(),
                nodes: visited.len(),
                edges,
            });
        }
        Ok(())
    }
}

/// Dense-matrix RC tree: node indices assigned on first encounter, a
/// symmetric n x n resistance matrix and an n-length capacitance vector,
/// materialized lazily by `build`.
#[derive(Debug, Clone)]
pub struct RCTreeMatrix {
    pub name: String,
    node_index: HashMap<String, usize>,
    index_node: Vec<String>,
    edge_list: Vec<(usize, usize, f64)>,
    adj: DMatrix<f64>,
    cap: DVector<f64>,
    r_unit: f64,
    c_unit: f64,
    dirty: bool,
}

impl RCTreeMatrix {
    pub fn new(r_unit: f64, c_unit: f64) -> Self {
        RCTreeMatrix {
            name: String::new(),
            node_index: HashMap::new(),
            index_node: Vec::new(),
            edge_list: Vec::new(),
            adj: DMatrix::zeros(0, 0),
            cap: DVector::zeros(0),
            r_unit,
            c_unit,
            dirty: false,
        }
    }

    /// Build a tree from a parsed net record.
    pub fn from_record(record: &NetRecord, r_unit: f64, c_unit: f64) -> Self {
        let mut tree = RCTreeMatrix::new(r_unit, c_unit);
        tree.name = record.name.clone();
        for (node, cap) in &record.caps {
            tree.set_node_cap(node, *cap);
        }
        for (a, b, res) in &record.edges {
            tree.add_edge(a, b, *res);
        }
        tree
    }

    /// Assign a stable dense index on first encounter.
    fn ensure_node(&mut self, node: &str) -> usize {
        if let Some(&idx) = self.node_index.get(node) {
            return idx;
        }
        let idx = self.index_node.len();
        self.node_index.insert(node.to_string(), idx);
        self.index_node.push(node.to_string());
        idx
    }

    /// Grow the capacitance vector to at least `min_len`, zero-filling the
    /// new entries. The single place the vector is ever resized.
    fn reserve_caps(&mut self, min_len: usize) {
        if self.cap.len() >= min_len {
            return;
        }
        let mut grown = DVector::zeros(min_len);
        for i in 0..self.cap.len() {
            grown[i] = self.cap[i];
        }
        self.cap = grown;
    }

    pub fn add_edge(&mut self, a: &str, b: &str, res: f64) {
        let i = self.ensure_node(a);
        let j = self.ensure_node(b);
        self.edge_list.push((i, j, res * self.r_unit));
        self.dirty = true;
    }

    pub fn set_node_cap(&mut self, node: &str, cap: f64) {
        let idx = self.ensure_node(node);
        self.reserve_caps(idx + 1);
        self.cap[idx] = cap * self.c_unit;
        self.dirty = true;
    }

    /// Materialize the resistance matrix and pad the capacitance vector.
    /// Edges are written in insertion order, so a repeated pair keeps its
    /// last resistance value. No-op when already built.
    pub fn build(&mut self) {
        if !self.dirty && self.adj.nrows() == self.index_node.len() {
            return;
        }
        let n = self.index_node.len();
        let mut adj = DMatrix::zeros(n, n);
        for &(i, j, r) in &self.edge_list {
            adj[(i, j)] = r;
            adj[(j, i)] = r;
        }
        self.adj = adj;
        self.reserve_caps(n);
        self.dirty = false;
    }

    pub fn contains(&self, node: &str) -> bool {
        self.node_index.contains_key(node)
    }

    pub fn index_of(&self, node: &str) -> Option<usize> {
        self.node_index.get(node).copied()
    }

    pub fn node_at(&self, idx: usize) -> &str {
        &self.index_node[idx]
    }

    pub fn node_count(&self) -> usize {
        self.index_node.len()
    }

    pub fn edge_count(&self) -> usize {
        let pairs: HashSet<(usize, usize)> = self
            .edge_list
            .iter()
            .map(|&(i, j, _)| if i <= j { (i, j) } else { (j, i) })
            .collect();
        pairs.len()
    }

    pub fn cap_at(&self, idx: usize) -> f64 {
        self.cap[idx]
    }

    pub fn resistance_at(&self, i: usize, j: usize) -> f64 {
        self.adj[(i, j)]
    }

    pub fn neighbor_indices(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.index_node.len()).filter(move |&j| self.adj[(i, j)] != 0.0)
    }

    /// Check that the component reachable from `driver` is a tree.
    /// Builds the matrices if needed.
    pub fn validate(&mut self, driver: &str) -> Result<(), StructuralError> {
        self.build();
        let Some(driver_idx) = self.index_of(driver) else {
            return Ok(());
        };

        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut stack = vec![driver_idx];
        let mut reached = 0usize;
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            reached += 1;
            for j in self.neighbor_indices(node) {
                if !visited[j] {
                    stack.push(j);
                }
            }
        }

        let edges = self
            .edge_list
            .iter()
            .map(|&(i, j, _)| if i <= j { (i, j) } else { (j, i) })
            .filter(|&(i, j)| visited[i] && visited[j])
            .collect::<HashSet<_>>()
            .len();

        if reached > 0 && edges >= reached {
            return Err(StructuralError::Cycle {
                net: self.name.clone(),
                driver: driver.to_string(),
                nodes: reached,
                edges,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_symmetry() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.add_edge("a", "b", 3.5);
        assert_eq!(tree.resistance_between("a", "b"), 3.5);
        assert_eq!(tree.resistance_between("b", "a"), 3.5);
        assert_eq!(tree.edge_count(), 1);
    }

    #[test]
    fn test_nodes_default_to_zero_cap() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.add_edge("a", "b", 1.0);
        assert!(tree.contains("a"));
        assert!(tree.contains("b"));
        assert_eq!(tree.self_cap("a"), 0.0);
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_cap_last_write_wins() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.set_node_cap("n", 1.0);
        tree.set_node_cap("n", 2.5);
        assert_eq!(tree.self_cap("n"), 2.5);
    }

    #[test]
    fn test_unit_scaling_applied_at_insertion() {
        let mut tree = RCTree::new(1e3, 1e-15);
        tree.add_edge("a", "b", 2.0);
        tree.set_node_cap("a", 4.0);
        assert_eq!(tree.resistance_between("a", "b"), 2000.0);
        assert_eq!(tree.self_cap("a"), 4.0e-15);
    }

    #[test]
    fn test_duplicate_edge_overwrites() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.add_edge("a", "b", 1.0);
        tree.add_edge("a", "b", 9.0);
        assert_eq!(tree.resistance_between("a", "b"), 9.0);
        assert_eq!(tree.resistance_between("b", "a"), 9.0);
        assert_eq!(tree.edge_count(), 1);
        // adjacency entries are not duplicated
        assert_eq!(tree.neighbors("a").len(), 1);
    }

    #[test]
    fn test_validate_accepts_tree() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.add_edge("1", "2", 1.0);
        tree.add_edge("1", "3", 1.0);
        tree.add_edge("3", "4", 1.0);
        tree.build(); // no-op for the adjacency form
        assert!(tree.validate("1").is_ok());
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let mut tree = RCTree::new(1.0, 1.0);
        tree.name = "cyclic".to_string();
        tree.add_edge("1", "2", 1.0);
        tree.add_edge("2", "3", 1.0);
        tree.add_edge("3", "1", 1.0);
        let err = tree.validate("1").unwrap_err();
        assert!(matches!(err, StructuralError::Cycle { nodes: 3, edges: 3, .. }));
    }

    #[test]
    fn test_matrix_index_assignment() {
        let mut tree = RCTreeMatrix::new(1.0, 1.0);
        tree.add_edge("x", "y", 1.0);
        tree.add_edge("y", "z", 2.0);
        assert_eq!(tree.index_of("x"), Some(0));
        assert_eq!(tree.index_of("y"), Some(1));
        assert_eq!(tree.index_of("z"), Some(2));
        assert_eq!(tree.node_at(2), "z");
        assert!(tree.contains("x"));
        assert!(!tree.contains("w"));
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.edge_count(), 2);
    }

    #[test]
    fn test_matrix_build_symmetry() {
        let mut tree = RCTreeMatrix::new(1.0, 1.0);
        tree.add_edge("a", "b", 7.0);
        tree.build();
        let i = tree.index_of("a").unwrap();
        let j = tree.index_of("b").unwrap();
        assert_eq!(tree.resistance_at(i, j), 7.0);
        assert_eq!(tree.resistance_at(j, i), 7.0);
        assert_eq!(tree.resistance_at(i, i), 0.0);
    }

    #[test]
    fn test_matrix_cap_vector_grows_zero_filled() {
        let mut tree = RCTreeMatrix::new(1.0, 1.0);
        tree.set_node_cap("a", 1.0);
        // edges introduce nodes with indices past the cap vector
        tree.add_edge("b", "c", 1.0);
        tree.set_node_cap("c", 4.0);
        tree.build();
        assert_eq!(tree.cap_at(tree.index_of("a").unwrap()), 1.0);
        assert_eq!(tree.cap_at(tree.index_of("b").unwrap()), 0.0);
        assert_eq!(tree.cap_at(tree.index_of("c").unwrap()), 4.0);
    }

    #[test]
    fn test_matrix_duplicate_edge_last_write_wins() {
        let mut tree = RCTreeMatrix::new(1.0, 1.0);
        tree.add_edge("a", "b", 1.0);
        tree.add_edge("b", "a", 6.0);
        tree.build();
        let i = tree.index_of("a").unwrap();
        let j = tree.index_of("b").unwrap();
        assert_eq!(tree.resistance_at(i, j), 6.0);
        assert_eq!(tree.edge_count(), 1);
    }

    #[test]
    fn test_matrix_validate_rejects_cycle() {
        let mut tree = RCTreeMatrix::new(1.0, 1.0);
        tree.add_edge("1", "2", 1.0);
        tree.add_edge("2", "3", 1.0);
        tree.add_edge("3", "1", 1.0);
        assert!(tree.validate("1").is_err());
    }

    #[test]
    fn test_from_record_preserves_write_order() {
        let record = NetRecord {
            raw_id: "7".to_string(),
            name: "n7".to_string(),
            caps: vec![("1".to_string(), 0.5), ("1".to_string(), 2.0)],
            edges: vec![("1".to_string(), "2".to_string(), 3.0)],
            ..Default::default()
        };
        let tree = RCTree::from_record(&record, 1.0, 1.0);
        assert_eq!(tree.name, "n7");
        assert_eq!(tree.self_cap("1"), 2.0);
        assert_eq!(tree.resistance_between("1", "2"), 3.0);
    }
}
