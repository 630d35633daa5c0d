use std::collections::HashMap;

use crate::rctree::{RCTree, RCTreeMatrix};

/// Converts the internal resistance * capacitance product into the output
/// time unit. Applied exactly once per delay, after any ln(2) scaling.
pub const DELAY_UNIT_SCALE: f64 = 1e-6;

/// Per-load delay results keyed by load identifier; `None` marks a load
/// unreachable from the driver.
pub type DelayMap = HashMap<String, Option<f64>>;

/// Elmore delay engine over an RC tree.
///
/// With `apply_ln2` set, each delay is multiplied by ln(2) to model the
/// 50%-threshold propagation delay instead of the full RC time constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElmoreEngine {
    pub apply_ln2: bool,
}

/// Driver-rooted traversal state of an adjacency tree.
struct Traversal {
    /// Node -> the node it was first reached from (`None` for the driver).
    parent: HashMap<String, Option<String>>,
    /// Visitation order; parents always precede their children.
    order: Vec<String>,
}

impl ElmoreEngine {
    pub fn new(apply_ln2: bool) -> Self {
        ElmoreEngine { apply_ln2 }
    }

    /// Compute per-load Elmore delays on the adjacency realization.
    ///
    /// A load that was never reached from the driver maps to `None`; a
    /// driver absent from the tree yields `None` for every load.
    pub fn delays(&self, tree: &RCTree, driver: &str, loads: &[String]) -> DelayMap {
        let mut result: DelayMap = loads.iter().map(|l| (l.clone(), None)).collect();
        if !tree.contains(driver) {
            return result;
        }

        let traversal = traverse(tree, driver);
        let subtree_cap = subtree_caps(tree, &traversal);

        for load in loads {
            if !traversal.parent.contains_key(load) {
                continue;
            }
            // walk load -> driver over parent pointers; each hop adds the
            // edge resistance times the far node's downstream capacitance
            let mut delay = 0.0;
            let mut current = load.as_str();
            while let Some(Some(par)) = traversal.parent.get(current) {
                delay += tree.resistance_between(par, current) * subtree_cap[current];
                current = par;
            }
            if self.apply_ln2 {
                delay *= std::f64::consts::LN_2;
            }
            result.insert(load.clone(), Some(delay * DELAY_UNIT_SCALE));
        }

        result
    }

    /// Compute per-load Elmore delays on the dense-matrix realization.
    /// Rebuilds the matrices first if stale; results match `delays` on the
    /// same input.
    pub fn delays_matrix(
        &self,
        tree: &mut RCTreeMatrix,
        driver: &str,
        loads: &[String],
    ) -> DelayMap {
        tree.build();

        let mut result: DelayMap = loads.iter().map(|l| (l.clone(), None)).collect();
        let Some(driver_idx) = tree.index_of(driver) else {
            return result;
        };

        let n = tree.node_count();
        let mut visited = vec![false; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![driver_idx];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            order.push(node);
            for j in tree.neighbor_indices(node) {
                if !visited[j] {
                    parent[j] = Some(node);
                    stack.push(j);
                }
            }
        }

        let mut subtree_cap = vec![0.0; n];
        for &node in order.iter().rev() {
            let mut cap = tree.cap_at(node);
            for (j, &sub) in subtree_cap.iter().enumerate() {
                if parent[j] == Some(node) {
                    cap += sub;
                }
            }
            subtree_cap[node] = cap;
        }

        for load in loads {
            let Some(load_idx) = tree.index_of(load) else {
                continue;
            };
            if !visited[load_idx] {
                continue;
            }
            let mut delay = 0.0;
            let mut current = load_idx;
            while current != driver_idx {
                let Some(par) = parent[current] else {
                    break;
                };
                delay += tree.resistance_at(par, current) * subtree_cap[current];
                current = par;
            }
            if self.apply_ln2 {
                delay *= std::f64::consts::LN_2;
            }
            result.insert(load.clone(), Some(delay * DELAY_UNIT_SCALE));
        }

        result
    }
}

/// Iterative DFS from the driver with an explicit stack and revisit guard.
fn traverse(tree: &RCTree, driver: &str) -> Traversal {
    let mut parent: HashMap<String, Option<String>> = HashMap::new();
    let mut order = Vec::new();
    let mut stack: Vec<(String, Option<String>)> = vec![(driver.to_string(), None)];

    while let Some((node, par)) = stack.pop() {
        if parent.contains_key(&node) {
            continue;
        }
        for neighbor in tree.neighbors(&node) {
            if Some(neighbor.as_str()) != par.as_deref() {
                stack.push((neighbor.clone(), Some(node.clone())));
            }
        }
        order.push(node.clone());
        parent.insert(node, par);
    }

    Traversal { parent, order }
}

/// Bottom-up pass: each node's subtree capacitance is its own plus the sum
/// over nodes whose recorded parent it is.
fn subtree_caps(tree: &RCTree, traversal: &Traversal) -> HashMap<String, f64> {
    let mut subtree_cap: HashMap<String, f64> = HashMap::new();
    for node in traversal.order.iter().rev() {
        let mut cap = tree.self_cap(node);
        for neighbor in tree.neighbors(node) {
            let is_child = traversal
                .parent
                .get(neighbor)
                .map(|p| p.as_deref() == Some(node.as_str()))
                .unwrap_or(false);
            if is_child {
                cap += subtree_cap.get(neighbor).copied().unwrap_or(0.0);
            }
        }
        subtree_cap.insert(node.clone(), cap);
    }
    subtree_cap
}
