use std::collections::BTreeMap;
use std::fs::File;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::rctree::NetRecord;

/// JSON-serializable view of one net's parasitic graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetGraph {
    pub id: String,
    /// Nodes keyed by identifier; BTreeMap keeps the output deterministic.
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub inputs: Vec<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub capacitance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub resistance: f64,
}

impl NetGraph {
    /// Build the graph view from a parsed net record. Capacitance writes
    /// follow last-write-wins; edge endpoints without a capacitance entry
    /// appear with capacitance 0.
    pub fn from_record(record: &NetRecord) -> Self {
        let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
        for (node, cap) in &record.caps {
            nodes.insert(node.clone(), GraphNode { capacitance: *cap });
        }

        let mut edges = Vec::with_capacity(record.edges.len());
        for (a, b, res) in &record.edges {
            nodes.entry(a.clone()).or_insert(GraphNode { capacitance: 0.0 });
            nodes.entry(b.clone()).or_insert(GraphNode { capacitance: 0.0 });
            edges.push(GraphEdge {
                source: a.clone(),
                target: b.clone(),
                resistance: *res,
            });
        }

        NetGraph {
            id: record.raw_id.clone(),
            nodes,
            edges,
            inputs: record.loads.clone(),
            output: record.driver.clone(),
        }
    }

    /// Write the graph as pretty-printed JSON.
    pub fn write_json(&self, path: &str) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create graph file '{}'", path))?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Net graph exported to JSON: {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NetRecord {
        NetRecord {
            raw_id: "5".to_string(),
            name: "clk_net".to_string(),
            driver: Some("2:Z".to_string()),
            loads: vec!["1:A".to_string()],
            caps: vec![
                ("10".to_string(), 0.5),
                ("10".to_string(), 0.75),
                ("11".to_string(), 1.5),
            ],
            edges: vec![("10".to_string(), "12".to_string(), 2.0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_graph_shape() {
        let graph = NetGraph::from_record(&record());
        assert_eq!(graph.id, "5");
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.nodes["10"].capacitance, 0.75);
        assert_eq!(graph.nodes["12"].capacitance, 0.0);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "10");
        assert_eq!(graph.edges[0].resistance, 2.0);
        assert_eq!(graph.inputs, vec!["1:A".to_string()]);
        assert_eq!(graph.output.as_deref(), Some("2:Z"));
    }

    #[test]
    fn test_json_round_trip() {
        let graph = NetGraph::from_record(&record());
        let json = serde_json::to_string(&graph).unwrap();
        let back: NetGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, graph.id);
        assert_eq!(back.nodes.len(), graph.nodes.len());
        assert_eq!(back.output, graph.output);
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let graph = NetGraph::from_record(&record());
        graph.write_json(path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let back: NetGraph = serde_json::from_str(&content).unwrap();
        assert_eq!(back.id, "5");
    }
}
