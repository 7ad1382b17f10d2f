//! Graph engine abstraction
//!
//! The RPC layer talks to the graph backend through the `GraphEngine`
//! trait. `InMemoryEngine` is the CPU-resident implementation used here; a
//! GPU-backed engine would sit behind the same trait.

use crate::store::{
    DataSelector, EdgeDataRow, EdgeTable, GraphInfo, GraphSchema, PropertyGraph, VertexDataRow,
    VertexTable,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

pub type GraphId = i32;

/// Graph clients may target without creating it first.
pub const DEFAULT_GRAPH_ID: GraphId = 0;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph {0} not found")]
    GraphNotFound(GraphId),
}

impl From<EngineError> for tonic::Status {
    fn from(err: EngineError) -> Self {
        tonic::Status::not_found(err.to_string())
    }
}

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Create graph 0 at startup so clients have a default target.
    pub create_default_graph: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            create_default_graph: true,
        }
    }
}

/// Trait for graph backend implementations
pub trait GraphEngine: Send + Sync {
    /// Time since the engine started
    fn uptime(&self) -> Duration;

    /// Create an empty graph and return its id
    fn create_graph(&self) -> GraphId;

    /// Delete a graph. Returns whether it existed.
    fn delete_graph(&self, graph_id: GraphId) -> bool;

    /// Ids of all resident graphs, ascending
    fn graph_ids(&self) -> Vec<GraphId>;

    /// Insert a vertex table, returning the number of rows loaded
    fn load_vertex_table(&self, graph_id: GraphId, table: VertexTable) -> Result<u64, EngineError>;

    /// Insert an edge table, returning the number of rows loaded
    fn load_edge_table(&self, graph_id: GraphId, table: EdgeTable) -> Result<u64, EngineError>;

    fn graph_info(&self, graph_id: GraphId) -> Result<GraphInfo, EngineError>;

    fn graph_schema(&self, graph_id: GraphId) -> Result<GraphSchema, EngineError>;

    fn vertex_data(
        &self,
        graph_id: GraphId,
        selector: &DataSelector,
    ) -> Result<Vec<VertexDataRow>, EngineError>;

    fn edge_data(
        &self,
        graph_id: GraphId,
        selector: &DataSelector,
    ) -> Result<Vec<EdgeDataRow>, EngineError>;

    fn num_vertices(
        &self,
        graph_id: GraphId,
        type_filter: Option<&str>,
        include_edge_data: bool,
    ) -> Result<u64, EngineError>;

    fn num_edges(&self, graph_id: GraphId, type_filter: Option<&str>) -> Result<u64, EngineError>;
}

/// CPU-resident engine holding property graphs in process memory
pub struct InMemoryEngine {
    graphs: DashMap<GraphId, RwLock<PropertyGraph>>,
    next_graph_id: AtomicI32,
    started: Instant,
}

impl InMemoryEngine {
    pub fn new(config: EngineConfig) -> Self {
        let engine = Self {
            graphs: DashMap::new(),
            next_graph_id: AtomicI32::new(DEFAULT_GRAPH_ID),
            started: Instant::now(),
        };
        if config.create_default_graph {
            engine.create_graph();
        }
        engine
    }

    fn with_graph<T>(
        &self,
        graph_id: GraphId,
        f: impl FnOnce(&PropertyGraph) -> T,
    ) -> Result<T, EngineError> {
        let entry = self
            .graphs
            .get(&graph_id)
            .ok_or(EngineError::GraphNotFound(graph_id))?;
        let graph = entry.read();
        Ok(f(&graph))
    }

    fn with_graph_mut<T>(
        &self,
        graph_id: GraphId,
        f: impl FnOnce(&mut PropertyGraph) -> T,
    ) -> Result<T, EngineError> {
        let entry = self
            .graphs
            .get(&graph_id)
            .ok_or(EngineError::GraphNotFound(graph_id))?;
        let mut graph = entry.write();
        Ok(f(&mut graph))
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GraphEngine for InMemoryEngine {
    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    fn create_graph(&self) -> GraphId {
        let graph_id = self.next_graph_id.fetch_add(1, Ordering::Relaxed);
        self.graphs
            .insert(graph_id, RwLock::new(PropertyGraph::new()));
        tracing::debug!("Created graph {}", graph_id);
        graph_id
    }

    fn delete_graph(&self, graph_id: GraphId) -> bool {
        let existed = self.graphs.remove(&graph_id).is_some();
        if existed {
            tracing::debug!("Deleted graph {}", graph_id);
        }
        existed
    }

    fn graph_ids(&self) -> Vec<GraphId> {
        let mut ids: Vec<GraphId> = self.graphs.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn load_vertex_table(&self, graph_id: GraphId, table: VertexTable) -> Result<u64, EngineError> {
        self.with_graph_mut(graph_id, |graph| graph.add_vertex_table(table))
    }

    fn load_edge_table(&self, graph_id: GraphId, table: EdgeTable) -> Result<u64, EngineError> {
        self.with_graph_mut(graph_id, |graph| graph.add_edge_table(table))
    }

    fn graph_info(&self, graph_id: GraphId) -> Result<GraphInfo, EngineError> {
        self.with_graph(graph_id, |graph| graph.info())
    }

    fn graph_schema(&self, graph_id: GraphId) -> Result<GraphSchema, EngineError> {
        self.with_graph(graph_id, |graph| graph.schema())
    }

    fn vertex_data(
        &self,
        graph_id: GraphId,
        selector: &DataSelector,
    ) -> Result<Vec<VertexDataRow>, EngineError> {
        self.with_graph(graph_id, |graph| graph.vertex_data(selector))
    }

    fn edge_data(
        &self,
        graph_id: GraphId,
        selector: &DataSelector,
    ) -> Result<Vec<EdgeDataRow>, EngineError> {
        self.with_graph(graph_id, |graph| graph.edge_data(selector))
    }

    fn num_vertices(
        &self,
        graph_id: GraphId,
        type_filter: Option<&str>,
        include_edge_data: bool,
    ) -> Result<u64, EngineError> {
        self.with_graph(graph_id, |graph| {
            graph.num_vertices(type_filter, include_edge_data)
        })
    }

    fn num_edges(&self, graph_id: GraphId, type_filter: Option<&str>) -> Result<u64, EngineError> {
        self.with_graph(graph_id, |graph| graph.num_edges(type_filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_graph_exists() {
        let engine = InMemoryEngine::default();
        assert_eq!(engine.graph_ids(), vec![DEFAULT_GRAPH_ID]);
        assert_eq!(engine.num_edges(DEFAULT_GRAPH_ID, None).unwrap(), 0);
    }

    #[test]
    fn test_no_default_graph() {
        let engine = InMemoryEngine::new(EngineConfig {
            create_default_graph: false,
        });
        assert!(engine.graph_ids().is_empty());
        // The first created graph still gets id 0.
        assert_eq!(engine.create_graph(), DEFAULT_GRAPH_ID);
    }

    #[test]
    fn test_create_and_delete() {
        let engine = InMemoryEngine::default();
        let graph_id = engine.create_graph();
        assert_eq!(graph_id, 1);
        assert_eq!(engine.graph_ids(), vec![0, 1]);

        assert!(engine.delete_graph(graph_id));
        assert!(!engine.delete_graph(graph_id));
        assert_eq!(engine.graph_ids(), vec![0]);
    }

    #[test]
    fn test_missing_graph_errors() {
        let engine = InMemoryEngine::default();
        let err = engine.graph_info(42).unwrap_err();
        assert!(matches!(err, EngineError::GraphNotFound(42)));
    }
}
