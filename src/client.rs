//! Graph RPC client implementation
//!
//! The client wraps the generated gRPC client with typed methods that
//! marshal native values into the wire unions on the way out and extract
//! them on the way back.

use crate::engine::GraphId;
use crate::pb::graph_rpc_service_client::GraphRpcServiceClient;
use crate::pb::{
    CreateGraphRequest, DeleteGraphRequest, EdgeDataRequest, GraphInfoRequest, GraphSchemaRequest,
    ListGraphIdsRequest, LoadCsvAsEdgeDataRequest, LoadCsvAsVertexDataRequest, NumEdgesRequest,
    NumVerticesRequest, UptimeRequest, VertexDataRequest,
};
use crate::protocol::{PropertyValue, VertexEdgeId};
use crate::store::{EdgeDataRow, GraphSchema, VertexDataRow};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use tonic::transport::Channel;

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address (gRPC endpoint)
    pub server_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "http://[::1]:50051".to_string(),
        }
    }
}

/// CSV source for a load request: a path the server can read, or the file
/// contents shipped inline.
#[derive(Clone, Debug)]
pub enum CsvSource {
    Path(String),
    Content(Vec<u8>),
}

/// Load options forwarded with a CSV load request
#[derive(Clone, Debug)]
pub struct CsvLoadOptions {
    /// Column name -> dtype name ("int32", "int64", "str", "bool")
    pub dtypes: HashMap<String, String>,
    pub has_header: bool,
    pub delimiter: char,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        Self {
            dtypes: HashMap::new(),
            has_header: true,
            delimiter: ',',
        }
    }
}

impl CsvLoadOptions {
    /// Convenience constructor from (column, dtype) pairs.
    pub fn with_dtypes(pairs: &[(&str, &str)]) -> Self {
        Self {
            dtypes: pairs
                .iter()
                .map(|(column, dtype)| (column.to_string(), dtype.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

/// Graph RPC client
pub struct GraphRpcClient {
    config: ClientConfig,
    /// gRPC client, populated by connect()
    grpc_client: Mutex<Option<GraphRpcServiceClient<Channel>>>,
}

impl GraphRpcClient {
    /// Create a new client. Call `connect()` before issuing requests.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            grpc_client: Mutex::new(None),
        }
    }

    /// Connect to the server and probe it with an uptime request
    pub async fn connect(&self) -> Result<()> {
        tracing::info!("Connecting to server at {}", self.config.server_addr);

        let channel = Channel::from_shared(self.config.server_addr.clone())?
            .connect()
            .await?;

        let mut client = GraphRpcServiceClient::new(channel);

        let response = client.uptime(UptimeRequest {}).await?.into_inner();
        tracing::info!("Connected, server uptime {}s", response.uptime_seconds);

        *self.grpc_client.lock() = Some(client);

        Ok(())
    }

    /// Check if connected to server
    pub fn is_connected(&self) -> bool {
        self.grpc_client.lock().is_some()
    }

    fn grpc(&self) -> Result<GraphRpcServiceClient<Channel>> {
        self.grpc_client
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("Not connected"))
    }

    /// Server uptime in seconds
    pub async fn uptime(&self) -> Result<u64> {
        let response = self.grpc()?.uptime(UptimeRequest {}).await?.into_inner();
        Ok(response.uptime_seconds)
    }

    /// Create an empty graph on the server, returning its id
    pub async fn create_graph(&self) -> Result<GraphId> {
        let response = self
            .grpc()?
            .create_graph(CreateGraphRequest {})
            .await?
            .into_inner();
        Ok(response.graph_id)
    }

    /// Delete a graph. Returns whether it existed.
    pub async fn delete_graph(&self, graph_id: GraphId) -> Result<bool> {
        let response = self
            .grpc()?
            .delete_graph(DeleteGraphRequest { graph_id })
            .await?
            .into_inner();
        Ok(response.graph_existed)
    }

    /// Ids of all graphs resident on the server
    pub async fn graph_ids(&self) -> Result<Vec<GraphId>> {
        let response = self
            .grpc()?
            .list_graph_ids(ListGraphIdsRequest {})
            .await?
            .into_inner();
        Ok(response.graph_ids)
    }

    /// Graph counters, unmarshaled from their tagged wire form. An empty
    /// `keys` slice selects all counters.
    pub async fn graph_info(
        &self,
        graph_id: GraphId,
        keys: &[&str],
    ) -> Result<HashMap<String, PropertyValue>> {
        let response = self
            .grpc()?
            .get_graph_info(GraphInfoRequest {
                graph_id,
                keys: keys.iter().map(|k| k.to_string()).collect(),
            })
            .await?
            .into_inner();

        Ok(response
            .info
            .iter()
            .filter_map(|(key, value)| {
                PropertyValue::from_wire(value).map(|value| (key.clone(), value))
            })
            .collect())
    }

    /// Property and type names known to a graph
    pub async fn graph_schema(&self, graph_id: GraphId) -> Result<GraphSchema> {
        let response = self
            .grpc()?
            .get_graph_schema(GraphSchemaRequest { graph_id })
            .await?
            .into_inner();
        Ok(GraphSchema {
            vertex_property_names: response.vertex_property_names,
            edge_property_names: response.edge_property_names,
            vertex_types: response.vertex_types,
            edge_types: response.edge_types,
        })
    }

    /// Load a CSV of vertex rows into a graph, returning the row count
    pub async fn load_csv_as_vertex_data(
        &self,
        graph_id: GraphId,
        source: CsvSource,
        options: &CsvLoadOptions,
        vertex_col_name: &str,
        type_name: &str,
    ) -> Result<u64> {
        use crate::pb::load_csv_as_vertex_data_request::Source;

        let source = match source {
            CsvSource::Path(path) => Source::Path(path),
            CsvSource::Content(content) => Source::Content(content),
        };

        let response = self
            .grpc()?
            .load_csv_as_vertex_data(LoadCsvAsVertexDataRequest {
                graph_id,
                source: Some(source),
                dtypes: options.dtypes.clone(),
                vertex_col_name: vertex_col_name.to_string(),
                has_header: options.has_header,
                type_name: type_name.to_string(),
                delimiter: options.delimiter.to_string(),
            })
            .await?
            .into_inner();

        if !response.success {
            return Err(anyhow!("vertex load failed: {}", response.error_message));
        }

        Ok(response.rows_loaded)
    }

    /// Load a CSV of edge rows into a graph, returning the row count
    pub async fn load_csv_as_edge_data(
        &self,
        graph_id: GraphId,
        source: CsvSource,
        options: &CsvLoadOptions,
        src_col_name: &str,
        dst_col_name: &str,
        type_name: &str,
    ) -> Result<u64> {
        use crate::pb::load_csv_as_edge_data_request::Source;

        let source = match source {
            CsvSource::Path(path) => Source::Path(path),
            CsvSource::Content(content) => Source::Content(content),
        };

        let response = self
            .grpc()?
            .load_csv_as_edge_data(LoadCsvAsEdgeDataRequest {
                graph_id,
                source: Some(source),
                dtypes: options.dtypes.clone(),
                src_col_name: src_col_name.to_string(),
                dst_col_name: dst_col_name.to_string(),
                has_header: options.has_header,
                type_name: type_name.to_string(),
                delimiter: options.delimiter.to_string(),
            })
            .await?
            .into_inner();

        if !response.success {
            return Err(anyhow!("edge load failed: {}", response.error_message));
        }

        Ok(response.rows_loaded)
    }

    /// Vertex rows, optionally filtered by id, type, and column. An
    /// already-tagged id filter is sent through unchanged.
    pub async fn vertex_data(
        &self,
        graph_id: GraphId,
        vertex_ids: Option<VertexEdgeId>,
        types: &[&str],
        columns: &[&str],
    ) -> Result<Vec<VertexDataRow>> {
        let response = self
            .grpc()?
            .get_vertex_data(VertexDataRequest {
                graph_id,
                vertex_ids: vertex_ids.as_ref().map(Into::into),
                types: types.iter().map(|t| t.to_string()).collect(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
            })
            .await?
            .into_inner();

        Ok(response.rows.iter().map(Into::into).collect())
    }

    /// Edge rows, optionally filtered by id, type, and column
    pub async fn edge_data(
        &self,
        graph_id: GraphId,
        edge_ids: Option<VertexEdgeId>,
        types: &[&str],
        columns: &[&str],
    ) -> Result<Vec<EdgeDataRow>> {
        let response = self
            .grpc()?
            .get_edge_data(EdgeDataRequest {
                graph_id,
                edge_ids: edge_ids.as_ref().map(Into::into),
                types: types.iter().map(|t| t.to_string()).collect(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
            })
            .await?
            .into_inner();

        Ok(response.rows.iter().map(Into::into).collect())
    }

    /// Vertex count, optionally per type. With `include_edge_data`,
    /// vertices that only appear as edge endpoints are counted too.
    pub async fn num_vertices(
        &self,
        graph_id: GraphId,
        type_name: Option<&str>,
        include_edge_data: bool,
    ) -> Result<u64> {
        let response = self
            .grpc()?
            .get_num_vertices(NumVerticesRequest {
                graph_id,
                type_name: type_name.map(String::from),
                include_edge_data,
            })
            .await?
            .into_inner();
        Ok(response.count)
    }

    /// Edge count, optionally per type
    pub async fn num_edges(&self, graph_id: GraphId, type_name: Option<&str>) -> Result<u64> {
        let response = self
            .grpc()?
            .get_num_edges(NumEdgesRequest {
                graph_id,
                type_name: type_name.map(String::from),
            })
            .await?
            .into_inner();
        Ok(response.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GraphRpcClient::new(ClientConfig::default());
        assert!(!client.is_connected());
    }

    #[test]
    fn test_csv_load_options() {
        let options = CsvLoadOptions::with_dtypes(&[("volume", "int32"), ("card_type", "str")]);
        assert_eq!(options.dtypes.len(), 2);
        assert_eq!(options.delimiter, ',');
        assert!(options.has_header);
    }
}
