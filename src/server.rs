//! Graph RPC server implementation
//!
//! The server handles control plane RPC requests and delegates graph
//! storage and queries to the engine behind the `GraphEngine` trait.

use crate::engine::{EngineConfig, GraphEngine, InMemoryEngine};
use crate::ingest::{self, ColumnType, CsvOptions};
use crate::pb::graph_rpc_service_server::{GraphRpcService, GraphRpcServiceServer};
use crate::pb::{
    CountResponse, CreateGraphRequest, CreateGraphResponse, DeleteGraphRequest,
    DeleteGraphResponse, EdgeDataRequest, EdgeDataResponse, GraphInfoRequest, GraphInfoResponse,
    GraphSchemaRequest, GraphSchemaResponse, ListGraphIdsRequest, ListGraphIdsResponse,
    LoadCsvAsEdgeDataRequest, LoadCsvAsVertexDataRequest, LoadCsvResponse, NumEdgesRequest,
    NumVerticesRequest, UptimeRequest, UptimeResponse, VertexDataRequest, VertexDataResponse,
};
use crate::protocol::{PropertyValue, VertexEdgeId};
use crate::store::DataSelector;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// gRPC listen address
    pub listen_addr: String,
    /// Engine configuration
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "[::1]:50051".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

/// Graph RPC server
pub struct GraphRpcServer {
    config: ServerConfig,
    /// Graph backend
    engine: Arc<dyn GraphEngine>,
}

impl GraphRpcServer {
    /// Create a new server backed by the in-memory engine
    pub fn new(config: ServerConfig) -> Self {
        let engine: Arc<dyn GraphEngine> = Arc::new(InMemoryEngine::new(config.engine.clone()));
        Self { config, engine }
    }

    /// Create a server over a caller-provided engine
    pub fn with_engine(config: ServerConfig, engine: Arc<dyn GraphEngine>) -> Self {
        Self { config, engine }
    }

    /// Get the gRPC service for this server
    pub fn into_service(self) -> GraphRpcServiceServer<GraphRpcServiceImpl> {
        GraphRpcServiceServer::new(GraphRpcServiceImpl {
            inner: Arc::new(self),
        })
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> &str {
        &self.config.listen_addr
    }
}

fn parse_csv_options(
    dtypes: &HashMap<String, String>,
    has_header: bool,
    delimiter: &str,
) -> Result<CsvOptions, Status> {
    let delimiter = match delimiter.as_bytes() {
        [] => b',',
        [byte] => *byte,
        _ => return Err(Status::invalid_argument("delimiter must be a single character")),
    };

    let mut parsed = HashMap::with_capacity(dtypes.len());
    for (column, dtype) in dtypes {
        let column_type = ColumnType::parse(dtype)
            .map_err(|e| Status::invalid_argument(format!("column '{}': {}", column, e)))?;
        parsed.insert(column.clone(), column_type);
    }

    Ok(CsvOptions {
        dtypes: parsed,
        has_header,
        delimiter,
    })
}

fn selector_from(
    ids: Option<&crate::pb::GraphVertexEdgeId>,
    types: Vec<String>,
    columns: Vec<String>,
) -> DataSelector {
    DataSelector {
        ids: ids
            .and_then(VertexEdgeId::from_wire)
            .map(|tagged| tagged.ids()),
        types: if types.is_empty() { None } else { Some(types) },
        columns: if columns.is_empty() { None } else { Some(columns) },
    }
}

/// gRPC service implementation wrapper
pub struct GraphRpcServiceImpl {
    inner: Arc<GraphRpcServer>,
}

#[tonic::async_trait]
impl GraphRpcService for GraphRpcServiceImpl {
    async fn uptime(
        &self,
        _request: Request<UptimeRequest>,
    ) -> Result<Response<UptimeResponse>, Status> {
        tracing::trace!("Uptime request");
        Ok(Response::new(UptimeResponse {
            uptime_seconds: self.inner.engine.uptime().as_secs(),
        }))
    }

    async fn create_graph(
        &self,
        _request: Request<CreateGraphRequest>,
    ) -> Result<Response<CreateGraphResponse>, Status> {
        let graph_id = self.inner.engine.create_graph();
        tracing::info!("Created graph {}", graph_id);
        Ok(Response::new(CreateGraphResponse { graph_id }))
    }

    async fn delete_graph(
        &self,
        request: Request<DeleteGraphRequest>,
    ) -> Result<Response<DeleteGraphResponse>, Status> {
        let req = request.into_inner();
        let existed = self.inner.engine.delete_graph(req.graph_id);
        tracing::debug!("DeleteGraph: graph_id={}, existed={}", req.graph_id, existed);
        Ok(Response::new(DeleteGraphResponse {
            graph_existed: existed,
        }))
    }

    async fn list_graph_ids(
        &self,
        _request: Request<ListGraphIdsRequest>,
    ) -> Result<Response<ListGraphIdsResponse>, Status> {
        Ok(Response::new(ListGraphIdsResponse {
            graph_ids: self.inner.engine.graph_ids(),
        }))
    }

    async fn get_graph_info(
        &self,
        request: Request<GraphInfoRequest>,
    ) -> Result<Response<GraphInfoResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("GetGraphInfo request: graph_id={}", req.graph_id);

        let info = self.inner.engine.graph_info(req.graph_id)?;
        let selected = info
            .entries()
            .into_iter()
            .filter(|(key, _)| req.keys.is_empty() || req.keys.iter().any(|k| k.as_str() == *key))
            .map(|(key, count)| {
                // Counts are untyped on the wire; width follows magnitude.
                (key.to_string(), PropertyValue::from_int(count).into())
            })
            .collect();

        Ok(Response::new(GraphInfoResponse { info: selected }))
    }

    async fn get_graph_schema(
        &self,
        request: Request<GraphSchemaRequest>,
    ) -> Result<Response<GraphSchemaResponse>, Status> {
        let req = request.into_inner();
        let schema = self.inner.engine.graph_schema(req.graph_id)?;
        Ok(Response::new(GraphSchemaResponse {
            vertex_property_names: schema.vertex_property_names,
            edge_property_names: schema.edge_property_names,
            vertex_types: schema.vertex_types,
            edge_types: schema.edge_types,
        }))
    }

    async fn load_csv_as_vertex_data(
        &self,
        request: Request<LoadCsvAsVertexDataRequest>,
    ) -> Result<Response<LoadCsvResponse>, Status> {
        use crate::pb::load_csv_as_vertex_data_request::Source;

        let req = request.into_inner();
        tracing::debug!(
            "LoadCsvAsVertexData request: graph_id={}, type={}",
            req.graph_id,
            req.type_name
        );

        let options = parse_csv_options(&req.dtypes, req.has_header, &req.delimiter)?;
        let source = req
            .source
            .ok_or_else(|| Status::invalid_argument("Missing csv source"))?;
        let data = match source {
            Source::Path(path) => match tokio::fs::read(&path).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("LoadCsvAsVertexData failed: {}: {}", path, e);
                    return Ok(Response::new(LoadCsvResponse {
                        success: false,
                        error_message: format!("failed to read '{}': {}", path, e),
                        rows_loaded: 0,
                    }));
                }
            },
            Source::Content(content) => content,
        };

        match ingest::read_vertex_table(&data[..], &options, &req.vertex_col_name, &req.type_name)
        {
            Ok(table) => {
                let rows_loaded = self.inner.engine.load_vertex_table(req.graph_id, table)?;
                tracing::debug!("LoadCsvAsVertexData success: {} rows", rows_loaded);
                Ok(Response::new(LoadCsvResponse {
                    success: true,
                    error_message: String::new(),
                    rows_loaded,
                }))
            }
            Err(e) => {
                tracing::warn!("LoadCsvAsVertexData failed: {}", e);
                Ok(Response::new(LoadCsvResponse {
                    success: false,
                    error_message: e.to_string(),
                    rows_loaded: 0,
                }))
            }
        }
    }

    async fn load_csv_as_edge_data(
        &self,
        request: Request<LoadCsvAsEdgeDataRequest>,
    ) -> Result<Response<LoadCsvResponse>, Status> {
        use crate::pb::load_csv_as_edge_data_request::Source;

        let req = request.into_inner();
        tracing::debug!(
            "LoadCsvAsEdgeData request: graph_id={}, type={}",
            req.graph_id,
            req.type_name
        );

        let options = parse_csv_options(&req.dtypes, req.has_header, &req.delimiter)?;
        let source = req
            .source
            .ok_or_else(|| Status::invalid_argument("Missing csv source"))?;
        let data = match source {
            Source::Path(path) => match tokio::fs::read(&path).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("LoadCsvAsEdgeData failed: {}: {}", path, e);
                    return Ok(Response::new(LoadCsvResponse {
                        success: false,
                        error_message: format!("failed to read '{}': {}", path, e),
                        rows_loaded: 0,
                    }));
                }
            },
            Source::Content(content) => content,
        };

        match ingest::read_edge_table(
            &data[..],
            &options,
            &req.src_col_name,
            &req.dst_col_name,
            &req.type_name,
        ) {
            Ok(table) => {
                let rows_loaded = self.inner.engine.load_edge_table(req.graph_id, table)?;
                tracing::debug!("LoadCsvAsEdgeData success: {} rows", rows_loaded);
                Ok(Response::new(LoadCsvResponse {
                    success: true,
                    error_message: String::new(),
                    rows_loaded,
                }))
            }
            Err(e) => {
                tracing::warn!("LoadCsvAsEdgeData failed: {}", e);
                Ok(Response::new(LoadCsvResponse {
                    success: false,
                    error_message: e.to_string(),
                    rows_loaded: 0,
                }))
            }
        }
    }

    async fn get_vertex_data(
        &self,
        request: Request<VertexDataRequest>,
    ) -> Result<Response<VertexDataResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("GetVertexData request: graph_id={}", req.graph_id);

        let selector = selector_from(req.vertex_ids.as_ref(), req.types, req.columns);
        let rows = self.inner.engine.vertex_data(req.graph_id, &selector)?;

        Ok(Response::new(VertexDataResponse {
            rows: rows.iter().map(Into::into).collect(),
        }))
    }

    async fn get_edge_data(
        &self,
        request: Request<EdgeDataRequest>,
    ) -> Result<Response<EdgeDataResponse>, Status> {
        let req = request.into_inner();
        tracing::debug!("GetEdgeData request: graph_id={}", req.graph_id);

        let selector = selector_from(req.edge_ids.as_ref(), req.types, req.columns);
        let rows = self.inner.engine.edge_data(req.graph_id, &selector)?;

        Ok(Response::new(EdgeDataResponse {
            rows: rows.iter().map(Into::into).collect(),
        }))
    }

    async fn get_num_vertices(
        &self,
        request: Request<NumVerticesRequest>,
    ) -> Result<Response<CountResponse>, Status> {
        let req = request.into_inner();
        let count = self.inner.engine.num_vertices(
            req.graph_id,
            req.type_name.as_deref(),
            req.include_edge_data,
        )?;
        Ok(Response::new(CountResponse { count }))
    }

    async fn get_num_edges(
        &self,
        request: Request<NumEdgesRequest>,
    ) -> Result<Response<CountResponse>, Status> {
        let req = request.into_inner();
        let count = self
            .inner
            .engine
            .num_edges(req.graph_id, req.type_name.as_deref())?;
        Ok(Response::new(CountResponse { count }))
    }
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let addr = config.listen_addr.parse()?;
    let server = GraphRpcServer::new(config);

    tracing::info!("Starting graph RPC server on {}", addr);

    tonic::transport::Server::builder()
        .add_service(server.into_service())
        .serve(addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_GRAPH_ID;
    use crate::store::VertexTable;

    #[test]
    fn test_server_creation() {
        let server = GraphRpcServer::new(ServerConfig::default());
        assert_eq!(server.engine.graph_ids(), vec![DEFAULT_GRAPH_ID]);
    }

    #[test]
    fn test_load_through_engine() {
        let server = GraphRpcServer::new(ServerConfig::default());

        let rows = server
            .engine
            .load_vertex_table(
                DEFAULT_GRAPH_ID,
                VertexTable {
                    type_name: "users".to_string(),
                    rows: vec![(89021, HashMap::new())],
                },
            )
            .unwrap();
        assert_eq!(rows, 1);

        let info = server.engine.graph_info(DEFAULT_GRAPH_ID).unwrap();
        assert_eq!(info.num_vertices_from_vertex_data, 1);
    }

    #[test]
    fn test_csv_option_parsing() {
        let dtypes =
            HashMap::from([("volume".to_string(), "int32".to_string())]);
        let options = parse_csv_options(&dtypes, true, "").unwrap();
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.dtypes.get("volume"), Some(&ColumnType::Int32));

        let options = parse_csv_options(&HashMap::new(), true, " ").unwrap();
        assert_eq!(options.delimiter, b' ');

        assert!(parse_csv_options(&HashMap::new(), true, "ab").is_err());

        let bad = HashMap::from([("weight".to_string(), "float64".to_string())]);
        let err = parse_csv_options(&bad, true, ",").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_selector_decodes_tagged_ids() {
        let tagged: crate::pb::GraphVertexEdgeId = VertexEdgeId::from_ids(&[5, 10, 15]).into();
        let selector = selector_from(Some(&tagged), vec![], vec!["name".to_string()]);
        assert_eq!(selector.ids, Some(vec![5, 10, 15]));
        assert_eq!(selector.types, None);
        assert_eq!(selector.columns, Some(vec!["name".to_string()]));

        // An unset union is treated as no filter.
        let unset = crate::pb::GraphVertexEdgeId { kind: None };
        let selector = selector_from(Some(&unset), vec![], vec![]);
        assert_eq!(selector.ids, None);
    }
}
