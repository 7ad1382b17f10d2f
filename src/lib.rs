pub mod client;
pub mod engine;
pub mod ingest;
pub mod protocol;
pub mod server;
pub mod store;

// Re-export generated protobuf types
pub mod pb {
    tonic::include_proto!("graph_rpc");
}

pub use client::GraphRpcClient;
pub use engine::{GraphEngine, GraphId, InMemoryEngine};
pub use protocol::{MarshalError, PropertyValue, VertexEdgeId};
pub use server::GraphRpcServer;
pub use store::PropertyGraph;
