//! Graph RPC client binary
//!
//! Run with: cargo run --bin graph-client -- --help

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use graph_rpc_poc::client::{ClientConfig, CsvLoadOptions, CsvSource, GraphRpcClient};
use graph_rpc_poc::engine::GraphId;
use graph_rpc_poc::protocol::VertexEdgeId;
use std::collections::HashMap;

#[derive(Parser, Debug)]
#[command(name = "graph-client")]
#[command(about = "Remote property-graph client")]
struct Args {
    /// Server address (gRPC endpoint)
    #[arg(long, default_value = "http://[::1]:50051")]
    server_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe the server and print its uptime
    Uptime,
    /// Create an empty graph
    CreateGraph,
    /// Delete a graph
    DeleteGraph {
        graph_id: GraphId,
    },
    /// List resident graph ids
    ListGraphs,
    /// Print graph counters
    Info {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
    },
    /// Print property and type names
    Schema {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
    },
    /// Load a vertex CSV into a graph
    LoadVertices {
        /// Path to the CSV file
        path: String,
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        /// Column holding the vertex id
        #[arg(long)]
        vertex_col: String,
        /// Vertex type name
        #[arg(long)]
        type_name: String,
        /// Column dtype, e.g. --dtype volume=int32 (repeatable)
        #[arg(long = "dtype")]
        dtypes: Vec<String>,
        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
        /// Ship the file contents inline instead of a server-side path
        #[arg(long, default_value_t = false)]
        inline: bool,
    },
    /// Load an edge CSV into a graph
    LoadEdges {
        /// Path to the CSV file
        path: String,
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        /// Column holding the source vertex id
        #[arg(long)]
        src_col: String,
        /// Column holding the destination vertex id
        #[arg(long)]
        dst_col: String,
        /// Edge type name
        #[arg(long)]
        type_name: String,
        /// Column dtype, e.g. --dtype volume=int32 (repeatable)
        #[arg(long = "dtype")]
        dtypes: Vec<String>,
        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
        /// Ship the file contents inline instead of a server-side path
        #[arg(long, default_value_t = false)]
        inline: bool,
    },
    /// Print vertex rows
    VertexData {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        /// Id filter, as a JSON integer or list, e.g. --ids '[5,10,15]'
        #[arg(long)]
        ids: Option<String>,
        /// Type filter (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,
        /// Column projection (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
    },
    /// Print edge rows
    EdgeData {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        /// Id filter, as a JSON integer or list, e.g. --ids '[0,1]'
        #[arg(long)]
        ids: Option<String>,
        /// Type filter (repeatable)
        #[arg(long = "type")]
        types: Vec<String>,
        /// Column projection (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
    },
    /// Print the vertex count
    NumVertices {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        #[arg(long)]
        type_name: Option<String>,
        /// Also count vertices that only appear as edge endpoints
        #[arg(long, default_value_t = false)]
        include_edge_data: bool,
    },
    /// Print the edge count
    NumEdges {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        #[arg(long)]
        type_name: Option<String>,
    },
    /// Run a query benchmark
    Bench {
        #[arg(long, default_value = "0")]
        graph_id: GraphId,
        /// Number of operations
        #[arg(long, default_value = "1000")]
        ops: usize,
    },
}

fn parse_dtypes(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(column, dtype)| (column.to_string(), dtype.to_string()))
                .ok_or_else(|| anyhow!("expected COLUMN=DTYPE, got '{}'", pair))
        })
        .collect()
}

fn parse_ids(ids: Option<&str>) -> Result<Option<VertexEdgeId>> {
    match ids {
        Some(text) => {
            let value: serde_json::Value = serde_json::from_str(text)
                .with_context(|| format!("--ids is not valid JSON: '{}'", text))?;
            Ok(Some(VertexEdgeId::from_json(&value, "ids")?))
        }
        None => Ok(None),
    }
}

fn csv_source(path: &str, inline: bool) -> Result<CsvSource> {
    if inline {
        let content =
            std::fs::read(path).with_context(|| format!("failed to read '{}'", path))?;
        Ok(CsvSource::Content(content))
    } else {
        Ok(CsvSource::Path(path.to_string()))
    }
}

async fn cmd_bench(client: &GraphRpcClient, graph_id: GraphId, ops: usize) -> Result<()> {
    use std::time::Instant;

    println!("Running benchmark: {} ops against graph {}", ops, graph_id);

    // Graph info benchmark
    let start = Instant::now();
    for _ in 0..ops {
        let _ = client.graph_info(graph_id, &[]).await?;
    }
    let info_duration = start.elapsed();
    println!(
        "INFO: {} ops in {:.2}s = {:.0} ops/sec",
        ops,
        info_duration.as_secs_f64(),
        ops as f64 / info_duration.as_secs_f64()
    );

    // Vertex data benchmark
    let start = Instant::now();
    for _ in 0..ops {
        let _ = client.vertex_data(graph_id, None, &[], &[]).await?;
    }
    let data_duration = start.elapsed();
    println!(
        "VERTEX DATA: {} ops in {:.2}s = {:.0} ops/sec",
        ops,
        data_duration.as_secs_f64(),
        ops as f64 / data_duration.as_secs_f64()
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let client = GraphRpcClient::new(ClientConfig {
        server_addr: args.server_addr.clone(),
    });
    client.connect().await?;

    match &args.command {
        Commands::Uptime => {
            println!("{}", client.uptime().await?);
        }
        Commands::CreateGraph => {
            println!("{}", client.create_graph().await?);
        }
        Commands::DeleteGraph { graph_id } => {
            if client.delete_graph(*graph_id).await? {
                println!("Deleted");
            } else {
                println!("Graph not found");
            }
        }
        Commands::ListGraphs => {
            for graph_id in client.graph_ids().await? {
                println!("{}", graph_id);
            }
        }
        Commands::Info { graph_id } => {
            let info = client.graph_info(*graph_id, &[]).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Schema { graph_id } => {
            let schema = client.graph_schema(*graph_id).await?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::LoadVertices {
            path,
            graph_id,
            vertex_col,
            type_name,
            dtypes,
            delimiter,
            inline,
        } => {
            let options = CsvLoadOptions {
                dtypes: parse_dtypes(dtypes)?,
                has_header: true,
                delimiter: *delimiter,
            };
            let rows = client
                .load_csv_as_vertex_data(
                    *graph_id,
                    csv_source(path, *inline)?,
                    &options,
                    vertex_col,
                    type_name,
                )
                .await?;
            println!("Loaded {} vertex rows", rows);
        }
        Commands::LoadEdges {
            path,
            graph_id,
            src_col,
            dst_col,
            type_name,
            dtypes,
            delimiter,
            inline,
        } => {
            let options = CsvLoadOptions {
                dtypes: parse_dtypes(dtypes)?,
                has_header: true,
                delimiter: *delimiter,
            };
            let rows = client
                .load_csv_as_edge_data(
                    *graph_id,
                    csv_source(path, *inline)?,
                    &options,
                    src_col,
                    dst_col,
                    type_name,
                )
                .await?;
            println!("Loaded {} edge rows", rows);
        }
        Commands::VertexData {
            graph_id,
            ids,
            types,
            columns,
        } => {
            let types: Vec<&str> = types.iter().map(String::as_str).collect();
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let rows = client
                .vertex_data(*graph_id, parse_ids(ids.as_deref())?, &types, &columns)
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::EdgeData {
            graph_id,
            ids,
            types,
            columns,
        } => {
            let types: Vec<&str> = types.iter().map(String::as_str).collect();
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let rows = client
                .edge_data(*graph_id, parse_ids(ids.as_deref())?, &types, &columns)
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::NumVertices {
            graph_id,
            type_name,
            include_edge_data,
        } => {
            let count = client
                .num_vertices(*graph_id, type_name.as_deref(), *include_edge_data)
                .await?;
            println!("{}", count);
        }
        Commands::NumEdges {
            graph_id,
            type_name,
        } => {
            println!("{}", client.num_edges(*graph_id, type_name.as_deref()).await?);
        }
        Commands::Bench { graph_id, ops } => {
            cmd_bench(&client, *graph_id, *ops).await?;
        }
    }

    Ok(())
}
