//! Remote property-graph service - Main entry point
//!
//! This crate implements a client/server shim that exposes a property-graph
//! engine over a gRPC control plane.
//!
//! ## Architecture
//!
//! 1. Client connects and probes the server with an uptime request
//! 2. Client loads CSV-backed vertex/edge tables into a server-resident graph
//! 3. Queries and counters come back with property values marshaled into
//!    tagged wire unions
//! 4. The storage backend sits behind the `GraphEngine` trait; the bundled
//!    implementation keeps graphs in process memory
//!
//! ## Usage
//!
//! Start the server:
//! ```bash
//! cargo run --bin graph-server -- --listen-addr [::1]:50051
//! ```
//!
//! Run the client:
//! ```bash
//! cargo run --bin graph-client -- load-vertices data.csv --vertex-col id --type-name users
//! cargo run --bin graph-client -- info
//! ```

fn main() {
    println!("Remote property-graph service");
    println!();
    println!("Use the following binaries:");
    println!("  cargo run --bin graph-server -- --help");
    println!("  cargo run --bin graph-client -- --help");
}
