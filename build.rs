fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Ensure a protoc binary is available even when the system package is not
    // installed, by falling back to the vendored one.
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    tonic_build::compile_protos("proto/graph_rpc.proto")?;
    Ok(())
}
