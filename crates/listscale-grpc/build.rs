fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/externalscaler.proto");
    // Server only: the generated client would define both the `new`
    // constructor and the `New` RPC as `new`.
    tonic_build::configure()
        .build_client(false)
        .compile_protos(&["proto/externalscaler.proto"], &["proto"])?;
    Ok(())
}
