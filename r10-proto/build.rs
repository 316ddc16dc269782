fn main() {
    println!("cargo:rerun-if-changed=proto/r10.proto");
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());
    prost_build::compile_protos(&["proto/r10.proto"], &["proto/"])
        .expect("failed to compile r10.proto");
}
