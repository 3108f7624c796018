use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds and tests never link against cortex-m-rt
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return;
    }

    // link.x from cortex-m-rt INCLUDEs memory.x from the search path
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR set by cargo"));
    fs::copy("memory.x", out_dir.join("memory.x")).expect("memory.x at the crate root");
    println!("cargo:rustc-link-search={}", out_dir.display());
}
