// Keeps the C-ABI exports visible in the Windows DLL
use std::env;

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        let target = env::var("TARGET").unwrap_or_default();
        if target.contains("gnu") {
            println!("cargo:rustc-cdylib-link-arg=-Wl,--export-all-symbols");
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
