use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Schema version used when Cargo.toml carries no usable metadata
const DEFAULT_SCHEMA_VERSION: i64 = 1;

fn main() {
    let out_dir = env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo");
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let manifest = fs::read_to_string(Path::new(&manifest_dir).join("Cargo.toml"))
        .expect("Cargo.toml is readable");

    let generated = format!(
        "pub const CONFIG_SCHEMA_VERSION: &str = \"{}\";\n\
         pub const BUILD_TIME: &str = \"{}\";\n\
         pub const GIT_HASH: &str = \"{}\";\n",
        config_schema_version(&manifest),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        git_hash(),
    );
    fs::write(Path::new(&out_dir).join("version.rs"), generated)
        .expect("version.rs is writable");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// `[package.metadata] config_schema_version` from the manifest
fn config_schema_version(manifest: &str) -> i64 {
    manifest
        .parse::<toml::Table>()
        .ok()
        .and_then(|table| {
            table
                .get("package")?
                .get("metadata")?
                .get("config_schema_version")?
                .as_integer()
        })
        .unwrap_or(DEFAULT_SCHEMA_VERSION)
}

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
