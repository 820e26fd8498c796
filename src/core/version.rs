//! Build metadata accessors.
//! Includes the generated version.rs from the build script so the CLI and the
//! configuration loader share a single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Schema version accepted in route configuration files.
/// Falls back to 1 if the generated value cannot be parsed.
pub fn config_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION.parse().unwrap_or(1)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Long version string shown by `seqroute --version`
pub fn long_version() -> String {
    format!(
        "{} (built {}, commit {}, config schema {})",
        env!("CARGO_PKG_VERSION"),
        build_time(),
        git_hash(),
        config_schema_version()
    )
}
