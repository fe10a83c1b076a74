//! Version command

/// Name and version of this binary
#[must_use]
pub fn version_info() -> String {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    tracing::debug!(package_name = name, package_version = version, "version requested");
    format!("{name} {version}")
}
