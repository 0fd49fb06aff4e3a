//! Thin wrapper over the `docker` CLI used by the docker runtime.

pub mod client;
pub mod error;

pub use client::DockerClient;
pub use error::DockerError;

/// Container name for a service: `devloop-<sanitized name>`.
pub fn container_name(service_name: &str) -> String {
    format!("devloop-{}", sanitize_container_name_component(service_name))
}

/// Sanitize a string for use in Docker container names.
///
/// Docker container names must match `[a-zA-Z0-9][a-zA-Z0-9_.-]*`. Invalid
/// characters become underscores and the result is capped at 32 characters.
pub(crate) fn sanitize_container_name_component(input: &str) -> String {
    const MAX_COMPONENT_LEN: usize = 32;

    // Every char is ASCII after this map, so byte slicing below is safe.
    let sanitized: String = input
        .chars()
        .take(MAX_COMPONENT_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
