use mirror_core::OriginOverrides;
use mirror_origin::to_absolute_url;
use mirror_storage::keys::{infer_extension, mirror_storage_key};

/// Storage key a source would be mirrored to.
///
/// Relative sources are resolved against `base_url` first, as the mirror does.
pub fn storage_key_for(
    prefix: &str,
    record_id: &str,
    field: &str,
    source: &str,
    base_url: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let source_url = to_absolute_url(base_url.unwrap_or_default().trim_end_matches('/'), source);
    let extension = infer_extension(&source_url, content_type);
    mirror_storage_key(prefix, record_id, field, &source_url, &extension)
}

/// Per-invocation origin overrides from command-line flags.
pub fn overrides(base_url: Option<String>, api_key: Option<String>) -> OriginOverrides {
    OriginOverrides { base_url, api_key }
}

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
