use tracing_subscriber::EnvFilter;

/// Default directive applied on top of `RUST_LOG`.
const DEFAULT_DIRECTIVE: &str = "mediaview=info";

/// Install a formatted subscriber for hosts that do not bring their own.
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
