/// Default filter when `RUST_LOG` is unset: run and task events from the
/// starlift crates at `info`, everything else at `warn`.
const DEFAULT_DIRECTIVES: &str = "warn,starlift=info,starlift_core=info";

/// Install the global tracing subscriber for starlift binaries and tests.
///
/// `RUST_LOG` wins when set. Safe to call multiple times; initialization
/// errors from `try_init` are quietly ignored.
pub fn init() {
    let env = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_DIRECTIVES.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse_as_a_filter() {
        tracing_subscriber::EnvFilter::try_new(DEFAULT_DIRECTIVES).unwrap();
    }

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init();
    }
}
