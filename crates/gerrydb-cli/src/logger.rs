use tracing_subscriber::EnvFilter;

/// Selects the log filter, e.g. `gerrydb=debug`.
pub const GERRYDB_LOG_VAR: &str = "GERRYDB_LOG";
/// Switches the default filter to `debug` when set.
pub const GERRYDB_DEBUG_VAR: &str = "GERRYDB_DEBUG";

/// The filter used when `GERRYDB_LOG` is unset or invalid.
fn default_directive() -> &'static str {
    if std::env::var_os(GERRYDB_DEBUG_VAR).is_some() {
        "debug"
    } else {
        "warn"
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(GERRYDB_LOG_VAR)
        .or_else(|_| EnvFilter::try_new(default_directive()))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr so command output on stdout stays clean.
pub fn init_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn debug_switches_the_default() {
        temp_env::with_vars(
            [(GERRYDB_LOG_VAR, None), (GERRYDB_DEBUG_VAR, Some("1"))],
            || assert_eq!(env_filter().to_string(), "debug"),
        );
        temp_env::with_vars([(GERRYDB_LOG_VAR, None::<&str>), (GERRYDB_DEBUG_VAR, None)], || {
            assert_eq!(env_filter().to_string(), "warn")
        });
    }

    #[test]
    fn explicit_filter_wins() {
        temp_env::with_vars(
            [
                (GERRYDB_LOG_VAR, Some("gerrydb=trace")),
                (GERRYDB_DEBUG_VAR, Some("1")),
            ],
            || assert_eq!(env_filter().to_string(), "gerrydb=trace"),
        );
    }
}
