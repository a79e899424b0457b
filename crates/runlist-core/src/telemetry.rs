use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { directives: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { directives, .. } => {
                write!(f, "APP_LOG_LEVEL produced an invalid filter '{directives}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` wins when set;
/// otherwise the configured level applies, scoped so batch processing can
/// log verbosely without dragging dependency noise along.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = scoped_directives(&config.log_level);
            EnvFilter::try_new(&directives)
                .map_err(|source| TelemetryError::InvalidFilter { directives, source })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// A bare level ("debug") widens only the runlist crates and leaves
/// everything else at warn; anything containing a directive separator is
/// already a full filter string and passes through untouched.
fn scoped_directives(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains(['=', ',']) {
        raw.to_string()
    } else {
        format!("warn,runlist_core={raw},runlist_api={raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_is_scoped_to_runlist_crates() {
        assert_eq!(
            scoped_directives("debug"),
            "warn,runlist_core=debug,runlist_api=debug"
        );
        assert_eq!(
            scoped_directives("  info "),
            "warn,runlist_core=info,runlist_api=info"
        );
    }

    #[test]
    fn full_directive_strings_pass_through() {
        assert_eq!(scoped_directives("info,hyper=warn"), "info,hyper=warn");
        assert_eq!(scoped_directives("runlist_core=trace"), "runlist_core=trace");
    }

    #[test]
    fn invalid_level_surfaces_the_directives() {
        let directives = scoped_directives("loud");
        let source = EnvFilter::try_new(&directives).expect_err("'loud' is not a level");
        let error = TelemetryError::InvalidFilter {
            directives: directives.clone(),
            source,
        };
        assert!(error.to_string().contains(&directives));
    }
}
