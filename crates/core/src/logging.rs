//! Logging initialization.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `PolgenConfig`. Supports JSON structured logging and
//! human-readable pretty format.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::GeneralConfig;
use crate::error::PolgenError;

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process. `RUST_LOG` takes precedence
/// over `config.log_level`.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable output (default)
pub fn init_tracing(config: &GeneralConfig) -> Result<(), PolgenError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| {
                    PolgenError::Logging(format!(
                        "failed to initialize JSON tracing subscriber: {e}"
                    ))
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    PolgenError::Logging(format!(
                        "failed to initialize pretty tracing subscriber: {e}"
                    ))
                })?;
        }
        other => {
            return Err(PolgenError::Logging(format!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn second_init_fails() {
        let config = GeneralConfig::default();
        // 다른 테스트가 먼저 설치했을 수 있으므로 첫 결과는 확인하지 않습니다.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
