//! Logging and observability setup for apprank
//!
//! All crates emit `tracing` events; the binary installs one subscriber at
//! startup through [`init_tracing`].

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and NO_COLOR is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("apprank=debug,warn")
            } else {
                EnvFilter::try_new("apprank=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Logs go to stderr so that
/// command output on stdout stays machine-readable.
///
/// # Arguments
/// * `verbose` - raise apprank crates to `debug` and show span timings
/// * `format` - compact human-readable lines or one JSON object per event
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = default_filter(verbose);
    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events)
                        .with_current_span(true),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_ansi(use_color())
                        .with_span_events(span_events)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering one execution attempt of an experiment.
pub fn experiment_span(experiment_id: i64, name: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "experiment_execution",
        experiment_id = experiment_id,
        experiment = %name,
    )
}

/// Span covering one provider call.
pub fn completion_span(configured_model: &str, feature: &str, repetition: u32) -> tracing::Span {
    span!(
        Level::DEBUG,
        "completion",
        configured_model = %configured_model,
        feature = %feature,
        repetition = repetition,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_can_be_created_without_subscriber() {
        let span = experiment_span(7, "baseline");
        let _guard = span.enter();
        let inner = completion_span("gpt-4o/t0", "search", 1);
        drop(inner);
    }

    #[test]
    fn default_format_is_compact() {
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
