//! Logging setup for the `piece-match` binaries.
//!
//! Records from the `piece_match*` crates pass at the requested level; other
//! crates are held to `warn` so decoder chatter does not drown per-frame
//! diagnostics. Stderr lines read `[  1.234s  INFO detect] message`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const CRATE_PREFIX: &str = "piece_match";

/// Environment variable read by [`init_tracing`] before `RUST_LOG`.
pub const LOG_ENV: &str = "PIECE_MATCH_LOG";

/// `tracing` directives used when neither variable is set.
#[cfg(feature = "tracing")]
const DEFAULT_DIRECTIVES: &str = "warn,piece_match=info,piece_match_core=info,\
                                  piece_match_reference=info,piece_match_detect=info";

/// Short name of a `piece_match*` target (`"detect"` for
/// `piece_match_detect::pipeline`, `"piece_match"` for the facade), or `None`
/// for other crates.
fn own_component(target: &str) -> Option<&str> {
    let krate = target.split("::").next().unwrap_or(target);
    match krate.strip_prefix(CRATE_PREFIX)? {
        "" => Some(CRATE_PREFIX),
        rest => rest.strip_prefix('_'),
    }
}

struct ElapsedLogger {
    level: LevelFilter,
    started: Instant,
}

impl ElapsedLogger {
    fn passes(&self, level: Level, target: &str) -> bool {
        let cap = if own_component(target).is_some() {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        };
        level <= cap
    }
}

impl Log for ElapsedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.passes(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = record.target();
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{:8.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            own_component(target).unwrap_or(target),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<ElapsedLogger> = OnceLock::new();

/// Install the stderr logger at `level`. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| ElapsedLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber.
///
/// Filters come from [`LOG_ENV`], then `RUST_LOG`, then the crate defaults.
/// Closing spans of the instrumented extraction and matching entry points
/// report their busy time; `json` switches to one flattened object per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_target(false)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_targets_are_shortened() {
        assert_eq!(own_component("piece_match_detect::pipeline"), Some("detect"));
        assert_eq!(own_component("piece_match_reference"), Some("reference"));
        assert_eq!(own_component("piece_match::io"), Some("piece_match"));
        assert_eq!(own_component("image::codecs::png"), None);
        assert_eq!(own_component("piece_matcher"), None);
    }

    #[test]
    fn foreign_crates_are_held_to_warn() {
        let logger = ElapsedLogger {
            level: LevelFilter::Debug,
            started: Instant::now(),
        };
        assert!(logger.passes(Level::Debug, "piece_match_detect::pipeline"));
        assert!(!logger.passes(Level::Trace, "piece_match_detect::pipeline"));
        assert!(!logger.passes(Level::Info, "image::codecs::png"));
        assert!(logger.passes(Level::Warn, "image::codecs::png"));
    }
}
