//! Logging setup and structured diagnostics.
//!
//! The library itself only talks to the `log` facade. Applications that want
//! to see the plan derivation and group boundaries call
//! `enable_verbose_logging` once, or install any other `log` backend.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::TupleError;

/// Logs a structured key-value metric at debug level under the
/// `tuplegroup::metric` target.
///
/// # Example
/// ```
/// use tuplegroup::log_metric;
/// let groups = 4;
/// log_metric!("event" = "grouping_finished", "groups" = &groups);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::__log::log_enabled!(target: "tuplegroup::metric", $crate::__log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::__log::debug!(target: "tuplegroup::metric", "{{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` at `Debug` level printing `[LEVEL] message` lines,
/// to stderr or appended to `log_file`. Only the first call has any effect.
pub fn enable_verbose_logging(log_file: Option<&Path>) -> Result<(), TupleError> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Debug);
        builder.format(|buf, record| {
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
