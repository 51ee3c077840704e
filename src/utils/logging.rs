use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;

use crate::error::Result;

/// Install the global `tracing` subscriber.
///
/// Events go to stderr unless `log_file` is given, in which case they are
/// appended to that file without ANSI colours. Calling this twice is harmless;
/// the first subscriber stays installed.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(())
}
