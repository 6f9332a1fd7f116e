//! Logger bootstrap for the binary. Libraries only use the `log` facade.

use anyhow::{Context, Result};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use std::path::Path;

const LOG_FILE_BASENAME: &str = "predictor";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

/// Start logging to stderr, plus rotating files under `log_dir` when given.
///
/// `RUST_LOG` wins over `level` when set. Keep the returned handle alive for the
/// life of the process.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle> {
    let logger = Logger::try_with_env_or_str(level)
        .with_context(|| format!("invalid log level `{level}`"))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .duplicate_to_stderr(Duplicate::All)
        }
        None => logger.log_to_stderr(),
    };

    logger.start().context("start logger")
}
