use chrono::Utc;
use env_logger::{Builder, Target, WriteStyle};
use log::LevelFilter;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::errors::{Result, RateHubError};
use crate::util;

type SharedFile = Arc<Mutex<BufWriter<File>>>;

/// 同时写入日志文件与标准输出
#[derive(Clone)]
struct TeeWriter {
    file: SharedFile,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        {
            let mut file = lock(&self.file)?;
            file.write_all(buf)?;
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.file)?.flush()?;
        io::stdout().flush()
    }
}

fn lock(file: &SharedFile) -> io::Result<std::sync::MutexGuard<'_, BufWriter<File>>> {
    file.lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))
}

/// Keeps the log file open for the run; flushes everything when dropped.
pub struct LogGuard {
    file: SharedFile,
}

impl LogGuard {
    pub fn finish(self) {
        // flushing happens in Drop
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        log::logger().flush();
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
        let _ = io::stdout().flush();
    }
}

/// Install the process logger writing to `log_file` and stdout.
///
/// Lines look like `2025-10-09 14:03:11.123 INFO message`, stamped in
/// Taipei time. The default level is `info`; `RUST_LOG` may change it.
pub fn init(log_file: &Path) -> Result<LogGuard> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    let shared: SharedFile = Arc::new(Mutex::new(BufWriter::new(file)));

    let offset = util::taipei_offset()?;
    let logger = Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .write_style(WriteStyle::Never)
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                Utc::now().with_timezone(&offset).format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(TeeWriter { file: shared.clone() })))
        .build();

    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| RateHubError::Unknown(format!("Logger already installed: {}", e)))?;
    log::set_max_level(max_level);

    Ok(LogGuard { file: shared })
}
