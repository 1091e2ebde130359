//! env_logger setup with an optional per-run log file

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes every record to stderr and to a log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Path of this run's log file inside `dir`
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.log", chrono::Utc::now().timestamp_millis()))
}

/// Initialize logging. `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str, log_dir: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    let mut file_error = None;
    if let Some(dir) = log_dir {
        let path = log_file_path(Path::new(dir));
        match fs::create_dir_all(dir).and_then(|_| File::create(&path)) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            }
            Err(e) => file_error = Some(format!("{}: {}", path.display(), e)),
        }
    }

    builder.init();

    if let Some(e) = file_error {
        log::warn!("Logging: Could not open log file {}, logging to stderr only", e);
    }
}
