use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use time::OffsetDateTime;

pub enum LogOutput {
    Stdout,
    Stderr,
}

/// `log` backend writing to a console stream and optionally to a file
pub struct Logger {
    severity: Level,
    output: Option<LogOutput>,
    file: Option<Mutex<File>>,
    enable_colors: bool,
}

impl Logger {
    /// Create a new logger; the file is opened in append mode when a path is given
    pub fn new(
        severity: Level,
        output: Option<LogOutput>,
        file_path: Option<PathBuf>,
        enable_colors: bool,
    ) -> Self {
        let file = file_path.and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()
                .map(Mutex::new)
        });

        Logger { severity, output, file, enable_colors }
    }

    /// Install the logger configured from the environment.
    ///
    /// `GITWIKI_LOG` (then `RUST_LOG`) sets the level, `GITWIKI_LOG_FILE`
    /// names a log file, `NO_COLOR` disables ANSI colors.
    pub fn init() -> Result<(), log::SetLoggerError> {
        let severity = std::env::var("GITWIKI_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::Info);
        let file_path = std::env::var("GITWIKI_LOG_FILE").ok().map(PathBuf::from);
        let enable_colors = std::env::var("NO_COLOR").is_err();

        let logger = Logger::new(severity, Some(LogOutput::Stderr), file_path, enable_colors);
        log::set_max_level(LevelFilter::Trace);
        log::set_logger(Box::leak(Box::new(logger)))
    }

    fn timestamp() -> String {
        let now = OffsetDateTime::now_utc();
        format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
    }

    fn color(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[36m",
            Level::Debug => "\x1b[35m",
            Level::Trace => "\x1b[37m",
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.severity
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Self::timestamp();
        let level = record.level();
        let target = record.target();
        let args = record.args();

        if let Some(output) = &self.output {
            let line = if self.enable_colors {
                format!("{}[{timestamp}] {level}\x1b[0m {target}: {args}\n", Self::color(level))
            } else {
                format!("[{timestamp}] {level} {target}: {args}\n")
            };
            let _ = match output {
                LogOutput::Stdout => std::io::stdout().write_all(line.as_bytes()),
                LogOutput::Stderr => std::io::stderr().write_all(line.as_bytes()),
            };
        }

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "[{timestamp}] {level} {target}: {args}");
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_severity() {
        let logger = Logger::new(Level::Warn, None, None, false);
        assert!(logger.enabled(&Metadata::builder().level(Level::Error).build()));
        assert!(logger.enabled(&Metadata::builder().level(Level::Warn).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Info).build()));
    }

    #[test]
    fn appends_records_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs/wiki.log");
        let logger = Logger::new(Level::Info, None, Some(path.clone()), false);
        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("gitwiki")
                .args(format_args!("hello file"))
                .build(),
        );
        logger.flush();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("INFO gitwiki: hello file"));
    }
}
