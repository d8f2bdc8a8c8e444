use crate::core::app_config::AppConfig;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tauri::{AppHandle, Manager, Runtime};

const LOG_FILE_NAME: &str = "app.log.jsonl";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const MAX_ROTATIONS: usize = 3;

// One writer at a time across every `AppLog` clone, including the panic hook.
static LOG_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLogRecord {
    pub ts_ms: i64,
    pub level: String,
    pub scope: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-lines application log with size-based rotation.
///
/// Logging never fails the caller: write errors fall back to stderr.
#[derive(Debug, Clone)]
pub struct AppLog {
    dir: PathBuf,
}

impl AppLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Logs go under `base`, suffixed like the data dir in development.
    pub fn in_dir(base: &Path, config: &AppConfig) -> Self {
        Self::new(config.data_dir(base))
    }

    pub fn for_app<R: Runtime>(app: &AppHandle<R>, config: &AppConfig) -> Result<Self, String> {
        let dir = app
            .path()
            .app_log_dir()
            .map_err(|e| format!("Failed to resolve log dir: {}", e))?;
        Ok(Self::in_dir(&dir, config))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("app.log.{}.jsonl", index))
    }

    fn rotate_if_needed(&self) -> io::Result<()> {
        let path = self.path();
        let Ok(meta) = fs::metadata(&path) else {
            return Ok(());
        };
        if meta.len() < MAX_LOG_BYTES {
            return Ok(());
        }

        let oldest = self.rotated_path(MAX_ROTATIONS);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for i in (1..MAX_ROTATIONS).rev() {
            let src = self.rotated_path(i);
            if src.exists() {
                fs::rename(&src, self.rotated_path(i + 1))?;
            }
        }
        fs::rename(&path, self.rotated_path(1))
    }

    pub fn append(&self, record: &AppLogRecord) -> io::Result<()> {
        let _guard = LOG_LOCK.lock();
        fs::create_dir_all(&self.dir)?;
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        let mut line = serde_json::to_vec(record).map_err(io::Error::other)?;
        line.push(b'\n');
        file.write_all(&line)
    }

    pub fn record(&self, level: &str, scope: &str, message: &str, data: Option<Value>) {
        let record = AppLogRecord {
            ts_ms: Utc::now().timestamp_millis(),
            level: level.to_string(),
            scope: scope.to_string(),
            message: message.to_string(),
            data,
        };
        if let Err(e) = self.append(&record) {
            eprintln!("[{}] {}: {} (log write failed: {})", level, scope, message, e);
        }
    }

    pub fn info(&self, scope: &str, message: &str) {
        self.record("info", scope, message, None);
    }

    pub fn warn(&self, scope: &str, message: &str, data: Option<Value>) {
        self.record("warn", scope, message, data);
    }

    pub fn error(&self, scope: &str, message: &str, data: Option<Value>) {
        self.record("error", scope, message, data);
    }

    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let prev = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "panic".to_string()
            };
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());

            log.error("panic", &format!("{} ({})", payload, location), None);
            prev(info);
        }));
    }
}
