use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tauri::WebviewUrl;

pub const ENV_VAR: &str = "APP_ENV";
pub const DEFAULT_DEV_PORT: u16 = 8888;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Startup configuration, resolved once and passed down explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppConfig {
    pub mode: RunMode,
    /// Port of the local UI dev server. Unused in production.
    pub dev_port: u16,
}

impl AppConfig {
    pub fn from_process() -> Self {
        let env = std::env::var(ENV_VAR).ok();
        let port_arg = std::env::args().nth(1);
        Self::resolve(env.as_deref(), port_arg.as_deref(), tauri::is_dev())
    }

    /// `env` wins when it names a mode; otherwise `fallback_dev` (normally
    /// `tauri::is_dev()`) decides. An unparsable port falls back to the default.
    pub fn resolve(env: Option<&str>, port_arg: Option<&str>, fallback_dev: bool) -> Self {
        let mode = env.and_then(RunMode::parse).unwrap_or(if fallback_dev {
            RunMode::Development
        } else {
            RunMode::Production
        });
        let dev_port = port_arg
            .and_then(|p| p.trim().parse::<u16>().ok())
            .filter(|p| *p != 0)
            .unwrap_or(DEFAULT_DEV_PORT);

        Self { mode, dev_port }
    }

    pub fn is_production(&self) -> bool {
        self.mode == RunMode::Production
    }

    pub fn dev_server_url(&self) -> String {
        format!("http://localhost:{}/", self.dev_port)
    }

    pub fn content_url(&self) -> Result<WebviewUrl, String> {
        if self.is_production() {
            return Ok(WebviewUrl::App(PathBuf::from("index.html")));
        }
        let url = self
            .dev_server_url()
            .parse::<tauri::Url>()
            .map_err(|e| format!("Invalid dev server url: {}", e))?;
        Ok(WebviewUrl::External(url))
    }

    /// Development runs keep their state next to, not inside, the real data dir.
    pub fn data_dir(&self, base: &Path) -> PathBuf {
        if self.is_production() {
            return base.to_path_buf();
        }
        let mut name = base
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("data"));
        name.push(" (development)");
        base.with_file_name(name)
    }
}
