use crate::models::WindowState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(rename = "window-state", default, skip_serializing_if = "Option::is_none")]
    window_state: Option<WindowState>,
}

/// One JSON file per window name under a single directory.
#[derive(Debug, Clone)]
pub struct DisplayStore {
    dir: PathBuf,
}

impl DisplayStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, window_name: &str) -> io::Result<PathBuf> {
        validate_window_name(window_name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Ok(self.dir.join(format!("window-state-{}.json", window_name)))
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self, window_name: &str) -> io::Result<Option<WindowState>> {
        let path = self.path_for(window_name)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let file: StoreFile = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(file.window_state)
    }

    pub fn save(&self, window_name: &str, state: &WindowState) -> io::Result<()> {
        let file = StoreFile {
            window_state: Some(*state),
        };
        write_atomically(&self.path_for(window_name)?, &file)
    }
}

/// Window names end up in file names and window labels, so only
/// `[A-Za-z0-9_-]` is accepted. Rewriting names would let distinct windows
/// share one record.
pub fn validate_window_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Window name cannot be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("Window name {:?} contains invalid character {:?}", name, c));
    }
    Ok(())
}

fn write_atomically(path: &Path, file: &StoreFile) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    let mut out = fs::File::create(&tmp)?;
    serde_json::to_writer_pretty(&mut out, file).map_err(io::Error::other)?;
    out.write_all(b"\n")?;
    out.sync_all()?;
    drop(out);

    let _ = fs::remove_file(path);
    fs::rename(tmp, path)
}
