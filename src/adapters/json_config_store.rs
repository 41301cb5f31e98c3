//! JSON file implementation of the ConfigStore port.
//!
//! Reads take a shared `fs2` lock and writes an exclusive one, so a save
//! never interleaves with a concurrent load of the same file.

use crate::config::default_config;
use crate::domain::AppConfig;
use crate::error::{Error, Result};
use crate::ports::ConfigStore;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<AppConfig> {
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut content = String::new();
        BufReader::new(&file).read_to_string(&mut content)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> AppConfig {
        if !self.path.exists() {
            let defaults = default_config();
            match self.save(&defaults) {
                Ok(()) => info!(path = %self.path.display(), "wrote default configuration"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "could not write default configuration"),
            }
            return defaults;
        }

        match self.read() {
            Ok(config) => config,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "unreadable configuration, using built-in defaults");
                default_config()
            }
        }
    }

    fn save(&self, config: &AppConfig) -> Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Truncate only once the exclusive lock is held.
            #[allow(clippy::suspicious_open_options)]
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .open(&self.path)?;
            file.lock_exclusive()?;
            file.set_len(0)?;
            let mut writer = BufWriter::new(&file);
            writer.write_all(content.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()
        };
        write().map_err(|e| Error::Config(format!("cannot write {}: {}", self.path.display(), e)))
    }
}
