//! Registry Persistence
//!
//! Loads the registry document from disk and writes it back atomically.
//! A missing or blank file is an empty registry; anything else that fails to
//! parse is an error, never an empty registry.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::registry::{Registry, RegistryEntry};

/// Default registry file name
pub const DEFAULT_REGISTRY_FILE: &str = "token_map.json";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize registry: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to write registry {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry destination {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },
}

/// File-backed registry store
#[derive(Debug, Clone)]
pub struct RegistryStore {
    source: PathBuf,
    destination: PathBuf,
}

impl RegistryStore {
    /// Read and write the same file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            source: path.clone(),
            destination: path,
        }
    }

    /// Read from `source`, persist to `destination`
    pub fn with_destination(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Load the registry; absent or blank files yield an empty registry
    pub fn load(&self) -> Result<Registry, RegistryError> {
        if !self.source.exists() {
            tracing::info!("No registry at {}, starting empty", self.source.display());
            return Ok(Registry::default());
        }

        let content = fs::read_to_string(&self.source).map_err(|source| RegistryError::ReadError {
            path: self.source.clone(),
            source,
        })?;

        let registry = parse_registry(&content).map_err(|source| RegistryError::Malformed {
            path: self.source.clone(),
            source,
        })?;

        tracing::info!(
            "Registry loaded: {} entries from {}",
            registry.len(),
            self.source.display()
        );
        Ok(registry)
    }

    /// Check that the destination directory accepts new files
    ///
    /// Creates and drops a temporary file next to the destination, so the
    /// failure surfaces before any network work is done.
    pub fn ensure_writable(&self) -> Result<(), RegistryError> {
        let dir = parent_dir(&self.destination);
        if !dir.is_dir() {
            return Err(RegistryError::NotWritable {
                path: self.destination.clone(),
                reason: format!("directory {} does not exist", dir.display()),
            });
        }

        NamedTempFile::new_in(dir)
            .map(drop)
            .map_err(|e| RegistryError::NotWritable {
                path: self.destination.clone(),
                reason: e.to_string(),
            })
    }

    /// Write the registry atomically: temp file in the same directory, fsync, rename
    pub fn persist(&self, registry: &Registry) -> Result<(), RegistryError> {
        let content = render_registry(registry)?;
        let dir = parent_dir(&self.destination);

        let write_err = |source: std::io::Error| RegistryError::WriteError {
            path: self.destination.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.destination)
            .map_err(|e| write_err(e.error))?;

        tracing::info!(
            "Registry saved: {} entries to {}",
            registry.len(),
            self.destination.display()
        );
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Parse registry JSON; blank input is an empty registry
pub fn parse_registry(content: &str) -> Result<Registry, serde_json::Error> {
    if content.trim().is_empty() {
        return Ok(Registry::default());
    }
    let entries: Vec<RegistryEntry> = serde_json::from_str(content)?;
    Ok(Registry::new(entries))
}

/// Render registry JSON: two-space indent, trailing newline
pub fn render_registry(registry: &Registry) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(registry.entries())?;
    out.push('\n');
    Ok(out)
}
