//! Whole-file JSON documents on disk.
//!
//! # Responsibility
//! - Load one JSON document per entity type; a missing file is empty.
//! - Save by writing a sibling temp file and renaming it over the target.
//!
//! # Invariants
//! - A failed save never leaves a half-written target file.
//! - Malformed JSON surfaces as `StoreError::Json`, never as empty data.

use crate::logging::{sanitize_message, MAX_LOGGED_ERROR_CHARS};
use crate::model::validation::ValidationError;
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Validation(ValidationError),
    NotFound(String),
    Duplicate(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error on {}: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "malformed JSON in {}: {source}", path.display())
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Duplicate(what) => write!(f, "already exists: {what}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::Duplicate(_) => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Json { .. } => "json",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
        }
    }
}

/// One JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Typed load; missing file yields `T::default()`.
    pub fn load<T: DeserializeOwned + Default>(&self) -> StoreResult<T> {
        match self.read_text()? {
            Some(text) => self.decode(&text),
            None => Ok(T::default()),
        }
    }

    /// Untyped load for migration and integrity scans.
    pub fn load_value(&self) -> StoreResult<Option<serde_json::Value>> {
        match self.read_text()? {
            Some(text) => self.decode(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Pretty-prints `value` to a temp file, then renames it into place.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<()> {
        let mut body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        body.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }
        let temp_path = self.temp_path();
        let written = fs::File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&body)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            error!(
                "event=store_save module=repo status=error file={} error_code=io error={}",
                self.file_name(),
                sanitize_message(&source.to_string(), MAX_LOGGED_ERROR_CHARS)
            );
            return Err(self.io_error(source));
        }
        debug!(
            "event=store_save module=repo status=ok file={} bytes={}",
            self.file_name(),
            body.len()
        );
        Ok(())
    }

    fn read_text(&self) -> StoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> StoreResult<T> {
        serde_json::from_str(text).map_err(|source| {
            error!(
                "event=store_load module=repo status=error file={} error_code=json line={} column={}",
                self.file_name(),
                source.line(),
                source.column()
            );
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
