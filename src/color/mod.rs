//! Output-intent colour profiles.
//!
//! The packager needs the raw bytes of one ICC profile per call. Sources hand
//! them out as a shared `Arc<[u8]>`; [`IccProfileFile`] reads its file once,
//! on first use, and serves every later call from memory.

mod icc;

pub use icc::{IccColorSpace, IccProfile};

#[cfg(test)]
pub(crate) use icc::tests::synthetic_profile as icc_fixture;

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors loading or checking an ICC profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read ICC profile {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ICC profile {0} is empty")]
    Empty(String),

    #[error("ICC profile is truncated: {0} bytes, header needs 128")]
    Truncated(usize),

    #[error("ICC profile declares {declared} bytes but has {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("ICC profile lacks the `acsp` signature")]
    MissingSignature,

    #[error("ICC device class `{0}` cannot be used as an output intent")]
    UnsupportedDeviceClass(String),

    #[error("unsupported ICC colour space `{0}`")]
    UnsupportedColorSpace(String),
}

/// Supplies the ICC profile bytes for the output intent.
///
/// Implementations are shared across concurrent packaging calls and must
/// return byte-identical data every time.
pub trait ColorProfileSource: Send + Sync {
    fn profile_bytes(&self) -> Result<Arc<[u8]>, ProfileError>;
}

/// Process-wide profile files, keyed by the path they were requested with.
static SHARED_FILES: Lazy<Mutex<HashMap<PathBuf, Arc<IccProfileFile>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Profile read from a file on first use and cached for the lifetime of the
/// value. A failed read is not cached; the next call tries again.
#[derive(Debug)]
pub struct IccProfileFile {
    path: PathBuf,
    cache: OnceCell<Arc<[u8]>>,
}

impl IccProfileFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    /// The process-wide instance for `path`. Every caller asking for the same
    /// path gets the same cache, so the file is read once per process.
    /// Paths are compared as given, not canonicalized.
    pub fn shared(path: impl Into<PathBuf>) -> Arc<Self> {
        let path = path.into();
        let mut files = SHARED_FILES.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            files
                .entry(path)
                .or_insert_with_key(|path| Arc::new(Self::new(path.clone()))),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been read successfully.
    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}

impl ColorProfileSource for IccProfileFile {
    fn profile_bytes(&self) -> Result<Arc<[u8]>, ProfileError> {
        self.cache
            .get_or_try_init(|| {
                let path = self.path.display().to_string();
                let bytes = std::fs::read(&self.path).map_err(|source| ProfileError::Io {
                    path: path.clone(),
                    source,
                })?;
                if bytes.is_empty() {
                    return Err(ProfileError::Empty(path));
                }
                tracing::debug!(path = %path, size = bytes.len(), "icc_profile_loaded");
                Ok(Arc::from(bytes))
            })
            .cloned()
    }
}

/// Profile bytes already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryProfile(Arc<[u8]>);

impl InMemoryProfile {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }
}

impl ColorProfileSource for InMemoryProfile {
    fn profile_bytes(&self) -> Result<Arc<[u8]>, ProfileError> {
        if self.0.is_empty() {
            return Err(ProfileError::Empty("<memory>".into()));
        }
        Ok(Arc::clone(&self.0))
    }
}

impl<T: ColorProfileSource + ?Sized> ColorProfileSource for Arc<T> {
    fn profile_bytes(&self) -> Result<Arc<[u8]>, ProfileError> {
        (**self).profile_bytes()
    }
}
