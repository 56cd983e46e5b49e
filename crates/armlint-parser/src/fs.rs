//! Document sources the inventory reads from

use armlint_core::SpecPath;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ParserError;

/// Where document text comes from. Injected into the inventory so tests can
/// run against in-memory documents.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read(&self, path: &SpecPath) -> Result<String, ParserError>;
}

/// Reads from the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read(&self, path: &SpecPath) -> Result<String, ParserError> {
        if path.is_remote() {
            return Err(ParserError::Read {
                path: path.to_string(),
                message: "remote documents are not readable from the local file system".to_string(),
            });
        }
        debug!("Reading {}", path);
        tokio::fs::read_to_string(path.as_str())
            .await
            .map_err(|e| ParserError::Read {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

/// Documents held in memory, keyed by canonical path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: DashMap<SpecPath, String>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        path: impl AsRef<str>,
        text: impl Into<String>,
    ) -> Result<SpecPath, ParserError> {
        let path = SpecPath::new(path)?;
        self.files.insert(path.clone(), text.into());
        Ok(path)
    }

    /// Builder form of [`insert`](Self::insert) for test setup.
    pub fn with(self, path: impl AsRef<str>, text: impl Into<String>) -> Result<Self, ParserError> {
        self.insert(path, text)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read(&self, path: &SpecPath) -> Result<String, ParserError> {
        self.files
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ParserError::Read {
                path: path.to_string(),
                message: "no such document".to_string(),
            })
    }
}

/// Fetches `http(s)` documents and reads everything else from disk.
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Default)]
pub struct HttpFileSystem {
    client: reqwest::Client,
    local: LocalFileSystem,
}

#[cfg(feature = "remote")]
impl HttpFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            local: LocalFileSystem,
        }
    }
}

#[cfg(feature = "remote")]
#[async_trait]
impl FileSystem for HttpFileSystem {
    async fn read(&self, path: &SpecPath) -> Result<String, ParserError> {
        if !path.is_remote() {
            return self.local.read(path).await;
        }

        debug!("Fetching {}", path);
        let response = self
            .client
            .get(path.as_str())
            .send()
            .await
            .map_err(|e| ParserError::Network(format!("{}: {}", path, e)))?
            .error_for_status()
            .map_err(|e| ParserError::Network(format!("{}: {}", path, e)))?;

        response
            .text()
            .await
            .map_err(|e| ParserError::Network(format!("{}: {}", path, e)))
    }
}
