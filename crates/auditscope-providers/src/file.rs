//! JSON file data provider.
//!
//! Each event is written to its own file in a directory. The file name is
//! the event id, so a replace overwrites the file an earlier insert created.
//! File names embed a v7 UUID, so listing them by name is chronological to
//! the millisecond.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use auditscope_core::{AuditDataProvider, AuditEvent, Cancellation, EventId, ProviderError};
use tracing::{debug, warn};
use uuid::Uuid;

const EXTENSION: &str = "json";

/// Configuration for a [`FileDataProvider`].
#[derive(Debug, Clone)]
pub struct FileProviderConfig {
    /// Directory events are written to. Created on first insert.
    pub directory: PathBuf,
    /// Write indented JSON.
    pub pretty: bool,
    /// Prefix prepended to every file name.
    pub prefix: String,
}

impl FileProviderConfig {
    /// Creates a configuration writing pretty JSON to `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            pretty: true,
            prefix: String::new(),
        }
    }

    /// Sets whether JSON is indented.
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// Stores one JSON document per event in a directory.
#[derive(Debug, Clone)]
pub struct FileDataProvider {
    config: FileProviderConfig,
}

impl FileDataProvider {
    /// Creates a provider from a configuration.
    #[must_use]
    pub const fn new(config: FileProviderConfig) -> Self {
        Self { config }
    }

    /// Creates a provider writing pretty JSON to `directory`.
    #[must_use]
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self::new(FileProviderConfig::new(directory))
    }

    /// Returns the directory events are written to.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Returns every stored event, ordered by file name.
    ///
    /// A missing directory yields an empty list. Files that cannot be read or
    /// do not contain an event are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory itself cannot be read.
    pub fn list(&self) -> Result<Vec<(EventId, AuditEvent)>, ProviderError> {
        let entries = match std::fs::read_dir(&self.config.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .filter_map(|name| match self.read_file(&name) {
                Ok(event) => Some((EventId::String(name), event)),
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping unreadable audit event file");
                    None
                }
            })
            .collect())
    }

    fn read_file(&self, name: &str) -> Result<AuditEvent, ProviderError> {
        let contents = std::fs::read_to_string(self.config.directory.join(name))?;
        Ok(AuditEvent::from_json(&contents)?)
    }

    fn new_file_name(&self) -> String {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        format!("{}{id}.{EXTENSION}", self.config.prefix)
    }

    /// Resolves an id to a path inside the directory.
    ///
    /// Ids that are not plain file names are treated as unknown.
    fn path_for(&self, id: &EventId) -> Result<PathBuf, ProviderError> {
        let EventId::String(name) = id else {
            return Err(ProviderError::NotFound { id: id.to_string() });
        };
        let is_plain = Path::new(name)
            .file_name()
            .is_some_and(|file_name| file_name == name.as_str());
        if !is_plain {
            return Err(ProviderError::NotFound { id: name.clone() });
        }
        Ok(self.config.directory.join(name))
    }

    fn render(&self, event: &AuditEvent) -> Result<String, ProviderError> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(event)?
        } else {
            serde_json::to_string(event)?
        };
        Ok(json)
    }
}

#[async_trait]
impl AuditDataProvider for FileDataProvider {
    fn name(&self) -> &'static str {
        "file"
    }

    fn insert_event(&self, event: &AuditEvent) -> Result<EventId, ProviderError> {
        std::fs::create_dir_all(&self.config.directory)?;
        let name = self.new_file_name();
        std::fs::write(self.config.directory.join(&name), self.render(event)?)?;
        debug!(file = %name, event_type = event.event_type(), "Wrote audit event file");
        Ok(EventId::String(name))
    }

    fn replace_event(&self, id: &EventId, event: &AuditEvent) -> Result<(), ProviderError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(ProviderError::NotFound { id: id.to_string() });
        }
        std::fs::write(path, self.render(event)?)?;
        Ok(())
    }

    fn get_event(&self, id: &EventId) -> Result<Option<AuditEvent>, ProviderError> {
        let path = match self.path_for(id) {
            Ok(path) => path,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(AuditEvent::from_json(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_event_async(
        &self,
        event: &AuditEvent,
        cancel: &Cancellation,
    ) -> Result<EventId, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let json = self.render(event)?;
        tokio::fs::create_dir_all(&self.config.directory).await?;

        let name = self.new_file_name();
        tokio::fs::write(self.config.directory.join(&name), json).await?;
        debug!(file = %name, event_type = event.event_type(), "Wrote audit event file");
        Ok(EventId::String(name))
    }

    async fn replace_event_async(
        &self,
        id: &EventId,
        event: &AuditEvent,
        cancel: &Cancellation,
    ) -> Result<(), ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let path = self.path_for(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(ProviderError::NotFound { id: id.to_string() });
        }
        tokio::fs::write(path, self.render(event)?).await?;
        Ok(())
    }

    async fn get_event_async(
        &self,
        id: &EventId,
        cancel: &Cancellation,
    ) -> Result<Option<AuditEvent>, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let path = match self.path_for(id) {
            Ok(path) => path,
            Err(ProviderError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(AuditEvent::from_json(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
