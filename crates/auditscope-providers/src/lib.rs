//! Data providers for auditscope.
//!
//! Every provider implements [`AuditDataProvider`](auditscope_core::AuditDataProvider)
//! and can be installed as the default in an
//! [`AuditConfig`](auditscope_core::AuditConfig) or passed per scope through
//! [`AuditScopeOptions`](auditscope_core::AuditScopeOptions).
//!
//! - [`InMemoryDataProvider`] - keeps events in memory, readable back
//! - [`NullDataProvider`] - accepts everything, stores nothing
//! - [`FileDataProvider`] - one JSON file per event in a directory
//! - [`TracingDataProvider`] - emits events as tracing records
//! - [`DynamicDataProvider`] - delegates to closures
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use auditscope_core::{AuditConfig, AuditScopeFactory, AuditScopeOptions, DefaultScopeFactory};
//! use auditscope_providers::InMemoryDataProvider;
//!
//! let provider = Arc::new(InMemoryDataProvider::new());
//! let config = AuditConfig::builder().data_provider(provider.clone()).build();
//! let factory = DefaultScopeFactory::new(Arc::new(config));
//!
//! let mut scope = factory.create(&AuditScopeOptions::new("Login"))?;
//! scope.dispose()?;
//!
//! assert_eq!(provider.events().len(), 1);
//! # Ok::<(), auditscope_core::AuditError>(())
//! ```

mod dynamic;
mod file;
mod memory;
mod null;
mod trace;

pub use dynamic::{DynamicDataProvider, DynamicDataProviderBuilder};
pub use file::{FileDataProvider, FileProviderConfig};
pub use memory::InMemoryDataProvider;
pub use null::NullDataProvider;
pub use trace::TracingDataProvider;
