//! Document store trait definition.
//!
//! This module defines the common interface for desired-state document
//! storage.

use async_trait::async_trait;
use serde_yaml::Value;

use crate::error::Result;
use crate::models::DesiredState;

/// Trait for desired-state document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the raw document.
    ///
    /// A missing or empty document loads as an empty mapping.
    async fn load(&self) -> Result<Value>;

    /// Saves a desired state, replacing the document.
    async fn save(&self, state: &DesiredState) -> Result<()>;

    /// Checks if the document exists.
    async fn exists(&self) -> Result<bool>;

    /// Describes where the document lives.
    fn location(&self) -> String;
}

#[async_trait]
impl DocumentStore for Box<dyn DocumentStore> {
    async fn load(&self) -> Result<Value> {
        (**self).load().await
    }

    async fn save(&self, state: &DesiredState) -> Result<()> {
        (**self).save(state).await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
