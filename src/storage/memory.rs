//! In-process store, shared by every handle to the same instance.

use super::Store;
use crate::{Result, WebSessionError};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    unsupported: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, like disabled browser storage
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.unsupported {
            return Err(WebSessionError::storage(name, "storage is not supported"));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>> {
        self.check(name)?;
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.check(name)?;
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.check(name)?;
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.remove(name);
        Ok(())
    }
}
