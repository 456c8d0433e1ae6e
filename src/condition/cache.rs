// SPDX-License-Identifier: MIT

//! Shared cache of parsed conditions keyed by condition text

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::ast::Sentence;
use super::error::ConditionError;
use super::parse_condition;

#[derive(Clone)]
pub struct ConditionCache {
    entries: Arc<RwLock<HashMap<String, Arc<Sentence>>>>,
    capacity: usize,
}

impl ConditionCache {
    /// Once `capacity` entries are held, new trees are parsed but not stored
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Return the cached tree for `text`, parsing and storing it on a miss
    pub async fn get_or_parse(&self, text: &str) -> Result<Arc<Sentence>, ConditionError> {
        if let Some(sentence) = self.entries.read().await.get(text) {
            log::debug!("condition cache hit: '{}'", text);
            return Ok(Arc::clone(sentence));
        }

        log::debug!("condition cache miss: '{}'", text);
        let sentence = Arc::new(parse_condition(text)?);

        let mut entries = self.entries.write().await;
        if entries.len() < self.capacity {
            entries
                .entry(text.to_string())
                .or_insert_with(|| Arc::clone(&sentence));
        }
        Ok(sentence)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for ConditionCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_returns_same_tree() {
        let cache = ConditionCache::new(8);

        let first = cache.get_or_parse("a==1 or b==2").await.unwrap();
        let second = cache.get_or_parse("a==1 or b==2").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_parse_errors_not_cached() {
        let cache = ConditionCache::new(8);

        assert!(cache.get_or_parse("a==").await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let cache = ConditionCache::new(1);

        cache.get_or_parse("a==1").await.unwrap();
        let uncached = cache.get_or_parse("b==2").await.unwrap();

        assert_eq!(uncached.identifiers(), vec!["b"]);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clone_shares_entries() {
        let cache = ConditionCache::new(8);
        let cloned = cache.clone();

        cloned.get_or_parse("a==1").await.unwrap();
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cloned.is_empty().await);
    }
}
