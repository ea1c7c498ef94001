//! Map-backed storage for tests and ephemeral runs. Nothing survives `close`.

use std::collections::{HashMap, HashSet};

use log::trace;

use super::{Backend, StorageResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    data: HashMap<String, HashSet<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend {
            data: HashMap::new(),
        }
    }

    /// Get the number of stored keys
    pub fn key_count(&self) -> usize {
        self.data.len()
    }

    /// Get the total number of stored examples
    pub fn example_count(&self) -> usize {
        self.data.values().map(HashSet::len).sum()
    }
}

impl Backend for InMemoryBackend {
    fn create_db_if_needed(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn save(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let was_new = self
            .data
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        trace!("save {}={:?} (new: {})", key, value, was_new);
        Ok(())
    }

    fn fetch(&self, key: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .data
            .get(key)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_semantics_per_key() {
        let mut backend = InMemoryBackend::new();
        backend.save("a", "1").unwrap();
        backend.save("a", "1").unwrap();
        backend.save("a", "2").unwrap();
        backend.save("b", "1").unwrap();

        assert_eq!(backend.key_count(), 2);
        assert_eq!(backend.example_count(), 3);

        let mut values = backend.fetch("a").unwrap();
        values.sort();
        assert_eq!(values, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_fetch_of_unknown_key_is_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.fetch("missing").unwrap().is_empty());
    }
}
