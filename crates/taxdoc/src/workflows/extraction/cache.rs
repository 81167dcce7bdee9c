use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::domain::{DocumentType, ExtractionRecord};

/// Hex digest used as a cache key. Header keys hash the first 2 KiB of text;
/// content keys hash the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    const HEADER_WINDOW: usize = 2048;

    /// Key for the header-hash classification cache.
    pub fn header(raw_text: &str) -> Self {
        let window = raw_text
            .char_indices()
            .map(|(index, _)| index)
            .find(|&index| index >= Self::HEADER_WINDOW)
            .unwrap_or(raw_text.len());
        Self(hex_digest(&raw_text.as_bytes()[..window]))
    }

    /// Key for the content-hash result cache.
    pub fn content(raw_text: &str) -> Self {
        Self(hex_digest(raw_text.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Memoized header-layout → document-type mapping. Pure optimization: a miss
/// always falls through to full classification, and concurrent writes are
/// last-writer-wins.
pub trait ClassificationCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<(DocumentType, f32)>;
    fn put(&self, key: CacheKey, document_type: DocumentType, confidence: f32);
}

/// Memoized content-hash → finished record mapping.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<ExtractionRecord>;
    fn put(&self, key: CacheKey, record: ExtractionRecord);
}

/// Process-local cache adapter backing both cache traits.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    classifications: Mutex<HashMap<CacheKey, (DocumentType, f32)>>,
    records: Mutex<HashMap<CacheKey, ExtractionRecord>>,
}

impl ClassificationCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<(DocumentType, f32)> {
        let guard = self
            .classifications
            .lock()
            .expect("classification cache mutex poisoned");
        guard.get(key).copied()
    }

    fn put(&self, key: CacheKey, document_type: DocumentType, confidence: f32) {
        let mut guard = self
            .classifications
            .lock()
            .expect("classification cache mutex poisoned");
        guard.insert(key, (document_type, confidence));
    }
}

impl ResultCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<ExtractionRecord> {
        let guard = self.records.lock().expect("result cache mutex poisoned");
        guard.get(key).cloned()
    }

    fn put(&self, key: CacheKey, record: ExtractionRecord) {
        let mut guard = self.records.lock().expect("result cache mutex poisoned");
        guard.insert(key, record);
    }
}

/// Cache that remembers nothing. Keeps tests deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl ClassificationCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<(DocumentType, f32)> {
        None
    }

    fn put(&self, _key: CacheKey, _document_type: DocumentType, _confidence: f32) {}
}

impl ResultCache for NoopCache {
    fn get(&self, _key: &CacheKey) -> Option<ExtractionRecord> {
        None
    }

    fn put(&self, _key: CacheKey, _record: ExtractionRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_keys_ignore_trailing_content() {
        let header = "Form W-2 Wage and Tax Statement\n".repeat(80);
        let mut with_tail = header.clone();
        with_tail.push_str("completely different tail content");

        assert_eq!(CacheKey::header(&header), CacheKey::header(&with_tail));
        assert_ne!(CacheKey::content(&header), CacheKey::content(&with_tail));
    }

    #[test]
    fn header_key_handles_short_documents() {
        let key = CacheKey::header("short");
        assert_eq!(key.as_str().len(), 64);
    }

    #[test]
    fn in_memory_cache_round_trips_classifications() {
        let cache = InMemoryCache::default();
        let key = CacheKey::header("Form W-2");

        assert!(ClassificationCache::get(&cache, &key).is_none());
        ClassificationCache::put(&cache, key.clone(), DocumentType::W2, 0.82);
        assert_eq!(
            ClassificationCache::get(&cache, &key),
            Some((DocumentType::W2, 0.82))
        );
    }
}
