use std::num::NonZeroUsize;
use std::sync::Arc;

use corpusql_lib_core::ExecutionError;
use lru::LruCache;
use parking_lot::Mutex;

use crate::context::TextResolver;

/// Process-wide, internally synchronized raw-text cache sitting in
/// front of the relational collaborator. Wraps a `TextResolver` rather
/// than replacing it, so the snippet
/// expander and the condition executors share one cache instance
/// passed by reference — never a global/static.
pub struct RawTextCache<'a> {
    inner: &'a dyn TextResolver,
    cache: Mutex<LruCache<u32, Arc<str>>>,
}

impl<'a> RawTextCache<'a> {
    pub fn new(inner: &'a dyn TextResolver, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, doc_id: u32) -> Result<Arc<str>, ExecutionError> {
        if let Some(text) = self.cache.lock().get(&doc_id) {
            return Ok(text.clone());
        }
        let text = self.inner.fetch_text(doc_id)?;
        self.cache.lock().put(doc_id, text.clone());
        Ok(text)
    }
}

impl<'a> TextResolver for RawTextCache<'a> {
    fn fetch_text(&self, doc_id: u32) -> Result<Arc<str>, ExecutionError> {
        self.get(doc_id)
    }

    fn fetch_sentence_bounds(
        &self,
        doc_id: u32,
        sentence_id: i32,
    ) -> Result<(u32, u32), ExecutionError> {
        self.inner.fetch_sentence_bounds(doc_id, sentence_id)
    }

    fn fetch_metadata(&self, doc_id: u32) -> Result<crate::context::DocMetadata, ExecutionError> {
        self.inner.fetch_metadata(doc_id)
    }

    fn max_sentence_id(&self, doc_id: u32) -> Result<Option<i32>, ExecutionError> {
        self.inner.max_sentence_id(doc_id)
    }
}

/// Key for the snippet cache: a rendered window is fully determined by
/// the anchor document/sentence and the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnippetKey {
    pub doc_id: u32,
    pub sentence_id: i32,
    pub window: u8,
}

/// Caches fully rendered snippet text.
pub struct SnippetCache {
    cache: Mutex<LruCache<SnippetKey, Arc<str>>>,
}

impl SnippetCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: SnippetKey) -> Option<Arc<str>> {
        self.cache.lock().get(&key).cloned()
    }

    pub fn put(&self, key: SnippetKey, text: Arc<str>) {
        self.cache.lock().put(key, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingText {
        calls: AtomicUsize,
        text: &'static str,
    }

    impl TextResolver for CountingText {
        fn fetch_text(&self, _: u32) -> Result<Arc<str>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::from(self.text))
        }
        fn fetch_sentence_bounds(&self, _: u32, _: i32) -> Result<(u32, u32), ExecutionError> {
            Ok((0, 0))
        }
        fn fetch_metadata(&self, _: u32) -> Result<DocMetadata, ExecutionError> {
            Ok(DocMetadata {
                title: String::new(),
                timestamp: String::new(),
            })
        }
        fn max_sentence_id(&self, _: u32) -> Result<Option<i32>, ExecutionError> {
            Ok(None)
        }
    }

    #[test]
    fn repeated_fetch_hits_cache_not_the_resolver() {
        let inner = CountingText {
            calls: AtomicUsize::new(0),
            text: "hello",
        };
        let cache = RawTextCache::new(&inner, NonZeroUsize::new(4).unwrap());
        cache.get(1).unwrap();
        cache.get(1).unwrap();
        cache.get(1).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
