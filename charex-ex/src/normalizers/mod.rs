//! Source normalizers
//!
//! One [`SourceNormalizer`] per origin site:
//! - **transcript** - JanitorAI chat request bodies (role-tagged messages)
//! - **page** - SakuraFM character pages fetched over HTTP
//!
//! The [`NormalizerRegistry`] maps live-channel job types and CLI short names
//! to normalizers. Adding a source means adding an implementation and
//! registering it; callers never match on source names.

pub mod page;
pub mod transcript;

pub use page::PageNormalizer;
pub use transcript::TranscriptNormalizer;

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::types::SourceNormalizer;

/// Lookup table of available normalizers
#[derive(Clone, Default)]
pub struct NormalizerRegistry {
    normalizers: Vec<Arc<dyn SourceNormalizer>>,
}

impl NormalizerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in source
    ///
    /// `fetch_timeout` bounds each HTTP request made by page sources.
    pub fn standard(fetch_timeout: Duration) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(PageNormalizer::new(fetch_timeout)?));
        registry.register(Arc::new(TranscriptNormalizer::new()));
        Ok(registry)
    }

    /// Add a normalizer; a later registration shadows an earlier one with
    /// the same job type or short name
    pub fn register(&mut self, normalizer: Arc<dyn SourceNormalizer>) {
        debug!(
            label = normalizer.label(),
            job_type = normalizer.job_type(),
            "Registered source normalizer"
        );
        self.normalizers.insert(0, normalizer);
    }

    /// Normalizer selected by a live-channel `type` tag
    pub fn by_job_type(&self, job_type: &str) -> Option<Arc<dyn SourceNormalizer>> {
        self.normalizers
            .iter()
            .find(|n| n.job_type() == job_type)
            .cloned()
    }

    /// Normalizer selected by a CLI short name
    pub fn by_short_name(&self, short_name: &str) -> Option<Arc<dyn SourceNormalizer>> {
        self.normalizers
            .iter()
            .find(|n| n.short_name() == short_name)
            .cloned()
    }

    /// Source labels of all registered normalizers
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<_> = self.normalizers.iter().map(|n| n.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Short names of all registered normalizers, for help text
    pub fn short_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.normalizers.iter().map(|n| n.short_name()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }
}

// ============================================================================
// Mock Normalizer for Testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::error::ExtractionError;
    use crate::types::Extraction;
    use async_trait::async_trait;
    use charex_common::{Card, CardData};

    /// Mock normalizer producing a card named after its input
    pub struct MockNormalizer {
        pub label: &'static str,
        pub job_type: &'static str,
        pub short_name: &'static str,
        pub should_fail: bool,
    }

    impl MockNormalizer {
        pub fn new(label: &'static str, job_type: &'static str, short_name: &'static str) -> Self {
            Self {
                label,
                job_type,
                short_name,
                should_fail: false,
            }
        }
    }

    #[async_trait]
    impl SourceNormalizer for MockNormalizer {
        fn label(&self) -> &'static str {
            self.label
        }

        fn job_type(&self) -> &'static str {
            self.job_type
        }

        fn short_name(&self) -> &'static str {
            self.short_name
        }

        async fn extract(&self, input: &[u8]) -> Result<Extraction> {
            if self.should_fail {
                return Err(ExtractionError::Input("Mock failure".to_string()));
            }
            let card = Card::new(CardData {
                name: String::from_utf8_lossy(input).into_owned(),
                ..Default::default()
            });
            Ok(Extraction {
                card,
                raw: input.to_vec(),
                avatar: None,
            })
        }
    }
}
