//! Retrieval providers and the fan-out executor that drives them.
//!
//! Providers are async and pluggable; the executor handles rate limiting,
//! per-call deadlines, capped retries, and bounded concurrency so the
//! orchestrator only sees a batch of outcomes.

use super::rate_limiter::RateLimiter;
use crate::config::RetrievalConfig;
use crate::error::ProviderError;
use crate::types::{Document, SearchBackend};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A single search backend.
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    fn backend(&self) -> SearchBackend;

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Document>, ProviderError>;
}

/// Outcome of one (term, backend) retrieval call after retries.
#[derive(Debug)]
pub struct RetrievalOutcome {
    pub term: String,
    pub backend: SearchBackend,
    pub result: Result<Vec<Document>, ProviderError>,
}

/// Fan-out executor over a set of providers.
///
/// Within one batch, up to `fan_out` calls run concurrently; batches are
/// separated by a pause. Each call gets the deadline the caller computed
/// (the smaller of the configured timeout and the session's remaining time).
pub struct Retriever {
    providers: Vec<Arc<dyn RetrievalProvider>>,
    limiter: Arc<RateLimiter>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        providers: Vec<Arc<dyn RetrievalProvider>>,
        limiter: Arc<RateLimiter>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            providers,
            limiter,
            config,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Dispatch every term to every provider, bounded by `fan_out`.
    pub async fn search_terms(
        &self,
        terms: &[String],
        per_call_limit: usize,
        deadline: Duration,
    ) -> Vec<RetrievalOutcome> {
        let jobs: Vec<(String, Arc<dyn RetrievalProvider>)> = terms
            .iter()
            .flat_map(|term| {
                self.providers
                    .iter()
                    .map(move |p| (term.clone(), Arc::clone(p)))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(jobs.len());
        let fan_out = self.config.fan_out.max(1);

        for (batch_index, batch) in jobs.chunks(fan_out).enumerate() {
            if batch_index > 0 && self.config.batch_pause_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
            }
            let futures = batch.iter().map(|(term, provider)| {
                self.execute_with_retries(term, Arc::clone(provider), per_call_limit, deadline)
            });
            outcomes.extend(futures::future::join_all(futures).await);
        }
        outcomes
    }

    async fn execute_with_retries(
        &self,
        term: &str,
        provider: Arc<dyn RetrievalProvider>,
        limit: usize,
        deadline: Duration,
    ) -> RetrievalOutcome {
        let backend = provider.backend();
        let mut last_error = ProviderError::EngineFailed {
            engine: backend.to_string(),
            message: "no attempts made".into(),
        };

        for attempt in 0..=self.config.max_retries {
            self.limiter.acquire(backend).await;

            let result = tokio::time::timeout(deadline, provider.search(term, limit)).await;
            match result {
                Ok(Ok(documents)) => {
                    debug!(%backend, term, count = documents.len(), "retrieval succeeded");
                    return RetrievalOutcome {
                        term: term.to_string(),
                        backend,
                        result: Ok(documents),
                    };
                }
                Ok(Err(error)) => {
                    // Auth failures are not transient; retrying cannot help.
                    if matches!(error, ProviderError::AuthFailed { .. }) {
                        return RetrievalOutcome {
                            term: term.to_string(),
                            backend,
                            result: Err(error),
                        };
                    }
                    warn!(%backend, term, attempt, %error, "retrieval attempt failed");
                    last_error = error;
                }
                Err(_) => {
                    let timeout_ms = deadline.as_millis() as u64;
                    warn!(%backend, term, attempt, timeout_ms, "retrieval attempt timed out");
                    last_error = ProviderError::Timeout { timeout_ms };
                }
            }
        }

        RetrievalOutcome {
            term: term.to_string(),
            backend,
            result: Err(last_error),
        }
    }
}

/// In-memory provider serving a fixed corpus, matched by keyword presence.
/// Used in tests and demos; can be configured to fail its first N calls to
/// exercise the retry path.
pub struct StaticRetriever {
    backend: SearchBackend,
    corpus: Vec<Document>,
    failures_remaining: AtomicU32,
}

impl StaticRetriever {
    pub fn new(backend: SearchBackend, corpus: Vec<Document>) -> Self {
        Self {
            backend,
            corpus,
            failures_remaining: AtomicU32::new(0),
        }
    }

    /// Fail the first `n` search calls with a transient engine error.
    pub fn with_failures(self, n: u32) -> Self {
        self.failures_remaining.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl RetrievalProvider for StaticRetriever {
    fn backend(&self) -> SearchBackend {
        self.backend
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Document>, ProviderError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::EngineFailed {
                engine: self.backend.to_string(),
                message: "simulated transient failure".into(),
            });
        }

        let term_lower = term.to_lowercase();
        let words: Vec<&str> = term_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .collect();

        Ok(self
            .corpus
            .iter()
            .filter(|doc| {
                let text = format!("{} {}", doc.title, doc.content).to_lowercase();
                words.iter().any(|w| text.contains(w))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("Prompt caching guide", "Prompt caching reduces latency."),
            Document::new("Bread baking", "Sourdough needs a starter."),
        ]
    }

    fn retriever(provider: Arc<dyn RetrievalProvider>) -> Retriever {
        Retriever::new(
            vec![provider],
            RateLimiter::shared(0),
            RetrievalConfig {
                batch_pause_ms: 0,
                ..RetrievalConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_static_retriever_matches_keywords() {
        let provider = StaticRetriever::new(SearchBackend::Web, corpus());
        let docs = provider.search("prompt caching", 10).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Prompt caching guide");
    }

    #[tokio::test]
    async fn test_search_terms_fans_out_all_pairs() {
        let retriever = retriever(Arc::new(StaticRetriever::new(SearchBackend::Web, corpus())));
        let terms = vec!["caching".to_string(), "sourdough".to_string()];

        let outcomes = retriever
            .search_terms(&terms, 10, Duration::from_secs(5))
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        // Fails once, succeeds on the retry (max_retries default is 2).
        let provider = StaticRetriever::new(SearchBackend::Web, corpus()).with_failures(1);
        let retriever = retriever(Arc::new(provider));

        let outcomes = retriever
            .search_terms(&["caching".to_string()], 10, Duration::from_secs(5))
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_error() {
        let provider = StaticRetriever::new(SearchBackend::Web, corpus()).with_failures(10);
        let retriever = retriever(Arc::new(provider));

        let outcomes = retriever
            .search_terms(&["caching".to_string()], 10, Duration::from_secs(5))
            .await;
        assert!(matches!(
            outcomes[0].result,
            Err(ProviderError::EngineFailed { .. })
        ));
    }

    struct NeverReturns;

    #[async_trait]
    impl RetrievalProvider for NeverReturns {
        fn backend(&self) -> SearchBackend {
            SearchBackend::Web
        }

        async fn search(&self, _: &str, _: usize) -> Result<Vec<Document>, ProviderError> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_turns_into_timeout_error() {
        let retriever = retriever(Arc::new(NeverReturns));
        let outcomes = retriever
            .search_terms(&["anything".to_string()], 10, Duration::from_millis(50))
            .await;
        assert!(matches!(
            outcomes[0].result,
            Err(ProviderError::Timeout { timeout_ms: 50 })
        ));
    }
}
