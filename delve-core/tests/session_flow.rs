//! End-to-end session behavior: budget ceilings, knowledge convergence,
//! cancellation, and contradiction surfacing.

use delve_core::providers::{RetrievalProvider, StaticRetriever};
use delve_core::session::{SessionContext, SessionEvent, SessionStatus};
use delve_core::types::{Document, ReportFormat, SearchBackend};
use delve_core::{DelveConfig, ResearchService};
use std::sync::Arc;
use std::time::Duration;

fn doc(title: &str, content: &str) -> Document {
    Document::new(title, content)
}

fn make_service(config: DelveConfig, corpus: Vec<Document>) -> ResearchService {
    let providers: Vec<Arc<dyn RetrievalProvider>> =
        vec![Arc::new(StaticRetriever::new(SearchBackend::Web, corpus))];
    ResearchService::new(SessionContext::new(config, providers))
}

fn fast_config() -> DelveConfig {
    let mut config = DelveConfig::default();
    config.retrieval.batch_pause_ms = 0;
    config
}

fn cache_corpus() -> Vec<Document> {
    vec![
        doc(
            "Cache study",
            "Benchmarks from Acme show the cache reduces latency significantly. \
             Production teams at Initech adopted the cache during 2024.",
        ),
        doc(
            "Cache architecture",
            "Engineers at Acme built the cache with tiered eviction policies. \
             The design keeps hot entries in memory for faster reads overall.",
        ),
    ]
}

#[tokio::test]
async fn single_iteration_budget_completes_after_one_pass() {
    let mut config = fast_config();
    config.budget.max_iterations = 1;
    let service = make_service(config, cache_corpus());
    let mut events = service.subscribe();

    let id = service
        .start_session("How does the Acme cache affect latency?", ReportFormat::Summary)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();

    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.usage.iterations, 1);
    assert!(snapshot.report.is_some());

    // Exactly one IterationStarted was emitted before completion.
    let mut iteration_starts = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::IterationStarted { .. }) {
            iteration_starts += 1;
        }
    }
    assert_eq!(iteration_starts, 1);
}

#[tokio::test]
async fn budget_counters_never_exceed_ceilings() {
    let mut config = fast_config();
    config.budget.max_api_calls = 2;
    config.budget.max_tokens = 200;
    config.budget.max_iterations = 5;
    let service = make_service(config, cache_corpus());

    let id = service
        .start_session("Acme cache latency", ReportFormat::DetailedReport)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();

    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert!(snapshot.usage.api_calls <= 2);
    assert!(snapshot.usage.tokens_used <= 200);
    assert!(snapshot.usage.iterations <= 5);
}

#[tokio::test]
async fn zero_time_budget_still_produces_a_report() {
    let mut config = fast_config();
    config.budget.max_time_ms = 0;
    let service = make_service(config, cache_corpus());

    let id = service
        .start_session("Acme cache latency", ReportFormat::Summary)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();

    // No iterations fit, but the session still synthesizes what it has.
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.usage.iterations, 0);
    assert_eq!(snapshot.fact_count, 0);
    assert!(snapshot.report.is_some());
}

#[tokio::test]
async fn concurrent_sessions_converge_on_one_entity() {
    let service = Arc::new(make_service(fast_config(), cache_corpus()));

    let a = service
        .start_session("Acme cache latency benchmarks", ReportFormat::Summary)
        .await;
    let b = service
        .start_session("Acme cache eviction design", ReportFormat::Summary)
        .await;
    service.wait_for_terminal(a).await.unwrap();
    service.wait_for_terminal(b).await.unwrap();

    let store = service.context().knowledge.read().await;
    let acme = store.find_entity("Acme", "concept").expect("entity exists");
    // Both documents mention Acme; discoveries merged into a single record
    // with both documents as provenance.
    assert_eq!(acme.source_ids.len(), 2);
    assert!(acme.source_count >= 2);
}

#[tokio::test]
async fn stopping_a_session_lands_in_stopped() {
    struct SlowProvider;

    #[async_trait::async_trait]
    impl RetrievalProvider for SlowProvider {
        fn backend(&self) -> SearchBackend {
            SearchBackend::Web
        }

        async fn search(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<Document>, delve_core::error::ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    let providers: Vec<Arc<dyn RetrievalProvider>> = vec![Arc::new(SlowProvider)];
    let service = ResearchService::new(SessionContext::new(fast_config(), providers));
    let mut events = service.subscribe();

    let id = service
        .start_session("anything at all", ReportFormat::Summary)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.stop_session(id).await.unwrap();

    let snapshot = service.wait_for_terminal(id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    assert!(snapshot.report.is_none());

    let mut saw_stopped = false;
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::Completed { .. }));
        if matches!(event, SessionEvent::Stopped { .. }) {
            saw_stopped = true;
        }
    }
    assert!(saw_stopped);
}

#[tokio::test]
async fn panicking_provider_fails_the_session() {
    struct BuggyProvider;

    #[async_trait::async_trait]
    impl RetrievalProvider for BuggyProvider {
        fn backend(&self) -> SearchBackend {
            SearchBackend::Web
        }

        async fn search(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<Document>, delve_core::error::ProviderError> {
            panic!("backend client bug");
        }
    }

    let providers: Vec<Arc<dyn RetrievalProvider>> = vec![Arc::new(BuggyProvider)];
    let service = ResearchService::new(SessionContext::new(fast_config(), providers));
    let mut events = service.subscribe();

    let id = service
        .start_session("anything at all", ReportFormat::Summary)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();

    // The panic lands in a Failed snapshot with the original message, not a
    // closed channel.
    assert_eq!(snapshot.status, SessionStatus::Failed);
    assert!(snapshot
        .error
        .as_deref()
        .is_some_and(|e| e.contains("backend client bug")));

    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Failed { reason, .. } = event {
            assert!(reason.contains("backend client bug"));
            saw_failed = true;
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn contradictory_sources_are_surfaced() {
    let corpus = vec![
        doc(
            "Positive result",
            "Benchmarks from Acme show the cache reduces latency significantly under load.",
        ),
        doc(
            "Negative result",
            "Benchmarks from Acme show the cache does not reduce latency significantly under load.",
        ),
    ];
    let mut config = fast_config();
    config.budget.max_iterations = 1;
    let service = make_service(config, corpus);
    let mut events = service.subscribe();

    let id = service
        .start_session("Does the Acme cache reduce latency?", ReportFormat::DetailedReport)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();

    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert!(snapshot.contradiction_count >= 1);

    let report = snapshot.report.unwrap();
    assert!(report.contradictions_found >= 1);
    assert!(report.content.contains("## Contradictions"));

    let mut saw_contradiction = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::ContradictionDetected { .. }) {
            saw_contradiction = true;
        }
    }
    assert!(saw_contradiction);
}

#[tokio::test]
async fn biased_documents_do_not_reach_key_findings() {
    let corpus = vec![
        doc(
            "Neutral analysis",
            "Measured results indicate the Acme cache reduces median latency by 40 percent.",
        ),
        doc(
            "Promotional piece",
            "Obviously everyone knows the Acme cache is undeniably the best, without question. \
             Buy now with an exclusive discount, sign up today for a free trial, limited offer! \
             It is clear that no doubt remains, this proves beyond anything that those people \
             who disagree are typical of boomers, all men, and millennials are radical extremist \
             corrupt regime propaganda pushers with an agenda, leftist and globalist.",
        ),
    ];
    let mut config = fast_config();
    config.budget.max_iterations = 1;
    let service = make_service(config, corpus);

    let id = service
        .start_session("Acme cache latency results", ReportFormat::DetailedReport)
        .await;
    let snapshot = service.wait_for_terminal(id).await.unwrap();
    let report = snapshot.report.unwrap();

    // The neutral finding is reported; the biased document is retrieved but
    // its statements are categorized contradictory and never land in the
    // findings sections.
    assert!(report.content.contains("40 percent"));
    assert!(!report.content.contains("exclusive discount"));
}

#[tokio::test]
async fn sessions_archive_into_episodic_memory() {
    let service = make_service(fast_config(), cache_corpus());

    let id = service
        .start_session("Acme cache latency", ReportFormat::Summary)
        .await;
    service.wait_for_terminal(id).await.unwrap();

    let tiers = service.context().memory.read().await;
    let episodes = tiers.episodic.similar("latency of the Acme cache", 5);
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].session_id, id);
}
