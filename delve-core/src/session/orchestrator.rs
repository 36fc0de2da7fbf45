//! The per-session research loop.
//!
//! One tokio task per session. Each iteration moves through Searching ->
//! Reading -> Reasoning, spending budget only after checking affordability;
//! the loop exits into Synthesizing when the budget runs out, the goal
//! predicate is satisfied, or there is nothing left to search. Cancellation
//! is honored at every phase boundary and inside retrieval waits.

use super::budget::ResourceBudget;
use super::events::SessionEvent;
use super::goal::{FactCountGoal, GoalPredicate};
use super::state::{transition, Fact, SessionMemory, SessionSnapshot, SessionStatus};
use crate::config::DelveConfig;
use crate::embeddings::BagOfWordsEmbedder;
use crate::error::Result;
use crate::knowledge::{
    Contradiction, Evidence, KnowledgeClaim, KnowledgeEntity, KnowledgeRelation, KnowledgeStore,
    SharedKnowledgeStore,
};
use crate::memory::{MemoryItem, MemoryTiers};
use crate::providers::{
    Extractor, HeuristicQueryProcessor, KeywordExtractor, QueryProcessor, RateLimiter,
    RetrievalOutcome, RetrievalProvider, Retriever, SynthesisInput, Synthesizer,
    TemplateSynthesizer,
};
use crate::scoring::{RelevanceCategory, RelevanceScore, ScoringContext, ScoringEngine};
use crate::types::{Document, Report, ReportFormat, SourceRecord, SubQuestion};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Documents requested per retrieval call.
const DOCS_PER_CALL: usize = 5;

/// Shared components every session runs against.
pub struct SessionContext {
    pub config: DelveConfig,
    pub query_processor: Arc<dyn QueryProcessor>,
    pub retriever: Retriever,
    pub extractor: Arc<dyn Extractor>,
    pub scoring: Arc<ScoringEngine>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub goal: Arc<dyn GoalPredicate>,
    pub knowledge: SharedKnowledgeStore,
    pub memory: Arc<RwLock<MemoryTiers>>,
}

impl SessionContext {
    /// Assemble a context with the default heuristic components around the
    /// given retrieval providers.
    pub fn new(config: DelveConfig, providers: Vec<Arc<dyn RetrievalProvider>>) -> Self {
        let embedder = Arc::new(BagOfWordsEmbedder::new(config.embedding_dimensions));
        let limiter = RateLimiter::shared(config.retrieval.requests_per_minute);
        let knowledge: SharedKnowledgeStore =
            Arc::new(RwLock::new(KnowledgeStore::new(embedder)));
        let memory = Arc::new(RwLock::new(MemoryTiers::new(config.memory.clone())));
        let retriever = Retriever::new(providers, limiter, config.retrieval.clone());

        Self {
            query_processor: Arc::new(HeuristicQueryProcessor::new()),
            extractor: Arc::new(KeywordExtractor::new()),
            scoring: Arc::new(ScoringEngine::new(config.scoring.weights)),
            synthesizer: Arc::new(TemplateSynthesizer::new()),
            goal: Arc::new(FactCountGoal::new(config.goal.clone())),
            knowledge,
            memory,
            retriever,
            config,
        }
    }

    pub fn with_goal(mut self, goal: Arc<dyn GoalPredicate>) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }
}

/// A retrieved document together with its relevance score.
struct ScoredDocument {
    document: Document,
    score: RelevanceScore,
}

enum RunOutcome {
    Completed(Box<Report>),
    Stopped,
}

/// Drives one session from Initializing to a terminal state.
pub(crate) struct SessionRunner {
    id: Uuid,
    query: String,
    format: ReportFormat,
    ctx: Arc<SessionContext>,
    budget: ResourceBudget,
    memory: SessionMemory,
    contradictions: Vec<Contradiction>,
    status: SessionStatus,
    snapshot: SessionSnapshot,
    watch_tx: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionRunner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Uuid,
        query: String,
        format: ReportFormat,
        ctx: Arc<SessionContext>,
        watch_tx: watch::Sender<SessionSnapshot>,
        events: broadcast::Sender<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let budget = ResourceBudget::new(ctx.config.budget);
        let snapshot = SessionSnapshot::new(id, &query);
        Self {
            id,
            query,
            format,
            ctx,
            budget,
            memory: SessionMemory::default(),
            contradictions: Vec::new(),
            status: SessionStatus::Initializing,
            snapshot,
            watch_tx,
            events,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        self.emit(SessionEvent::Started {
            session_id: self.id,
            query: self.query.clone(),
        });

        // A panic inside the loop (a buggy provider, say) must still surface
        // as a Failed snapshot and event, not a silently closed watch channel.
        match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(Ok(RunOutcome::Completed(report))) => {
                info!(session = %self.id, confidence = report.confidence, "session completed");
            }
            Ok(Ok(RunOutcome::Stopped)) => {
                self.status = SessionStatus::Stopped;
                self.publish();
                self.emit(SessionEvent::Stopped { session_id: self.id });
                info!(session = %self.id, "session stopped");
            }
            Ok(Err(error)) => self.fail(error.to_string()),
            Err(panic) => self.fail(panic_reason(panic)),
        }
    }

    fn fail(&mut self, reason: String) {
        warn!(session = %self.id, %reason, "session failed");
        self.status = SessionStatus::Failed;
        self.snapshot.error = Some(reason.clone());
        self.publish();
        self.emit(SessionEvent::Failed {
            session_id: self.id,
            reason,
        });
    }

    async fn execute(&mut self) -> Result<RunOutcome> {
        let analysis = self.ctx.query_processor.analyze(&self.query);
        let questions = self.ctx.query_processor.decompose(&self.query, &analysis);
        let goals: Vec<String> = questions.iter().map(|q| q.text.clone()).collect();
        for question in questions {
            self.memory.add_question(question);
        }
        let scoring_context =
            ScoringContext::new(&self.query, analysis.clone()).with_goals(goals);
        self.snapshot.analysis = Some(analysis);
        self.publish();

        let mut first_iteration = true;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }
            if !self.budget.can_start_iteration() {
                debug!(session = %self.id, reason = ?self.budget.exhausted(), "budget exhausted");
                break;
            }
            if self
                .ctx
                .goal
                .is_satisfied(&self.memory, self.budget.iterations())
            {
                debug!(session = %self.id, "goal satisfied");
                break;
            }

            let terms = self.gather_terms(first_iteration);
            first_iteration = false;
            if terms.is_empty() {
                debug!(session = %self.id, "no affordable search terms left");
                break;
            }

            self.budget.record_iteration();
            let iteration = self.budget.iterations();
            self.emit(SessionEvent::IterationStarted {
                session_id: self.id,
                iteration,
            });

            self.set_status(SessionStatus::Searching)?;
            let outcomes = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(RunOutcome::Stopped),
                outcomes = self.ctx.retriever.search_terms(
                    &terms,
                    DOCS_PER_CALL,
                    self.call_deadline(),
                ) => outcomes,
            };

            self.set_status(SessionStatus::Reading)?;
            let scored = self.read_documents(outcomes, &scoring_context);

            if self.cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }

            self.set_status(SessionStatus::Reasoning)?;
            let (facts_found, new_questions) = self.integrate(scored).await;

            self.emit(SessionEvent::IterationCompleted {
                session_id: self.id,
                iteration,
                facts_found,
                new_questions,
            });
            self.publish();
        }

        self.set_status(SessionStatus::Synthesizing)?;
        let report = self.synthesize().await;
        self.snapshot.report = Some(report.clone());
        self.set_status(SessionStatus::Completed)?;
        self.emit(SessionEvent::Completed {
            session_id: self.id,
            report: report.clone(),
        });
        Ok(RunOutcome::Completed(Box::new(report)))
    }

    /// Search terms for this iteration: the original query first, then the
    /// highest-priority pending questions. Terms are trimmed so the planned
    /// calls stay under the call ceiling.
    fn gather_terms(&mut self, first_iteration: bool) -> Vec<String> {
        let per_iteration = self.ctx.config.retrieval.terms_per_iteration.max(1);
        let mut terms = Vec::new();

        if first_iteration {
            terms.push(self.query.clone());
            self.memory
                .explored_queries
                .insert(self.query.to_lowercase());
        }
        for question in self.memory.take_questions(per_iteration - terms.len()) {
            terms.push(question.text);
        }

        let providers = self.ctx.retriever.provider_count().max(1) as u64;
        while !terms.is_empty() && !self.budget.can_afford_calls(terms.len() as u64 * providers) {
            terms.pop();
        }
        terms
    }

    /// Per-call deadline: the configured timeout, shrunk to whatever time
    /// budget remains.
    fn call_deadline(&self) -> Duration {
        Duration::from_millis(self.ctx.config.retrieval.call_timeout_ms)
            .min(self.budget.remaining_time())
    }

    /// Spend call/token budget on the retrieval outcomes and score what fits.
    /// Failed calls are absorbed; they reduce yield, never abort the session.
    fn read_documents(
        &mut self,
        outcomes: Vec<RetrievalOutcome>,
        context: &ScoringContext,
    ) -> Vec<ScoredDocument> {
        let mut scored = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(documents) => {
                    self.budget.record_call();
                    for document in documents {
                        if self.memory.sources.iter().any(|s| s.id == document.id) {
                            continue;
                        }
                        let tokens = document.estimated_tokens();
                        if !self.budget.can_afford_tokens(tokens) {
                            debug!(session = %self.id, doc = %document.id, "token budget too low to read");
                            continue;
                        }
                        self.budget.record_tokens(tokens);

                        let score = self.ctx.scoring.score(&document, context);
                        self.memory
                            .record_source(SourceRecord::from_document(&document, score.credibility));

                        if score.category == RelevanceCategory::Irrelevant {
                            continue;
                        }
                        scored.push(ScoredDocument { document, score });
                    }
                }
                Err(error) => {
                    warn!(session = %self.id, term = %outcome.term, backend = %outcome.backend, %error, "retrieval failed");
                }
            }
        }
        scored
    }

    /// Fold scored documents into the shared knowledge store, the session's
    /// fact list, and the memory tiers. Returns (facts found, new questions).
    async fn integrate(&mut self, scored: Vec<ScoredDocument>) -> (usize, usize) {
        let mut facts_found = 0;
        let mut new_questions = 0;
        let mut new_items = Vec::new();
        let question_threshold = self.ctx.config.scoring.question_threshold;

        for ScoredDocument { document, score } in scored {
            let extraction = match self.ctx.extractor.extract(&document) {
                Ok(extraction) => extraction,
                Err(error) => {
                    debug!(session = %self.id, doc = %document.id, %error, "document dropped");
                    continue;
                }
            };

            // Single write section per document: entity lookups and the merges
            // that depend on them stay atomic across concurrent sessions.
            let mut detected = Vec::new();
            {
                let knowledge = Arc::clone(&self.ctx.knowledge);
                let mut store = knowledge.write().await;
                let mut name_to_id: HashMap<String, Uuid> = HashMap::new();

                for entity in &extraction.entities {
                    let stored = store.upsert_entity(KnowledgeEntity::new(
                        &entity.name,
                        &entity.entity_type,
                        entity.confidence,
                        document.id,
                    ));
                    name_to_id.insert(entity.name.clone(), stored.id);
                }

                for relation in &extraction.relations {
                    if let (Some(&source), Some(&target)) = (
                        name_to_id.get(&relation.source_name),
                        name_to_id.get(&relation.target_name),
                    ) {
                        store.upsert_relation(
                            KnowledgeRelation::new(
                                source,
                                target,
                                &relation.relation_type,
                                relation.strength,
                            )
                            .with_evidence(vec![relation.evidence.clone()]),
                        );
                    }
                }

                for statement in &extraction.statements {
                    let entity_ids: Vec<Uuid> = statement
                        .entity_names
                        .iter()
                        .filter_map(|name| name_to_id.get(name).copied())
                        .collect();
                    let claim = KnowledgeClaim::new(
                        &statement.text,
                        statement.confidence,
                        Evidence::new(document.id, score.credibility, score.overall),
                    )
                    .with_entities(entity_ids);

                    detected.extend(store.detect_conflicts(&claim));
                    store.upsert_claim(claim);
                }
            }
            for contradiction in detected {
                self.emit(SessionEvent::ContradictionDetected {
                    session_id: self.id,
                    contradiction: contradiction.clone(),
                });
                self.contradictions.push(contradiction);
            }

            let mut weak_fact_questions = 0;
            for statement in extraction.statements {
                let confidence = statement.confidence * score.credibility;
                // Weak findings spawn verification questions, capped per
                // document to keep the queue focused.
                if confidence < question_threshold && weak_fact_questions < 2 {
                    self.memory.add_question(SubQuestion {
                        id: Uuid::new_v4(),
                        text: format!("Verify: {}", statement.text),
                        priority: 5,
                        expected_gain: question_threshold - confidence,
                    });
                    weak_fact_questions += 1;
                    new_questions += 1;
                }

                let fact = Fact::new(statement.text, confidence, vec![document.id], score.category);
                new_items.push(MemoryItem::new(&fact.content, fact.confidence).with_session(self.id));
                self.memory.add_fact(fact);
                facts_found += 1;
            }
        }

        let mut tiers = self.ctx.memory.write().await;
        for item in new_items {
            tiers.remember(item);
        }
        tiers.consolidate();
        (facts_found, new_questions)
    }

    async fn synthesize(&mut self) -> Report {
        let report = self.ctx.synthesizer.synthesize(
            &SynthesisInput {
                query: &self.query,
                facts: &self.memory.facts,
                sources: &self.memory.sources,
                contradictions: &self.contradictions,
                usage: self.budget.usage(),
            },
            self.format,
        );

        // Archive the session into episodic memory for future lookups.
        let mut tiers = self.ctx.memory.write().await;
        tiers.consolidate();
        tiers.episodic.record(
            self.id,
            &self.query,
            format!(
                "{} facts, {} sources, confidence {:.2}",
                self.memory.facts.len(),
                self.memory.sources.len(),
                report.confidence,
            ),
            self.memory.facts.len(),
        );
        report
    }

    fn set_status(&mut self, next: SessionStatus) -> Result<()> {
        self.status = transition(self.status, next)?;
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        self.snapshot.status = self.status;
        self.snapshot.usage = self.budget.usage();
        self.snapshot.fact_count = self.memory.facts.len();
        self.snapshot.pending_questions = self.memory.pending_questions.len();
        self.snapshot.source_count = self.memory.sources.len();
        self.snapshot.contradiction_count = self.contradictions.len();
        self.snapshot.updated_at = chrono::Utc::now();
        // Observers may have dropped; that is fine.
        let _ = self.watch_tx.send(self.snapshot.clone());
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "session task panicked".to_string()
    }
}
