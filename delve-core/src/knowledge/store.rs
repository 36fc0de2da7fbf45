//! The knowledge store: graph + vector index behind one write-serialized facade.
//!
//! Shared across sessions. Merge operations are check-then-write inside a
//! single `&mut self` call, so wrapping the store in one `RwLock` makes every
//! merge atomic with respect to its matching read — two sessions discovering
//! the same entity concurrently converge on one record.

use super::conflict::{Contradiction, ContradictionScorer, NegationOverlapScorer};
use super::graph::{
    Evidence, KnowledgeClaim, KnowledgeEntity, KnowledgeRelation, VerificationStatus,
};
use super::vector::VectorIndex;
use crate::embeddings::Embedder;
use crate::error::KnowledgeError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Result bundle from a similarity query.
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    pub entities: Vec<KnowledgeEntity>,
    pub claims: Vec<KnowledgeClaim>,
    pub relations: Vec<KnowledgeRelation>,
}

/// Outcome of an `add_evidence` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceOutcome {
    pub new_confidence: f64,
    pub status: VerificationStatus,
}

/// Graph + vector index for cross-session knowledge.
pub struct KnowledgeStore {
    entities: HashMap<Uuid, KnowledgeEntity>,
    /// Normalized (name, type) -> entity id.
    entity_keys: HashMap<(String, String), Uuid>,
    relations: HashMap<Uuid, KnowledgeRelation>,
    /// Exact (source, target, type) -> relation id.
    relation_keys: HashMap<(Uuid, Uuid, String), Uuid>,
    claims: HashMap<Uuid, KnowledgeClaim>,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    conflict_scorer: Box<dyn ContradictionScorer>,
    /// Conflicts above this strength are reported.
    conflict_threshold: f64,
}

impl KnowledgeStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimensions = embedder.dimensions();
        Self {
            entities: HashMap::new(),
            entity_keys: HashMap::new(),
            relations: HashMap::new(),
            relation_keys: HashMap::new(),
            claims: HashMap::new(),
            index: VectorIndex::new(dimensions),
            embedder,
            conflict_scorer: Box::new(NegationOverlapScorer::new()),
            conflict_threshold: 0.7,
        }
    }

    /// Replace the contradiction-strength measure.
    pub fn with_conflict_scorer(mut self, scorer: Box<dyn ContradictionScorer>) -> Self {
        self.conflict_scorer = scorer;
        self
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn get_entity(&self, id: &Uuid) -> Option<&KnowledgeEntity> {
        self.entities.get(id)
    }

    pub fn get_claim(&self, id: &Uuid) -> Option<&KnowledgeClaim> {
        self.claims.get(id)
    }

    /// Find an entity by case-insensitive (name, type).
    pub fn find_entity(&self, name: &str, entity_type: &str) -> Option<&KnowledgeEntity> {
        let key = (name.to_lowercase(), entity_type.to_lowercase());
        self.entity_keys.get(&key).and_then(|id| self.entities.get(id))
    }

    /// Insert or merge an entity; returns the stored record.
    ///
    /// Matches by case-insensitive (name, type). On match, merges unset
    /// properties, recomputes confidence as a running weighted average over
    /// source count, and appends the new source id.
    pub fn upsert_entity(&mut self, entity: KnowledgeEntity) -> KnowledgeEntity {
        let key = entity.merge_key();

        let stored_id = if let Some(&existing_id) = self.entity_keys.get(&key) {
            if let Some(existing) = self.entities.get_mut(&existing_id) {
                existing.merge(&entity);
                debug!(name = %existing.name, sources = existing.source_count, "merged entity");
            }
            existing_id
        } else {
            let id = entity.id;
            let text = format!("{} {}", entity.name, entity.entity_type);
            // Embedding dimension is fixed by construction; insertion cannot fail.
            let _ = self.index.add(id, self.embedder.embed(&text));
            self.entity_keys.insert(key, id);
            self.entities.insert(id, entity);
            id
        };

        self.entities[&stored_id].clone()
    }

    /// Insert or strengthen a relation; returns the stored record.
    pub fn upsert_relation(&mut self, relation: KnowledgeRelation) -> KnowledgeRelation {
        let key = relation.merge_key();

        let stored_id = if let Some(&existing_id) = self.relation_keys.get(&key) {
            if let Some(existing) = self.relations.get_mut(&existing_id) {
                existing.strengthen(&relation);
            }
            existing_id
        } else {
            let id = relation.id;
            self.relation_keys.insert(key, id);
            self.relations.insert(id, relation);
            id
        };

        self.relations[&stored_id].clone()
    }

    /// Insert a claim directly. Claims are never merged by similarity; they
    /// only accrete evidence via [`KnowledgeStore::add_evidence`].
    pub fn upsert_claim(&mut self, claim: KnowledgeClaim) -> Uuid {
        let id = claim.id;
        let _ = self.index.add(id, self.embedder.embed(&claim.statement));
        self.claims.insert(id, claim);
        id
    }

    /// Attach evidence to a claim and recompute confidence/status.
    pub fn add_evidence(
        &mut self,
        claim_id: Uuid,
        evidence: Evidence,
    ) -> Result<EvidenceOutcome, KnowledgeError> {
        let claim = self
            .claims
            .get_mut(&claim_id)
            .ok_or(KnowledgeError::ClaimNotFound { id: claim_id })?;
        let (new_confidence, status) = claim.add_evidence(evidence);
        Ok(EvidenceOutcome {
            new_confidence,
            status,
        })
    }

    /// Find stored claims that contradict the given claim.
    ///
    /// Candidates must share at least one entity; those whose contradiction
    /// strength exceeds the threshold are returned.
    pub fn detect_conflicts(&self, claim: &KnowledgeClaim) -> Vec<Contradiction> {
        let claim_entities: HashSet<&Uuid> = claim.entity_ids.iter().collect();

        self.claims
            .values()
            .filter(|candidate| candidate.id != claim.id)
            .filter(|candidate| {
                !claim_entities.is_empty()
                    && candidate
                        .entity_ids
                        .iter()
                        .any(|id| claim_entities.contains(id))
            })
            .filter_map(|candidate| {
                let strength = self.conflict_scorer.strength(claim, candidate);
                if strength > self.conflict_threshold {
                    Some(Contradiction {
                        claim_a_id: claim.id,
                        claim_b_id: candidate.id,
                        claim_a_statement: claim.statement.clone(),
                        claim_b_statement: candidate.statement.clone(),
                        strength,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Similarity query: cosine top-k over the vector index, then graph
    /// expansion pulling in directly related entities/claims up to `depth`.
    ///
    /// `k = 0` returns empty result sets without error.
    pub fn query(&self, text: &str, k: usize, depth: usize) -> QueryResults {
        if k == 0 {
            return QueryResults::default();
        }

        let query_vector = self.embedder.embed(text);
        let hits = self.index.search(&query_vector, k);

        let mut results = QueryResults::default();
        let mut seen_entities: HashSet<Uuid> = HashSet::new();
        let mut seen_claims: HashSet<Uuid> = HashSet::new();
        let mut seen_relations: HashSet<Uuid> = HashSet::new();
        let mut frontier: Vec<Uuid> = Vec::new();

        // Direct hits, already ranked by similarity.
        for hit in &hits {
            if let Some(entity) = self.entities.get(&hit.id) {
                if seen_entities.insert(entity.id) {
                    results.entities.push(entity.clone());
                    frontier.push(entity.id);
                }
            } else if let Some(claim) = self.claims.get(&hit.id) {
                if seen_claims.insert(claim.id) {
                    results.claims.push(claim.clone());
                    for entity_id in &claim.entity_ids {
                        frontier.push(*entity_id);
                    }
                }
            }
        }

        // Breadth-first graph expansion.
        for _ in 0..depth {
            let current = std::mem::take(&mut frontier);
            if current.is_empty() {
                break;
            }
            for entity_id in current {
                if seen_entities.insert(entity_id) {
                    if let Some(entity) = self.entities.get(&entity_id) {
                        results.entities.push(entity.clone());
                    }
                }
                for relation in self.relations.values() {
                    if relation.source_id == entity_id || relation.target_id == entity_id {
                        if seen_relations.insert(relation.id) {
                            results.relations.push(relation.clone());
                        }
                        let other = if relation.source_id == entity_id {
                            relation.target_id
                        } else {
                            relation.source_id
                        };
                        // Materialize the neighbor in the round that finds it;
                        // the frontier only schedules its further expansion.
                        if seen_entities.insert(other) {
                            if let Some(entity) = self.entities.get(&other) {
                                results.entities.push(entity.clone());
                            }
                            frontier.push(other);
                        }
                    }
                }
                for claim in self.claims.values() {
                    if claim.entity_ids.contains(&entity_id) && seen_claims.insert(claim.id) {
                        results.claims.push(claim.clone());
                    }
                }
            }
        }

        results
    }
}

/// Shared handle used across concurrent sessions.
pub type SharedKnowledgeStore = Arc<tokio::sync::RwLock<KnowledgeStore>>;
