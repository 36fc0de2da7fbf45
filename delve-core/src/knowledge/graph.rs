//! Persistent knowledge graph node and edge types.
//!
//! Entities merge by normalized (name, type); relations strengthen rather than
//! duplicate; claims accrete evidence. Every stored item carries provenance
//! back to at least one source document id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A named concept/person/organization node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntity {
    pub id: Uuid,
    pub name: String,
    pub entity_type: String,
    /// Free-form properties merged across discoveries; first writer wins per key.
    pub properties: HashMap<String, String>,
    /// Running weighted-average confidence over source count.
    pub confidence: f64,
    /// Source document ids (deduplicated).
    pub source_ids: Vec<Uuid>,
    /// Number of merge contributions, used as the confidence weight.
    pub source_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl KnowledgeEntity {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        confidence: f64,
        source_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            entity_type: entity_type.into(),
            properties: HashMap::new(),
            confidence: confidence.clamp(0.0, 1.0),
            source_ids: vec![source_id],
            source_count: 1,
            created_at: now,
            last_updated: now,
        }
    }

    /// Normalized identity key: case-insensitive (name, type).
    pub fn merge_key(&self) -> (String, String) {
        (self.name.to_lowercase(), self.entity_type.to_lowercase())
    }

    /// Merge another discovery of the same entity into this record.
    ///
    /// Confidence becomes a running weighted average over source count, so a
    /// byte-identical re-insert leaves confidence unchanged.
    pub fn merge(&mut self, incoming: &KnowledgeEntity) {
        for (key, value) in &incoming.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        self.confidence = (self.confidence * self.source_count as f64 + incoming.confidence)
            / (self.source_count + 1) as f64;
        self.source_count += 1;

        for source_id in &incoming.source_ids {
            if !self.source_ids.contains(source_id) {
                self.source_ids.push(*source_id);
            }
        }
        self.last_updated = Utc::now();
    }
}

/// A typed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRelation {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relation_type: String,
    /// Strength in [0,1]; repeated observations strengthen rather than duplicate.
    pub strength: f64,
    pub evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl KnowledgeRelation {
    pub fn new(
        source_id: Uuid,
        target_id: Uuid,
        relation_type: impl Into<String>,
        strength: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            relation_type: relation_type.into(),
            strength: strength.clamp(0.0, 1.0),
            evidence: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Identity key for merging: exact (source, target, type).
    pub fn merge_key(&self) -> (Uuid, Uuid, String) {
        (self.source_id, self.target_id, self.relation_type.clone())
    }

    /// Strengthen this relation with a repeated observation.
    pub fn strengthen(&mut self, incoming: &KnowledgeRelation) {
        self.strength = (self.strength + incoming.strength * 0.3).min(1.0);
        for item in &incoming.evidence {
            if !self.evidence.contains(item) {
                self.evidence.push(item.clone());
            }
        }
        self.last_updated = Utc::now();
    }
}

/// Verification status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Disputed,
    Unverified,
    False,
}

/// One piece of evidence attached to a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source_id: Uuid,
    pub credibility: f64,
    pub relevance: f64,
}

impl Evidence {
    pub fn new(source_id: Uuid, credibility: f64, relevance: f64) -> Self {
        Self {
            source_id,
            credibility: credibility.clamp(0.0, 1.0),
            relevance: relevance.clamp(0.0, 1.0),
        }
    }
}

/// An extracted, evidence-backed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeClaim {
    pub id: Uuid,
    pub statement: String,
    pub confidence: f64,
    /// Entities this claim is about.
    pub entity_ids: Vec<Uuid>,
    pub evidence: Vec<Evidence>,
    pub status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl KnowledgeClaim {
    pub fn new(statement: impl Into<String>, confidence: f64, evidence: Evidence) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            statement: statement.into(),
            confidence: confidence.clamp(0.0, 1.0),
            entity_ids: Vec::new(),
            evidence: vec![evidence],
            status: VerificationStatus::Unverified,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_entities(mut self, entity_ids: Vec<Uuid>) -> Self {
        self.entity_ids = entity_ids;
        self
    }

    /// Append evidence, recompute confidence, and update verification status.
    ///
    /// Confidence is the mean of `credibility * relevance` across all
    /// evidence. Status transitions are threshold driven (>0.8 toward
    /// Verified, <0.3 toward False) with hysteresis: a reversal of direction
    /// passes through `Disputed` before reaching the opposite pole, so a
    /// single evidence addition can never flip Verified directly to False.
    pub fn add_evidence(&mut self, evidence: Evidence) -> (f64, VerificationStatus) {
        self.evidence.push(evidence);

        let sum: f64 = self
            .evidence
            .iter()
            .map(|e| e.credibility * e.relevance)
            .sum();
        self.confidence = sum / self.evidence.len() as f64;

        self.status = match (self.status, self.confidence) {
            (VerificationStatus::False, c) if c > 0.8 => VerificationStatus::Disputed,
            (_, c) if c > 0.8 => VerificationStatus::Verified,
            (VerificationStatus::Verified, c) if c < 0.3 => VerificationStatus::Disputed,
            (_, c) if c < 0.3 => VerificationStatus::False,
            (status, _) => status,
        };
        self.last_updated = Utc::now();

        (self.confidence, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_merge_weighted_average() {
        let source_a = Uuid::new_v4();
        let source_b = Uuid::new_v4();
        let mut entity = KnowledgeEntity::new("Acme", "organization", 0.8, source_a);
        let incoming = KnowledgeEntity::new("acme", "Organization", 0.4, source_b);

        entity.merge(&incoming);

        assert!((entity.confidence - 0.6).abs() < 1e-9);
        assert_eq!(entity.source_count, 2);
        assert_eq!(entity.source_ids.len(), 2);
    }

    #[test]
    fn test_entity_merge_idempotent_confidence() {
        let source = Uuid::new_v4();
        let mut entity = KnowledgeEntity::new("Acme", "organization", 0.8, source);
        let duplicate = KnowledgeEntity::new("Acme", "organization", 0.8, source);

        entity.merge(&duplicate);

        // Identical input: confidence unchanged, source id not duplicated,
        // but the merge itself is counted once.
        assert!((entity.confidence - 0.8).abs() < 1e-9);
        assert_eq!(entity.source_ids.len(), 1);
        assert_eq!(entity.source_count, 2);
    }

    #[test]
    fn test_entity_merge_keeps_existing_properties() {
        let mut entity = KnowledgeEntity::new("Acme", "organization", 0.8, Uuid::new_v4());
        entity.properties.insert("hq".into(), "Berlin".into());

        let mut incoming = KnowledgeEntity::new("Acme", "organization", 0.8, Uuid::new_v4());
        incoming.properties.insert("hq".into(), "Munich".into());
        incoming.properties.insert("founded".into(), "1999".into());

        entity.merge(&incoming);

        assert_eq!(entity.properties.get("hq").map(String::as_str), Some("Berlin"));
        assert_eq!(entity.properties.get("founded").map(String::as_str), Some("1999"));
    }

    #[test]
    fn test_relation_strengthen_capped() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut relation = KnowledgeRelation::new(a, b, "supplies", 0.9);
        let incoming = KnowledgeRelation::new(a, b, "supplies", 1.0);

        relation.strengthen(&incoming);
        assert!((relation.strength - 1.0).abs() < 1e-9);

        relation.strengthen(&incoming);
        assert!(relation.strength <= 1.0);
    }

    #[test]
    fn test_claim_evidence_convergence() {
        let mut claim = KnowledgeClaim::new(
            "Acme acquired Initech",
            0.5,
            Evidence::new(Uuid::new_v4(), 1.0, 1.0),
        );

        for _ in 0..5 {
            let (confidence, status) = claim.add_evidence(Evidence::new(Uuid::new_v4(), 1.0, 1.0));
            assert!((confidence - 1.0).abs() < 1e-9);
            assert_eq!(status, VerificationStatus::Verified);
        }
    }

    #[test]
    fn test_claim_status_hysteresis() {
        let mut claim = KnowledgeClaim::new(
            "Acme acquired Initech",
            0.5,
            Evidence::new(Uuid::new_v4(), 1.0, 1.0),
        );

        // Push up to Verified.
        claim.add_evidence(Evidence::new(Uuid::new_v4(), 1.0, 1.0));
        assert_eq!(claim.status, VerificationStatus::Verified);

        // Flood with worthless evidence until confidence collapses; the first
        // crossing lands on Disputed, not False.
        let mut first_low_status = None;
        for _ in 0..60 {
            let (confidence, status) = claim.add_evidence(Evidence::new(Uuid::new_v4(), 0.0, 0.0));
            if confidence < 0.3 && first_low_status.is_none() {
                first_low_status = Some(status);
            }
        }
        assert_eq!(first_low_status, Some(VerificationStatus::Disputed));
        // Continued low confidence from Disputed then reaches False.
        assert_eq!(claim.status, VerificationStatus::False);
    }

    #[test]
    fn test_claim_mid_confidence_keeps_status() {
        let mut claim = KnowledgeClaim::new("X", 0.5, Evidence::new(Uuid::new_v4(), 0.7, 0.7));
        let (_, status) = claim.add_evidence(Evidence::new(Uuid::new_v4(), 0.7, 0.7));
        assert_eq!(status, VerificationStatus::Unverified);
    }
}
