//! Tiered memory for research sessions.
//!
//! - **Working memory**: small focus window for the current iteration.
//! - **Short-term memory**: sliding window of recent findings with expiry.
//! - **Long-term memory**: consolidated facts surviving across sessions.
//! - **Episodic memory**: append-only summaries of completed sessions.

use crate::config::MemoryConfig;
use crate::types::{keyword_overlap, keywords};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::debug;
use uuid::Uuid;

/// One remembered finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: Uuid,
    pub content: String,
    /// Importance in [0,1]; drives consolidation and forgetting.
    pub importance: f64,
    pub access_count: u32,
    /// Session that produced this item, if any.
    pub session_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl MemoryItem {
    pub fn new(content: impl Into<String>, importance: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            importance: importance.clamp(0.0, 1.0),
            access_count: 0,
            session_id: None,
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}

/// Sliding window of recent findings. Oldest items fall off when the capacity
/// is exceeded; expired items are dropped on access.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    items: VecDeque<MemoryItem>,
    capacity: usize,
    max_age: Duration,
}

impl ShortTermMemory {
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            max_age,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, item: MemoryItem) {
        self.items.push_back(item);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Drop items older than the expiry window. Returns the number removed.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.age(now) <= self.max_age);
        before - self.items.len()
    }

    /// Rank items by keyword overlap with the query, most relevant first.
    pub fn recall(&mut self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let query_words = keywords(query);
        let mut scored: Vec<(f64, usize)> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (keyword_overlap(&query_words, &keywords(&item.content)), i))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        let indexes: Vec<usize> = scored.into_iter().map(|(_, i)| i).collect();
        let mut results = Vec::with_capacity(indexes.len());
        for i in indexes {
            if let Some(item) = self.items.get_mut(i) {
                item.touch();
                results.push(item.clone());
            }
        }
        results
    }

    /// Remove and return every item the predicate accepts.
    pub fn take_matching<F>(&mut self, mut predicate: F) -> Vec<MemoryItem>
    where
        F: FnMut(&MemoryItem) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if predicate(&item) {
                taken.push(item);
            } else {
                kept.push_back(item);
            }
        }
        self.items = kept;
        taken
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryItem> {
        self.items.iter()
    }
}

/// Criteria for explicit forgetting from long-term memory.
///
/// An item is forgotten if it matches ANY of the set criteria.
#[derive(Debug, Clone, Default)]
pub struct ForgetCriteria {
    /// Forget items created longer ago than this.
    pub older_than: Option<Duration>,
    /// Forget items whose importance is below this.
    pub importance_below: Option<f64>,
    /// Forget items accessed fewer times than this.
    pub accessed_fewer_than: Option<u32>,
}

impl ForgetCriteria {
    fn matches(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        if let Some(age) = self.older_than {
            if item.age(now) > age {
                return true;
            }
        }
        if let Some(threshold) = self.importance_below {
            if item.importance < threshold {
                return true;
            }
        }
        if let Some(count) = self.accessed_fewer_than {
            if item.access_count < count {
                return true;
            }
        }
        false
    }
}

/// Consolidated facts that persist across sessions.
#[derive(Debug, Clone, Default)]
pub struct LongTermMemory {
    items: HashMap<Uuid, MemoryItem>,
    /// Exact content -> item id, for strengthening duplicates on store.
    by_content: HashMap<String, Uuid>,
}

impl LongTermMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Store an item. A duplicate (identical content) strengthens the existing
    /// record instead of adding a second copy.
    pub fn store(&mut self, item: MemoryItem) -> Uuid {
        if let Some(&existing_id) = self.by_content.get(&item.content) {
            if let Some(existing) = self.items.get_mut(&existing_id) {
                existing.importance = existing.importance.max(item.importance);
                existing.access_count += 1;
                existing.last_accessed = Utc::now();
            }
            existing_id
        } else {
            let id = item.id;
            self.by_content.insert(item.content.clone(), id);
            self.items.insert(id, item);
            id
        }
    }

    pub fn get(&mut self, id: &Uuid) -> Option<MemoryItem> {
        let item = self.items.get_mut(id)?;
        item.touch();
        Some(item.clone())
    }

    /// Rank stored facts by keyword overlap with the query.
    pub fn recall(&mut self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let query_words = keywords(query);
        let mut scored: Vec<(f64, Uuid)> = self
            .items
            .values()
            .map(|item| (keyword_overlap(&query_words, &keywords(&item.content)), item.id))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .filter_map(|(_, id)| {
                let item = self.items.get_mut(&id)?;
                item.touch();
                Some(item.clone())
            })
            .collect()
    }

    /// Explicitly forget items matching the criteria. Returns the number removed.
    pub fn forget(&mut self, criteria: &ForgetCriteria) -> usize {
        let now = Utc::now();
        let doomed: Vec<Uuid> = self
            .items
            .values()
            .filter(|item| criteria.matches(item, now))
            .map(|item| item.id)
            .collect();
        for id in &doomed {
            if let Some(item) = self.items.remove(id) {
                self.by_content.remove(&item.content);
            }
        }
        doomed.len()
    }
}

/// Small focus window for the current iteration, ordered by recency.
/// Bounded; adding beyond capacity evicts the oldest item.
#[derive(Debug, Clone)]
pub struct WorkingMemory {
    items: Vec<MemoryItem>,
    capacity: usize,
}

impl WorkingMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, item: MemoryItem) {
        self.items.push(item);
        while self.items.len() > self.capacity {
            self.items.remove(0);
        }
    }

    pub fn items(&self) -> &[MemoryItem] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Summary of one completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub session_id: Uuid,
    pub query: String,
    pub summary: String,
    pub fact_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of past sessions, searchable by query similarity.
#[derive(Debug, Clone, Default)]
pub struct EpisodicMemory {
    episodes: Vec<Episode>,
}

impl EpisodicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn record(&mut self, session_id: Uuid, query: impl Into<String>, summary: impl Into<String>, fact_count: usize) -> Uuid {
        let episode = Episode {
            id: Uuid::new_v4(),
            session_id,
            query: query.into(),
            summary: summary.into(),
            fact_count,
            created_at: Utc::now(),
        };
        let id = episode.id;
        self.episodes.push(episode);
        id
    }

    /// Past sessions whose query overlaps the given one, most similar first.
    pub fn similar(&self, query: &str, limit: usize) -> Vec<&Episode> {
        let query_words = keywords(query);
        let mut scored: Vec<(f64, &Episode)> = self
            .episodes
            .iter()
            .map(|e| (keyword_overlap(&query_words, &keywords(&e.query)), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored.into_iter().map(|(_, e)| e).collect()
    }
}

/// The four tiers behind one facade, with consolidation between them.
pub struct MemoryTiers {
    pub working: WorkingMemory,
    pub short_term: ShortTermMemory,
    pub long_term: LongTermMemory,
    pub episodic: EpisodicMemory,
    config: MemoryConfig,
}

impl MemoryTiers {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            working: WorkingMemory::new(config.working_capacity),
            short_term: ShortTermMemory::new(
                config.short_term_capacity,
                Duration::seconds(config.short_term_max_age_secs as i64),
            ),
            long_term: LongTermMemory::new(),
            episodic: EpisodicMemory::new(),
            config,
        }
    }

    /// Record a fresh finding into short-term memory (and the focus window if
    /// it is important enough to act on this iteration).
    pub fn remember(&mut self, item: MemoryItem) {
        if item.importance >= self.config.promote_importance {
            self.working.add(item.clone());
        }
        self.short_term.add(item);
    }

    /// Move qualifying short-term items into long-term memory.
    ///
    /// An item qualifies when its importance exceeds the promotion threshold,
    /// it has been accessed more than the access threshold, or it has aged past
    /// the short-term expiry (retained knowledge should outlive the window).
    /// Returns the number of items promoted.
    pub fn consolidate(&mut self) -> usize {
        let now = Utc::now();
        let max_age = Duration::seconds(self.config.short_term_max_age_secs as i64);
        let promote_importance = self.config.promote_importance;
        let promote_access = self.config.promote_access_count;

        let promoted = self.short_term.take_matching(|item| {
            item.importance > promote_importance
                || item.access_count > promote_access
                || item.age(now) > max_age
        });

        let count = promoted.len();
        for item in promoted {
            self.long_term.store(item);
        }
        self.short_term.evict_expired(now);
        if count > 0 {
            debug!(promoted = count, "consolidated memory");
        }
        count
    }

    /// Recall across tiers: working memory first, then short-term, then
    /// long-term, deduplicated by content.
    pub fn recall(&mut self, query: &str, limit: usize) -> Vec<MemoryItem> {
        let query_words = keywords(query);
        let mut results: Vec<MemoryItem> = self
            .working
            .items()
            .iter()
            .filter(|item| keyword_overlap(&query_words, &keywords(&item.content)) > 0.0)
            .cloned()
            .collect();

        for item in self.short_term.recall(query, limit) {
            if results.len() >= limit {
                break;
            }
            if !results.iter().any(|r| r.content == item.content) {
                results.push(item);
            }
        }
        for item in self.long_term.recall(query, limit) {
            if results.len() >= limit {
                break;
            }
            if !results.iter().any(|r| r.content == item.content) {
                results.push(item);
            }
        }
        results.truncate(limit);
        results
    }
}
