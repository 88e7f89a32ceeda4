use crate::error::AnalysisError;
use crate::models::HandRecord;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Read-only access to stored hands, scoped by owner.
pub trait HandRepository: Send + Sync {
    /// `Ok(None)` when the hand does not exist or belongs to someone else.
    fn fetch<'a>(
        &'a self,
        hand_id: &'a str,
        owner_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<HandRecord>, AnalysisError>>;

    /// The owner's hands among `hand_ids`, ordered by `played_at`, each at
    /// most once. Unknown ids are skipped.
    fn fetch_many<'a>(
        &'a self,
        hand_ids: &'a [String],
        owner_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<HandRecord>, AnalysisError>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryHandRepository {
    hands: HashMap<String, HandRecord>,
}

impl InMemoryHandRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hands(hands: impl IntoIterator<Item = HandRecord>) -> Self {
        let mut repository = Self::new();
        for hand in hands {
            repository.insert(hand);
        }
        repository
    }

    /// Loads a JSON array of hand records.
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let raw = std::fs::read_to_string(path)?;
        let hands: Vec<HandRecord> = serde_json::from_str(&raw)?;
        Ok(Self::from_hands(hands))
    }

    pub fn insert(&mut self, hand: HandRecord) {
        self.hands.insert(hand.id.clone(), hand);
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    fn owned(&self, hand_id: &str, owner_id: &str) -> Option<&HandRecord> {
        self.hands
            .get(hand_id)
            .filter(|hand| hand.owner_id == owner_id)
    }
}

impl HandRepository for InMemoryHandRepository {
    fn fetch<'a>(
        &'a self,
        hand_id: &'a str,
        owner_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<HandRecord>, AnalysisError>> {
        Box::pin(async move { Ok(self.owned(hand_id, owner_id).cloned()) })
    }

    fn fetch_many<'a>(
        &'a self,
        hand_ids: &'a [String],
        owner_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<HandRecord>, AnalysisError>> {
        Box::pin(async move {
            let mut seen = HashSet::new();
            let mut hands: Vec<HandRecord> = hand_ids
                .iter()
                .filter(|id| seen.insert(*id))
                .filter_map(|id| self.owned(id, owner_id).cloned())
                .collect();
            // Undated hands sort first; ties keep request order.
            hands.sort_by_key(|hand| hand.played_at);
            Ok(hands)
        })
    }
}
