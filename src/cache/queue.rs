use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use super::{
    DUMMY_ID, EntityKind, Store, StoreError,
    schema::RELATIONS,
    store::{SqlValue, list_value},
};

/// Pending ids per queued kind, plus the ids that failed to hydrate and must
/// not be scheduled again during this run.
#[derive(Debug, Default)]
pub struct ItemQueues {
    albums: VecDeque<String>,
    artists: VecDeque<String>,
    playlists: VecDeque<String>,
    tracks: VecDeque<String>,
    users: VecDeque<String>,
    dead: HashMap<EntityKind, HashSet<String>>,
}

impl ItemQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: EntityKind) -> Option<&VecDeque<String>> {
        match kind {
            EntityKind::Album => Some(&self.albums),
            EntityKind::Artist => Some(&self.artists),
            EntityKind::Playlist => Some(&self.playlists),
            EntityKind::Track => Some(&self.tracks),
            EntityKind::User => Some(&self.users),
            EntityKind::Genre | EntityKind::Device => None,
        }
    }

    fn slot_mut(&mut self, kind: EntityKind) -> Option<&mut VecDeque<String>> {
        match kind {
            EntityKind::Album => Some(&mut self.albums),
            EntityKind::Artist => Some(&mut self.artists),
            EntityKind::Playlist => Some(&mut self.playlists),
            EntityKind::Track => Some(&mut self.tracks),
            EntityKind::User => Some(&mut self.users),
            EntityKind::Genre | EntityKind::Device => None,
        }
    }

    /// Appends `id` unless it is already pending or dead. Returns whether it
    /// was added.
    pub fn push(&mut self, kind: EntityKind, id: &str) -> bool {
        if id.is_empty() || id == DUMMY_ID || self.is_dead(kind, id) {
            return false;
        }
        match self.slot_mut(kind) {
            Some(queue) if !queue.iter().any(|q| q == id) => {
                queue.push_back(id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.slot(kind)
            .is_some_and(|queue| queue.iter().any(|q| q == id))
    }

    pub fn pop(&mut self, kind: EntityKind) -> Option<String> {
        self.slot_mut(kind)?.pop_front()
    }

    pub fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        match self.slot_mut(kind) {
            Some(queue) => {
                let before = queue.len();
                queue.retain(|q| q != id);
                queue.len() != before
            }
            None => false,
        }
    }

    /// Current content of one queue, front first.
    pub fn snapshot(&self, kind: EntityKind) -> Vec<String> {
        self.slot(kind)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.slot(kind).map_or(0, VecDeque::len)
    }

    pub fn total_len(&self) -> usize {
        EntityKind::QUEUED.iter().map(|k| self.len(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn mark_dead(&mut self, kind: EntityKind, id: &str) {
        self.remove(kind, id);
        self.dead.entry(kind).or_default().insert(id.to_string());
    }

    pub fn is_dead(&self, kind: EntityKind, id: &str) -> bool {
        self.dead.get(&kind).is_some_and(|ids| ids.contains(id))
    }

    pub fn dead(&self) -> Vec<(EntityKind, String)> {
        let mut dead: Vec<(EntityKind, String)> = self
            .dead
            .iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (*kind, id.clone())))
            .collect();
        dead.sort();
        dead
    }

    /// Rebuilds the queues from the cache so a crawl interrupted in an earlier
    /// run picks up where it stopped: rows inserted but never hydrated, and
    /// ids referenced by relation columns that have no row of their own.
    pub fn refill_from_store<S: Store>(&mut self, store: &S) -> Result<usize, StoreError> {
        let mut added = 0;
        for kind in EntityKind::QUEUED {
            for (id, hydrated) in store.project(kind, "hydrated")? {
                if hydrated == SqlValue::Integer(0) && self.push(kind, &id) {
                    added += 1;
                }
            }
        }
        for relation in RELATIONS {
            for (owner_id, value) in store.project(relation.owner, relation.column)? {
                let ids = if relation.scalar {
                    match value {
                        SqlValue::Text(id) => vec![id],
                        _ => Vec::new(),
                    }
                } else {
                    match list_value(relation.owner, relation.column, &value) {
                        Ok(ids) => ids,
                        Err(e) => {
                            warn!(owner = %owner_id, error = %e, "skipping undecodable relation column");
                            continue;
                        }
                    }
                };
                for id in ids {
                    if !store.contains(relation.target, &id)? && self.push(relation.target, &id) {
                        added += 1;
                    }
                }
            }
        }
        debug!(added, "refilled queues from cache");
        Ok(added)
    }
}
