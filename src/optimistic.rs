use std::{collections::HashMap, hash::Hash};

/// Pre-mutation snapshots of entities whose mutation is still in flight.
/// An entity present here blocks another mutation until it settles.
#[derive(Debug, Clone)]
pub struct InFlight<K, S> {
    snapshots: HashMap<K, S>,
}

impl<K: Eq + Hash, S> Default for InFlight<K, S> {
    fn default() -> Self {
        Self {
            snapshots: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, S> InFlight<K, S> {
    /// Returns false if a mutation on `key` has not settled yet.
    pub fn begin(&mut self, key: K, snapshot: S) -> bool {
        if self.snapshots.contains_key(&key) {
            return false;
        }
        self.snapshots.insert(key, snapshot);
        true
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.snapshots.contains_key(key)
    }

    /// Ends the mutation and hands back its snapshot.
    pub fn settle(&mut self, key: &K) -> Option<S> {
        self.snapshots.remove(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeState {
    pub count: u32,
    pub liked: bool,
}

impl LikeState {
    pub fn new(count: u32, liked: bool) -> Self {
        Self { count, liked }
    }

    pub fn toggled(self) -> Self {
        if self.liked {
            Self::new(self.count.saturating_sub(1), false)
        } else {
            Self::new(self.count.saturating_add(1), true)
        }
    }

    pub fn merge(self, count: Option<u32>, liked: Option<bool>) -> Self {
        Self {
            count: count.unwrap_or(self.count),
            liked: liked.unwrap_or(self.liked),
        }
    }
}

/// Like state per entity plus the optimistic toggles in flight.
#[derive(Debug, Clone)]
pub struct LikeBook<K> {
    states: HashMap<K, LikeState>,
    in_flight: InFlight<K, LikeState>,
}

impl<K: Eq + Hash> Default for LikeBook<K> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            in_flight: InFlight::default(),
        }
    }
}

impl<K: Eq + Hash + Copy> LikeBook<K> {
    pub fn get(&self, key: &K) -> LikeState {
        self.states.get(key).copied().unwrap_or_default()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.states.contains_key(key)
    }

    pub fn set(&mut self, key: K, state: LikeState) {
        self.states.insert(key, state);
    }

    pub fn merge(&mut self, key: K, count: Option<u32>, liked: Option<bool>) {
        let state = self.get(&key).merge(count, liked);
        self.states.insert(key, state);
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.in_flight.is_pending(key)
    }

    /// Applies the toggle locally and returns the new state, or `None`
    /// while a previous toggle on the same entity is unsettled.
    pub fn begin_toggle(&mut self, key: K) -> Option<LikeState> {
        let current = self.get(&key);
        if !self.in_flight.begin(key, current) {
            return None;
        }
        let next = current.toggled();
        self.states.insert(key, next);
        Some(next)
    }

    /// Settles a toggle with the authoritative state read back from the server.
    pub fn commit(&mut self, key: K, server: LikeState) {
        if self.in_flight.settle(&key).is_some() {
            self.states.insert(key, server);
        }
    }

    /// Restores the exact pre-toggle snapshot.
    pub fn rollback(&mut self, key: K) -> Option<LikeState> {
        let snapshot = self.in_flight.settle(&key)?;
        self.states.insert(key, snapshot);
        Some(snapshot)
    }

    pub fn remove(&mut self, key: &K) {
        self.states.remove(key);
        self.in_flight.settle(key);
    }

    /// Rebuilds every state; toggles in flight keep their optimistic value.
    pub fn reset(&mut self, states: impl IntoIterator<Item = (K, LikeState)>) {
        let pending: Vec<(K, LikeState)> = self
            .states
            .iter()
            .filter(|(key, _)| self.in_flight.is_pending(key))
            .map(|(key, state)| (*key, *state))
            .collect();
        self.states = states.into_iter().collect();
        self.states.extend(pending);
    }
}
