// SPDX-FileCopyrightText: 2026 Dragon Bridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduling engine: the authoritative in-memory item map for the
//! active profile.
//!
//! Reads and mutations are synchronous and never touch storage directly.
//! Mutations enqueue writes on the [`PersistQueue`], tagged with the profile
//! that was active when the mutation happened.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::sync::broadcast::error::RecvError;
use tracing::{Instrument, debug, info, warn};

use dragon_bus::{BusEvent, EventBus};
use dragon_core::types::{ActivityEvent, Grade, HistoryEntry, ItemType, MAX_BOX, ReviewItem};
use dragon_core::{Clock, StorageBackend};

use crate::algorithm::{clamp_box, next_box, next_due};
use crate::persist::{PersistOp, PersistQueue};

/// Options for [`SchedulingEngine::add_item`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Starting box, clamped into range. Defaults to the first box.
    pub initial_box: Option<i64>,
}

/// Result of [`SchedulingEngine::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(ReviewItem),
    /// The key was already present; nothing changed.
    Existing(ReviewItem),
}

impl AddOutcome {
    pub fn item(&self) -> &ReviewItem {
        match self {
            AddOutcome::Added(item) | AddOutcome::Existing(item) => item,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added(_))
    }
}

/// A snapshot of due items, ordered by `due`, then `added_at`, then key.
///
/// Iterating does not consume the queue, so it can be walked any number of
/// times with the same result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQueue {
    items: Vec<ReviewItem>,
}

impl ReviewQueue {
    pub fn iter(&self) -> std::slice::Iter<'_, ReviewItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&ReviewItem> {
        self.items.first()
    }

    pub fn into_vec(self) -> Vec<ReviewItem> {
        self.items
    }
}

impl<'a> IntoIterator for &'a ReviewQueue {
    type Item = &'a ReviewItem;
    type IntoIter = std::slice::Iter<'a, ReviewItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Totals for the active profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub due: usize,
    /// Item count per box; index 0 is box 1.
    pub per_box: [usize; MAX_BOX as usize],
}

#[derive(Debug, Default)]
struct EngineState {
    profile: Option<String>,
    items: HashMap<String, ReviewItem>,
    /// Bumped on every profile switch; a reload for an older generation is stale.
    generation: u64,
    /// True between a switch and the completion of its reload.
    loading: bool,
    /// Keys removed while a reload was in flight.
    removed_while_loading: HashSet<String>,
}

/// Spaced-repetition scheduler for one process.
pub struct SchedulingEngine {
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    writer: PersistQueue,
    state: RwLock<EngineState>,
}

impl SchedulingEngine {
    /// Build an engine, hydrate it for the backend's current profile and
    /// subscribe it to profile changes on `bus`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        let engine = Arc::new(Self::new(backend, clock, bus.clone()));
        // Subscribe before hydrating so a switch during startup is not missed.
        let rx = bus.subscribe();
        spawn_listener(Arc::downgrade(&engine), rx);

        let current = match engine.backend.profiles_get_current().await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "could not read current profile, using unscoped state");
                None
            }
        };
        engine.switch_profile(current).await;
        engine
    }

    /// Build an engine with an empty map and no listener.
    pub fn new(backend: Arc<dyn StorageBackend>, clock: Arc<dyn Clock>, bus: Arc<EventBus>) -> Self {
        let writer = PersistQueue::spawn(backend.clone(), bus);
        Self {
            backend,
            clock,
            writer,
            state: RwLock::new(EngineState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The profile whose items are in memory.
    pub fn profile(&self) -> Option<String> {
        self.read().profile.clone()
    }

    /// True while a profile switch is waiting for its reload.
    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    // --- Mutations ---

    /// Start tracking `text`. A key that is already present is left untouched.
    pub fn add_item(&self, text: &str, item_type: ItemType, options: AddOptions) -> AddOutcome {
        let key = ReviewItem::key_for(item_type, text);
        let now = self.now();

        let (item, profile) = {
            let mut state = self.write();
            if let Some(existing) = state.items.get(&key) {
                return AddOutcome::Existing(existing.clone());
            }
            let srs_box = clamp_box(options.initial_box.unwrap_or(1));
            let item = ReviewItem {
                key: key.clone(),
                text: text.to_string(),
                item_type,
                srs_box,
                due: next_due(now, srs_box),
                added_at: now,
                history: Vec::new(),
            };
            state.items.insert(key.clone(), item.clone());
            state.removed_while_loading.remove(&key);
            (item, state.profile.clone())
        };

        debug!(key = %key, srs_box = item.srs_box, "item added");
        self.writer.enqueue(PersistOp::UpsertItem {
            item: item.clone(),
            profile: profile.clone(),
        });
        self.writer.enqueue(PersistOp::AppendEvent {
            event: ActivityEvent::SrsAdd { key, t: now },
            profile,
        });
        AddOutcome::Added(item)
    }

    /// Apply a grade. Returns the updated item, or `None` if `key` is absent.
    pub fn grade_item(&self, key: &str, grade: Grade) -> Option<ReviewItem> {
        let now = self.now();

        let (updated, profile) = {
            let mut guard = self.write();
            let state = &mut *guard;
            let item = state.items.get_mut(key)?;
            item.srs_box = next_box(item.srs_box, grade);
            item.due = next_due(now, item.srs_box);
            item.history.push(HistoryEntry { t: now, grade });
            (item.clone(), state.profile.clone())
        };

        debug!(key, %grade, srs_box = updated.srs_box, "item graded");
        self.writer.enqueue(PersistOp::UpsertItem {
            item: updated.clone(),
            profile: profile.clone(),
        });
        self.writer.enqueue(PersistOp::AppendEvent {
            event: ActivityEvent::SrsGrade {
                key: key.to_string(),
                grade,
                t: now,
            },
            profile,
        });
        Some(updated)
    }

    /// Stop tracking `key`. Returns the removed item; absent keys are a no-op
    /// in memory but the delete is still sent to storage.
    pub fn remove_item(&self, key: &str) -> Option<ReviewItem> {
        let (removed, profile) = {
            let mut state = self.write();
            let removed = state.items.remove(key);
            if state.loading {
                state.removed_while_loading.insert(key.to_string());
            }
            (removed, state.profile.clone())
        };

        self.writer.enqueue(PersistOp::RemoveItem {
            key: key.to_string(),
            profile,
        });
        removed
    }

    /// Append an activity event for the active profile.
    pub fn log_event(&self, event: ActivityEvent) {
        let profile = self.profile();
        self.writer.enqueue(PersistOp::AppendEvent { event, profile });
    }

    // --- Reads ---

    /// Items with `due <= now`, ascending by due date.
    pub fn list_due(&self, now: i64) -> ReviewQueue {
        let mut items: Vec<ReviewItem> = self
            .read()
            .items
            .values()
            .filter(|item| item.is_due(now))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            (a.due, a.added_at, &a.key).cmp(&(b.due, b.added_at, &b.key))
        });
        ReviewQueue { items }
    }

    /// Every item, oldest first.
    pub fn list_all(&self) -> Vec<ReviewItem> {
        let mut items: Vec<ReviewItem> = self.read().items.values().cloned().collect();
        items.sort_by(|a, b| (a.added_at, &a.key).cmp(&(b.added_at, &b.key)));
        items
    }

    /// Items due at the engine clock's current time.
    pub fn due_items(&self) -> ReviewQueue {
        self.list_due(self.now())
    }

    pub fn all_items(&self) -> Vec<ReviewItem> {
        self.list_all()
    }

    /// A copy of the key → item map.
    pub fn items(&self) -> HashMap<String, ReviewItem> {
        self.read().items.clone()
    }

    pub fn get(&self, key: &str) -> Option<ReviewItem> {
        self.read().items.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    pub fn stats(&self, now: i64) -> Stats {
        let state = self.read();
        let mut stats = Stats {
            total: state.items.len(),
            ..Stats::default()
        };
        for item in state.items.values() {
            if item.is_due(now) {
                stats.due += 1;
            }
            let idx = usize::from(clamp_box(i64::from(item.srs_box))) - 1;
            stats.per_box[idx] += 1;
        }
        stats
    }

    // --- Lifecycle ---

    /// Replace the in-memory state with `profile`'s items.
    ///
    /// The map is cleared and the new profile recorded before the load
    /// starts. Items added while the load is in flight are kept on top of
    /// the loaded snapshot; a load overtaken by a newer switch is dropped.
    pub async fn switch_profile(&self, profile: Option<String>) {
        let generation = {
            let mut state = self.write();
            state.generation += 1;
            state.profile = profile.clone();
            state.items.clear();
            state.loading = true;
            state.removed_while_loading.clear();
            state.generation
        };

        // Writes issued before the switch must be visible to the reload.
        self.writer.flush().await;

        let loaded = match self.backend.items_load_all(profile.as_deref()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(profile = ?profile, error = %e, "failed to load items, starting empty");
                HashMap::new()
            }
        };

        let mut state = self.write();
        if state.generation != generation {
            debug!(profile = ?profile, "discarding stale reload");
            return;
        }
        let added_during_load = std::mem::take(&mut state.items);
        let removed = std::mem::take(&mut state.removed_while_loading);
        let mut items: HashMap<String, ReviewItem> = loaded
            .into_iter()
            .filter(|(key, _)| !removed.contains(key))
            .collect();
        items.extend(added_during_load);
        state.items = items;
        state.loading = false;
        info!(profile = ?profile, items = state.items.len(), "engine hydrated");
    }

    /// Wait for every queued write to reach storage (or fail).
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// The persistence queue, for counters.
    pub fn writer(&self) -> &PersistQueue {
        &self.writer
    }
}

/// Follow `ProfileChanged` on the bus until the engine or the bus goes away.
fn spawn_listener(engine: Weak<SchedulingEngine>, mut rx: tokio::sync::broadcast::Receiver<BusEvent>) {
    tokio::spawn(async move {
        loop {
            let target = match rx.recv().await {
                Ok(BusEvent::ProfileChanged { current, .. }) => Some(current),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "profile listener lagged, re-reading current profile");
                    let Some(engine) = engine.upgrade() else { break };
                    match engine.backend.profiles_get_current().await {
                        // Already showing that profile; a reload would only blank the map.
                        Ok(current) if current == engine.profile() => continue,
                        Ok(current) => current,
                        Err(e) => {
                            warn!(error = %e, "could not read current profile");
                            continue;
                        }
                    }
                }
                Err(RecvError::Closed) => break,
            };

            let Some(engine) = engine.upgrade() else { break };
            engine.switch_profile(target).await;
        }
        debug!("profile listener stopped");
    }
    .in_current_span());
}
