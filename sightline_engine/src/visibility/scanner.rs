/// Visibility scanner: the per-tick distance + view-volume gate.
///
/// Each `scan()` runs three phases in strict order:
///
/// 1. **Activate**: every registered candidate within the observer's sense
///    radius whose world bounds touch the view volume gets its presentation
///    agent (created on first sight) subscribed to the broadcaster.
/// 2. **Notify**: the broadcaster fires exactly once.
/// 3. **Deactivate**: the pending-unsubscribe queue is drained and every
///    agent activated in phase 1 is unsubscribed again.
///
/// No subscription survives the tick that made it, so an entity that leaves
/// the view between two ticks is never notified on the second one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::camera::{Frustum, Observer};
use crate::config::ScannerConfig;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_err, engine_error, engine_info, engine_trace, engine_warn};
use crate::presentation::{OverlayPresenter, PresentationAgent};
use crate::scene::{Capabilities, EntityKey, World};
use super::broadcaster::VisibilityBroadcaster;

const SOURCE: &str = "sightline::Scanner";

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one `scan()` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Tick index, starting at 1 for the first scan
    pub tick: u64,
    /// Registered candidates tested this tick
    pub candidates: usize,
    /// Candidates farther than the sense radius
    pub out_of_range: usize,
    /// Candidates in range whose bounds are outside the view volume
    pub outside_view: usize,
    /// Candidates without a bounding volume
    pub invalid_candidates: usize,
    /// Candidates no longer present in the world
    pub missing_entities: usize,
    /// Visible candidates whose agent could not be created
    pub failed_activations: usize,
    /// Agents subscribed (and later unsubscribed) this tick
    pub activated: usize,
    /// Listeners invoked by this tick's `fire()`
    pub listeners_notified: usize,
}

// ============================================================================
// Scanner
// ============================================================================

pub struct VisibilityScanner {
    world: Arc<Mutex<dyn World>>,
    presenter: Arc<Mutex<dyn OverlayPresenter>>,
    broadcaster: Arc<VisibilityBroadcaster>,
    config: ScannerConfig,
    /// Registered candidates in world enumeration order
    candidates: Vec<EntityKey>,
    populated: bool,
    /// Lazily created agents, one per entity that has ever been visible
    agents: FxHashMap<EntityKey, PresentationAgent>,
    /// Entities activated this tick, drained in FIFO order
    pending_unsubscribe: VecDeque<EntityKey>,
    agents_created: u64,
    tick: u64,
    last_stats: ScanStats,
}

impl VisibilityScanner {
    /// Create a scanner with its own broadcaster.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `config` does not validate.
    pub fn new(
        world: Arc<Mutex<dyn World>>,
        presenter: Arc<Mutex<dyn OverlayPresenter>>,
        config: ScannerConfig,
    ) -> Result<Self> {
        Self::with_broadcaster(world, presenter, Arc::new(VisibilityBroadcaster::new()), config)
    }

    /// Create a scanner that fires an existing broadcaster.
    pub fn with_broadcaster(
        world: Arc<Mutex<dyn World>>,
        presenter: Arc<Mutex<dyn OverlayPresenter>>,
        broadcaster: Arc<VisibilityBroadcaster>,
        config: ScannerConfig,
    ) -> Result<Self> {
        let config = config.validated()?;
        Ok(Self {
            world,
            presenter,
            broadcaster,
            config,
            candidates: Vec::new(),
            populated: false,
            agents: FxHashMap::default(),
            pending_unsubscribe: VecDeque::new(),
            agents_created: 0,
            tick: 0,
            last_stats: ScanStats::default(),
        })
    }

    // ===== REGISTRY =====

    /// Register every active, interactable root entity of the world.
    ///
    /// Runs once; later calls leave the registry untouched and return its
    /// current size. Use [`rescan_world`](Self::rescan_world) to rebuild it.
    pub fn populate_registry(&mut self) -> Result<usize> {
        if self.populated {
            engine_debug!(SOURCE, "registry already populated ({} candidates), ignoring",
                self.candidates.len());
            return Ok(self.candidates.len());
        }

        self.candidates = self.collect_candidates()?;
        self.populated = true;
        engine_info!(SOURCE, "registered {} interactable entities", self.candidates.len());
        Ok(self.candidates.len())
    }

    /// Rebuild the registry from the world's current root entities.
    ///
    /// Agents of entities that are still registered are kept. Agents of
    /// entities that dropped out are discarded and their overlays released.
    pub fn rescan_world(&mut self) -> Result<usize> {
        let candidates = self.collect_candidates()?;
        let registered: FxHashSet<EntityKey> = candidates.iter().copied().collect();

        let stale: Vec<EntityKey> = self.agents.keys()
            .filter(|entity| !registered.contains(entity))
            .copied()
            .collect();
        for entity in &stale {
            if let Some(agent) = self.agents.remove(entity) {
                agent.release(&self.broadcaster);
            }
        }

        engine_info!(SOURCE, "rescanned world: {} candidates, {} stale agents released",
            candidates.len(), stale.len());

        self.candidates = candidates;
        self.populated = true;
        Ok(self.candidates.len())
    }

    fn collect_candidates(&self) -> Result<Vec<EntityKey>> {
        let world = self.world.lock()
            .map_err(|_| engine_err!(LockPoisoned, SOURCE, "world mutex poisoned"))?;

        Ok(world.root_entities()
            .into_iter()
            .filter(|&entity| {
                world.is_active(entity) && world.has_capability(entity, Capabilities::INTERACTABLE)
            })
            .collect())
    }

    // ===== TICK =====

    /// Run one visibility tick against `observer`.
    ///
    /// # Errors
    ///
    /// `LockPoisoned` if the world or presenter mutex is poisoned. Agents
    /// activated before the failure are deactivated and nothing is fired.
    /// Per-entity problems (missing bounds, vanished entities, overlay load
    /// failures) are logged, counted in the returned stats and skipped.
    pub fn scan(&mut self, observer: &dyn Observer) -> Result<ScanStats> {
        self.tick += 1;
        let mut stats = ScanStats {
            tick: self.tick,
            candidates: self.candidates.len(),
            ..Default::default()
        };

        let frustum = observer.frustum();
        let visible = self.visible_candidates(
            &frustum,
            observer.position(),
            observer.sense_radius(),
            &mut stats,
        )?;

        // Phase 1: activation
        for entity in visible {
            match self.activate(entity) {
                Ok(true) => {
                    self.pending_unsubscribe.push_back(entity);
                    stats.activated += 1;
                }
                Ok(false) => {}
                Err(Error::LockPoisoned(message)) => {
                    self.drain_pending();
                    return Err(Error::LockPoisoned(message));
                }
                Err(_) => stats.failed_activations += 1,
            }
        }

        // Phase 2: notification (world lock released, handlers take it themselves).
        // Phase 3: deactivation, run by the guard's drop even if a listener panics.
        let pending = DrainOnDrop { scanner: self };
        stats.listeners_notified = pending.scanner.broadcaster.fire();
        drop(pending);

        engine_trace!(SOURCE, "tick {}: {} candidates, {} activated, {} notified",
            stats.tick, stats.candidates, stats.activated, stats.listeners_notified);

        self.last_stats = stats;
        Ok(stats)
    }

    /// Distance gate then containment gate, in registry order.
    fn visible_candidates(
        &self,
        frustum: &Frustum,
        origin: Vec3,
        sense_radius: f32,
        stats: &mut ScanStats,
    ) -> Result<Vec<EntityKey>> {
        let world = self.world.lock()
            .map_err(|_| engine_err!(LockPoisoned, SOURCE, "world mutex poisoned"))?;

        let mut visible = Vec::new();
        for &entity in &self.candidates {
            let Some(position) = world.position(entity) else {
                engine_warn!(SOURCE, "registered entity {:?} no longer exists, skipping", entity);
                stats.missing_entities += 1;
                continue;
            };

            if position.distance(origin) > sense_radius {
                stats.out_of_range += 1;
                continue;
            }

            let Some(bounds) = world.world_bounds(entity) else {
                engine_error!(SOURCE, "entity {:?} has no bounding volume, skipping", entity);
                stats.invalid_candidates += 1;
                continue;
            };

            if !frustum.intersects_aabb(&bounds) {
                stats.outside_view += 1;
                continue;
            }

            visible.push(entity);
        }
        Ok(visible)
    }

    /// Get-or-create the entity's agent and subscribe it.
    fn activate(&mut self, entity: EntityKey) -> Result<bool> {
        if !self.agents.contains_key(&entity) {
            let agent = PresentationAgent::new(
                entity,
                Arc::clone(&self.world),
                Arc::clone(&self.presenter),
                &self.config,
            )?;
            self.agents.insert(entity, agent);
            self.agents_created += 1;
        }

        match self.agents.get(&entity) {
            Some(agent) => Ok(agent.activate(&self.broadcaster)),
            None => Ok(false),
        }
    }

    fn drain_pending(&mut self) {
        while let Some(entity) = self.pending_unsubscribe.pop_front() {
            if let Some(agent) = self.agents.get(&entity) {
                agent.deactivate(&self.broadcaster);
            }
        }
    }

    // ===== ACCESSORS =====

    pub fn candidates(&self) -> &[EntityKey] {
        &self.candidates
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn agent(&self, entity: EntityKey) -> Option<&PresentationAgent> {
        self.agents.get(&entity)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Total agents ever created (never decreases)
    pub fn agents_created(&self) -> u64 {
        self.agents_created
    }

    /// Entities awaiting deactivation; always empty between scans
    pub fn pending_unsubscribe_count(&self) -> usize {
        self.pending_unsubscribe.len()
    }

    pub fn broadcaster(&self) -> &Arc<VisibilityBroadcaster> {
        &self.broadcaster
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Number of scans run so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn last_stats(&self) -> ScanStats {
        self.last_stats
    }
}

/// Deactivates every pending agent when dropped
struct DrainOnDrop<'a> {
    scanner: &'a mut VisibilityScanner,
}

impl Drop for DrainOnDrop<'_> {
    fn drop(&mut self) {
        self.scanner.drain_pending();
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
