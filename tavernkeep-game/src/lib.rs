//! Tavernkeep Inn Engine
//!
//! Core simulation for the Tavernkeep inn: the shift state machine, the
//! patron lifecycle, service-capacity matching, and the payroll settlement
//! engine. The crate has no thread of execution of its own; an external,
//! unreliable tick source calls [`InnEngine::tick`] per business instance,
//! and every timing decision compares the caller's wall clock against
//! persisted timestamps. Presentation, transport, and the persistence
//! engine itself live outside this crate behind the traits defined here.

pub mod archetypes;
pub mod config;
pub mod constants;
pub mod lock;
pub mod patrons;
pub mod payroll;
pub mod persist;
pub mod rng;
pub mod service;
pub mod shift;
pub mod staff;
pub mod state;

// Re-export commonly used types
pub use archetypes::{ArchetypeList, Assets, MenuCatalog, MenuItem, PatronArchetype, builtin_assets};
pub use config::{ConfigError, Dimensions, InnConfig};
pub use lock::{LockError, LockRegistry, LockToken};
pub use patrons::{Customer, DepartureReason, PendingOrder, arrival_chance};
pub use payroll::{SettlementRecord, performance_multiplier, split_remainder};
pub use persist::{MemoryStore, PersistentStore, StoreError};
pub use rng::{CountingRng, RngBundle, entity_seed};
pub use service::{ServiceBatch, ServiceTier, compute_capacity};
pub use shift::{Transition, break_kind_for_cycle};
pub use staff::{ActorId, ContributionStats, Employee, Participant};
pub use state::{
    BreakKind, EventKind, EventTag, EventTagSet, InnState, Reputation, ShiftEvent, ShiftPhase,
};

use log::{debug, warn};
use thiserror::Error;

/// Trait for the platform's presence roster: who is physically at the inn
/// right now. Snapshots are point-in-time per tick.
pub trait PresenceProvider {
    fn present_actors(&self, location_id: &str) -> Vec<ActorId>;
}

/// Trait for the platform's stat service. A missing row is not fatal; the
/// engine substitutes zeroed stats and logs it.
pub trait StatProvider {
    fn contribution_stats(&self, actor_id: &str) -> Option<ContributionStats>;
}

/// Trait for the platform's currency ledger. Credits are fire-and-forget;
/// the engine never reads balances back.
pub trait CurrencyLedger {
    fn credit(&self, actor_id: &str, amount: i64);
}

/// Errors a tick can surface to the external caller. Everything here is
/// safe to retry on the next scheduled tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Outcome of one tick invocation.
#[derive(Debug, Clone)]
pub struct TickResult {
    pub phase: ShiftPhase,
    /// Events recorded by this invocation, oldest first.
    pub events: Vec<ShiftEvent>,
    /// Present exactly when this invocation applied a Working→Break
    /// boundary; consumed immediately by payout/report collaborators.
    pub settlement: Option<SettlementRecord>,
    /// True when another caller advanced the record first and this
    /// invocation became a no-op.
    pub stale: bool,
}

/// Main engine binding the store, the platform providers, and the lock
/// registry together.
pub struct InnEngine<S, P, T, L>
where
    S: PersistentStore,
    P: PresenceProvider,
    T: StatProvider,
    L: CurrencyLedger,
{
    store: S,
    presence: P,
    stats: T,
    ledger: L,
    cfg: InnConfig,
    assets: Assets,
    locks: LockRegistry,
    seed: u64,
}

impl<S, P, T, L> InnEngine<S, P, T, L>
where
    S: PersistentStore,
    P: PresenceProvider,
    T: StatProvider,
    L: CurrencyLedger,
{
    /// Create an engine with the built-in archetype and menu registries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration violates its bounds.
    pub fn new(
        store: S,
        presence: P,
        stats: T,
        ledger: L,
        cfg: InnConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let mut cfg = cfg;
        cfg.sanitize();
        Ok(Self {
            store,
            presence,
            stats,
            ledger,
            cfg,
            assets: builtin_assets().clone(),
            locks: LockRegistry::new(),
            seed,
        })
    }

    /// Swap in explicit registries (custom archetypes or menu).
    #[must_use]
    pub fn with_assets(mut self, assets: Assets) -> Self {
        self.assets = assets;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &InnConfig {
        &self.cfg
    }

    /// The engine-owned lock registry; exposed for tick-source plumbing.
    #[must_use]
    pub const fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Process one tick for one inn.
    ///
    /// # Errors
    ///
    /// Returns `TickError::Lock` when another invocation holds the entity
    /// and `TickError::Store` when the store is unavailable. Both are safe
    /// to retry on the next external tick.
    pub fn tick(&self, entity_id: &str, now: u64) -> Result<TickResult, TickError> {
        let token = self.locks.acquire(entity_id, now)?;
        let result = self.tick_locked(entity_id, now);
        self.locks.release(entity_id, token);
        result
    }

    fn tick_locked(&self, entity_id: &str, now: u64) -> Result<TickResult, TickError> {
        let mut state = match self.store.load(entity_id)? {
            Some(mut state) => {
                state.normalize();
                state
            }
            None => {
                debug!("first tick for {entity_id}; creating fresh record");
                InnState::new(entity_id, now)
            }
        };
        let expected_revision = state.revision;
        let watermark = state.event_seq;
        let rng = RngBundle::for_tick(self.seed, entity_id, now);

        let settlement = match shift::evaluate(&state, now) {
            None => {
                if state.phase.is_working() {
                    self.simulation_step(&mut state, &rng, now);
                }
                None
            }
            Some(Transition::EndShift { break_kind }) => {
                let (stayed, departed) = patrons::break_departure_step(
                    &mut state,
                    &self.cfg,
                    &mut *rng.overnight(),
                    now,
                );
                debug!(
                    "{entity_id}: closing for {break_kind} break ({stayed} stayed, {departed} left)"
                );
                let participants = self.gather_participants(entity_id);
                let record =
                    payroll::settle(&mut state, &participants, &mut *rng.payroll(), now);
                shift::apply_end_shift(&mut state, break_kind, now);
                Some(record)
            }
            Some(Transition::StartShift) => {
                shift::apply_start_shift(&mut state, now);
                None
            }
        };

        state.last_event_at = now;
        state.revision = expected_revision.saturating_add(1);
        if !self
            .store
            .conditional_update(entity_id, expected_revision, &state)?
        {
            // Another caller already advanced the phase; re-read and carry
            // on without reapplying anything, payouts included.
            debug!("{entity_id}: conditional update lost the race");
            let phase = self
                .store
                .load(entity_id)?
                .map_or(state.phase, |fresh| fresh.phase);
            return Ok(TickResult {
                phase,
                events: Vec::new(),
                settlement: None,
                stale: true,
            });
        }

        if let Some(record) = &settlement {
            for (actor_id, amount) in &record.shares {
                self.ledger.credit(actor_id, *amount);
            }
        }

        Ok(TickResult {
            phase: state.phase,
            events: state.events_since(watermark),
            settlement,
            stale: false,
        })
    }

    /// One Working-phase simulation step: arrivals, orders, service,
    /// departures.
    fn simulation_step(&self, state: &mut InnState, rng: &RngBundle, now: u64) {
        patrons::arrival_step(
            state,
            &self.cfg,
            &self.assets.archetypes,
            &mut *rng.arrival(),
            now,
        );
        patrons::ordering_step(state, &self.assets.menu, &mut *rng.orders(), now);
        let entity_id = state.entity_id.clone();
        let participants = self.gather_participants(&entity_id);
        let capacity = service::compute_capacity(&participants);
        service::process_orders(state, &self.cfg, capacity, now);
        patrons::departure_step(state, now);
    }

    fn gather_participants(&self, entity_id: &str) -> Vec<Participant> {
        self.presence
            .present_actors(entity_id)
            .into_iter()
            .map(|actor_id| {
                let stats = self.stats.contribution_stats(&actor_id).unwrap_or_else(|| {
                    warn!("no contribution stats for {actor_id}; using zeroes");
                    ContributionStats::default()
                });
                Participant::new(&actor_id, stats)
            })
            .collect()
    }

    /// Read-only view of the persisted record for external rendering.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the store is unavailable.
    pub fn snapshot(&self, entity_id: &str) -> Result<Option<InnState>, StoreError> {
        Ok(self.store.load(entity_id)?.map(|mut state| {
            state.normalize();
            state
        }))
    }
}
