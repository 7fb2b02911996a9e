//! Headless simulation harness: drives the inn engine the way the real,
//! unreliable tick source would, with deterministic jitter, skipped
//! invocations, and duplicated boundary calls, while checking the core
//! invariants after every tick.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use tavernkeep_game::{
    ActorId, ContributionStats, CurrencyLedger, InnConfig, InnEngine, MemoryStore,
    PresenceProvider, Reputation, StatProvider,
};

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub seed: u64,
    pub inns: usize,
    pub ticks: u32,
    pub tick_interval_ms: u64,
    pub jitter_ms: u64,
    pub skip_chance: f64,
    pub verbose: bool,
}

/// Aggregate outcome of one seeded sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub inns: usize,
    pub ticks_driven: u64,
    pub cycles_completed: u64,
    pub settlements: u64,
    pub stale_ticks: u64,
    pub total_revenue: i64,
    pub total_paid: i64,
    pub dismissals: u64,
    pub violations: Vec<String>,
}

/// Rotating roster: between one and three actors present, varying by tick.
#[derive(Clone)]
struct RotatingPresence {
    actors: Vec<String>,
    phase: Arc<Mutex<usize>>,
}

impl RotatingPresence {
    fn new() -> Self {
        Self {
            actors: vec![
                "anna".to_string(),
                "bram".to_string(),
                "mira".to_string(),
            ],
            phase: Arc::new(Mutex::new(0)),
        }
    }

    fn advance(&self) {
        let mut phase = self.phase.lock().expect("phase mutex");
        *phase = (*phase + 1) % self.actors.len();
    }
}

impl PresenceProvider for RotatingPresence {
    fn present_actors(&self, _location_id: &str) -> Vec<ActorId> {
        let phase = *self.phase.lock().expect("phase mutex");
        self.actors[..=phase].to_vec()
    }
}

#[derive(Clone, Default)]
struct FixedStats(HashMap<String, ContributionStats>);

impl StatProvider for FixedStats {
    fn contribution_stats(&self, actor_id: &str) -> Option<ContributionStats> {
        self.0.get(actor_id).copied()
    }
}

#[derive(Clone, Default)]
struct TallyLedger(Arc<Mutex<i64>>);

impl TallyLedger {
    fn total(&self) -> i64 {
        *self.0.lock().expect("ledger mutex")
    }
}

impl CurrencyLedger for TallyLedger {
    fn credit(&self, _actor_id: &str, amount: i64) {
        *self.0.lock().expect("ledger mutex") += amount;
    }
}

/// Split a comma-separated argument list, dropping empty segments.
#[must_use]
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run one seeded sweep across `cfg.inns` independent inns.
#[must_use]
pub fn run_simulation(cfg: &SimConfig) -> SimReport {
    let mut stats = HashMap::new();
    stats.insert(
        "anna".to_string(),
        ContributionStats {
            speed: 12,
            perception: 8,
            luck: 3,
            strength: 5,
        },
    );
    stats.insert(
        "bram".to_string(),
        ContributionStats {
            speed: 4,
            perception: 20,
            luck: 9,
            strength: 2,
        },
    );

    let presence = RotatingPresence::new();
    let ledger = TallyLedger::default();
    let engine = InnEngine::new(
        MemoryStore::new(),
        presence.clone(),
        FixedStats(stats),
        ledger.clone(),
        InnConfig::default(),
        cfg.seed,
    )
    .expect("default config is valid");

    let mut schedule_rng = ChaCha20Rng::seed_from_u64(cfg.seed ^ 0x5EED_CAFE);
    let mut report = SimReport {
        seed: cfg.seed,
        inns: cfg.inns,
        ticks_driven: 0,
        cycles_completed: 0,
        settlements: 0,
        stale_ticks: 0,
        total_revenue: 0,
        total_paid: 0,
        dismissals: 0,
        violations: Vec::new(),
    };

    let mut clocks = vec![0u64; cfg.inns];
    let mut last_cycles = vec![0u32; cfg.inns];
    for _ in 0..cfg.ticks {
        for inn in 0..cfg.inns {
            if schedule_rng.r#gen::<f64>() < cfg.skip_chance {
                continue; // the tick source dropped this invocation
            }
            let jitter = if cfg.jitter_ms == 0 {
                0
            } else {
                schedule_rng.gen_range(0..=cfg.jitter_ms)
            };
            clocks[inn] += cfg.tick_interval_ms + jitter;
            let entity_id = format!("inn-{inn}");
            let now = clocks[inn];

            let result = match engine.tick(&entity_id, now) {
                Ok(result) => result,
                Err(err) => {
                    report
                        .violations
                        .push(format!("{entity_id}@{now}: tick failed: {err}"));
                    continue;
                }
            };
            report.ticks_driven += 1;
            if result.stale {
                report.stale_ticks += 1;
            }
            if let Some(record) = &result.settlement {
                report.settlements += 1;
                report.total_revenue += record.total_revenue + record.total_adjustments;
                report.total_paid += record.total_paid();
                if record.employees_dismissed {
                    report.dismissals += 1;
                }
                if cfg.verbose {
                    println!(
                        "    {entity_id}@{now}: settled {} coins across {} share(s)",
                        record.total_paid(),
                        record.shares.len()
                    );
                }
                // Occasionally duplicate the boundary call; the second
                // invocation must never settle again.
                if schedule_rng.r#gen::<f64>() < 0.25 {
                    match engine.tick(&entity_id, now) {
                        Ok(dup) if dup.settlement.is_some() => report
                            .violations
                            .push(format!("{entity_id}@{now}: duplicate tick settled twice")),
                        Ok(_) => {}
                        Err(err) => report
                            .violations
                            .push(format!("{entity_id}@{now}: duplicate tick failed: {err}")),
                    }
                }
            }

            check_invariants(&engine, &entity_id, now, inn, &mut last_cycles, &mut report);
        }
        presence.advance();
    }

    debug!(
        "seed {} drove {} ticks, credited {} coins",
        cfg.seed,
        report.ticks_driven,
        ledger.total()
    );
    report.cycles_completed = u64::from(*last_cycles.iter().max().unwrap_or(&0));
    report
}

fn check_invariants(
    engine: &InnEngine<MemoryStore, RotatingPresence, FixedStats, TallyLedger>,
    entity_id: &str,
    now: u64,
    inn: usize,
    last_cycles: &mut [u32],
    report: &mut SimReport,
) {
    let state = match engine.snapshot(entity_id) {
        Ok(Some(state)) => state,
        Ok(None) => return,
        Err(err) => {
            report
                .violations
                .push(format!("{entity_id}@{now}: snapshot failed: {err}"));
            return;
        }
    };
    let rep = state.reputation.value();
    if !(Reputation::MIN..=Reputation::MAX).contains(&rep) {
        report
            .violations
            .push(format!("{entity_id}@{now}: reputation {rep} out of bounds"));
    }
    for customer in &state.customers {
        if customer.wealth < 0 {
            report.violations.push(format!(
                "{entity_id}@{now}: customer {} wealth {} negative",
                customer.id, customer.wealth
            ));
        }
    }
    if state.live_customer_count() > engine.config().max_customers as usize {
        report.violations.push(format!(
            "{entity_id}@{now}: population {} over cap",
            state.live_customer_count()
        ));
    }
    if state.cycle_count < last_cycles[inn] {
        report.violations.push(format!(
            "{entity_id}@{now}: cycle count regressed {} -> {}",
            last_cycles[inn], state.cycle_count
        ));
    }
    last_cycles[inn] = state.cycle_count;
}
