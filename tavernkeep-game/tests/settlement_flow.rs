//! Payroll settlement driven through the engine at real phase boundaries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tavernkeep_game::constants::WORK_DURATION_MS;
use tavernkeep_game::{
    ActorId, ContributionStats, CurrencyLedger, Employee, InnConfig, InnEngine, InnState,
    MemoryStore, PersistentStore, PresenceProvider, StatProvider,
};

#[derive(Clone, Default)]
struct Presence(Vec<String>);

impl PresenceProvider for Presence {
    fn present_actors(&self, _location_id: &str) -> Vec<ActorId> {
        self.0.clone()
    }
}

#[derive(Clone, Default)]
struct Stats(HashMap<String, ContributionStats>);

impl StatProvider for Stats {
    fn contribution_stats(&self, actor_id: &str) -> Option<ContributionStats> {
        self.0.get(actor_id).copied()
    }
}

#[derive(Clone, Default)]
struct Ledger(Arc<Mutex<Vec<(String, i64)>>>);

impl Ledger {
    fn total(&self) -> i64 {
        self.0
            .lock()
            .expect("ledger mutex")
            .iter()
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl CurrencyLedger for Ledger {
    fn credit(&self, actor_id: &str, amount: i64) {
        self.0
            .lock()
            .expect("ledger mutex")
            .push((actor_id.to_string(), amount));
    }
}

fn seed_record(store: &MemoryStore, revenue: i64, wages: &[i64]) {
    let mut state = InnState::new("inn-1", 0);
    state.accrued_revenue = revenue;
    for (index, wage) in wages.iter().enumerate() {
        state
            .employees
            .push(Employee::hired(&format!("staff-{index}"), *wage));
    }
    state.revision = 1;
    assert!(
        store
            .conditional_update("inn-1", 0, &state)
            .expect("store ok")
    );
}

fn engine_over(
    store: &MemoryStore,
    present: &[&str],
) -> (
    InnEngine<MemoryStore, Presence, Stats, Ledger>,
    Ledger,
) {
    let ledger = Ledger::default();
    let engine = InnEngine::new(
        store.clone(),
        Presence(present.iter().map(|s| (*s).to_string()).collect()),
        Stats::default(),
        ledger.clone(),
        InnConfig::default(),
        99,
    )
    .expect("valid config");
    (engine, ledger)
}

#[test]
fn reference_settlement_doubles_the_top_performer() {
    // revenue 100, wages 3 x 10, two stat-less participants.
    let store = MemoryStore::new();
    seed_record(&store, 100, &[10, 10, 10]);
    let (engine, ledger) = engine_over(&store, &["anna", "bram"]);

    let result = engine.tick("inn-1", WORK_DURATION_MS).expect("boundary");
    let record = result.settlement.expect("settlement");

    assert_eq!(record.wages_paid, 30);
    assert!(!record.employees_dismissed);
    let amounts: Vec<i64> = record.shares.iter().map(|(_, a)| *a).collect();
    let mut sorted = amounts.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![35, 70], "one share doubled, one untouched");
    assert_eq!(record.total_paid(), 105);
    assert_eq!(ledger.total(), 105, "credits mirror the record exactly");
    assert!(record.top_performer.is_some());
}

#[test]
fn underwater_revenue_dismisses_staff_and_distributes_everything() {
    let store = MemoryStore::new();
    seed_record(&store, 25, &[10, 10, 10]);
    let (engine, ledger) = engine_over(&store, &["anna"]);

    let result = engine.tick("inn-1", WORK_DURATION_MS).expect("boundary");
    let record = result.settlement.expect("settlement");

    assert!(record.employees_dismissed);
    assert_eq!(record.wages_paid, 0);
    assert_eq!(record.shares, vec![("anna".to_string(), 25)]);
    assert_eq!(ledger.total(), 25);

    let state = engine.snapshot("inn-1").expect("load").expect("exists");
    assert!(state.employees.is_empty(), "dismissal persisted");
}

#[test]
fn single_participant_receives_the_exact_remainder() {
    for revenue in [0i64, 1, 37, 70, 99] {
        let store = MemoryStore::new();
        seed_record(&store, revenue, &[]);
        let (engine, ledger) = engine_over(&store, &["solo"]);
        let result = engine.tick("inn-1", WORK_DURATION_MS).expect("boundary");
        let record = result.settlement.expect("settlement");
        assert!(record.top_performer.is_none());
        assert_eq!(record.total_paid(), revenue, "no loss, no bonus");
        assert_eq!(ledger.total(), revenue);
    }
}

#[test]
fn stat_bonuses_scale_individual_payouts() {
    let store = MemoryStore::new();
    seed_record(&store, 200, &[]);
    let ledger = Ledger::default();
    let mut stat_rows = HashMap::new();
    stat_rows.insert(
        "quick".to_string(),
        ContributionStats {
            speed: 20,
            ..ContributionStats::default()
        },
    );
    let engine = InnEngine::new(
        store.clone(),
        Presence(vec!["quick".to_string(), "plain".to_string()]),
        Stats(stat_rows),
        ledger.clone(),
        InnConfig::default(),
        99,
    )
    .expect("valid config");

    let result = engine.tick("inn-1", WORK_DURATION_MS).expect("boundary");
    let record = result.settlement.expect("settlement");
    let by_actor: HashMap<&str, i64> = record
        .shares
        .iter()
        .map(|(actor, amount)| (actor.as_str(), *amount))
        .collect();
    // 200 / 2 = 100 base each; speed 20 adds a 10% multiplier.
    let quick = by_actor["quick"];
    let plain = by_actor["plain"];
    let quick_base = if record.top_performer.as_deref() == Some("quick") {
        quick / 2
    } else {
        quick
    };
    let plain_base = if record.top_performer.as_deref() == Some("plain") {
        plain / 2
    } else {
        plain
    };
    assert_eq!(quick_base, 110);
    assert_eq!(plain_base, 100);
}

#[test]
fn non_boundary_ticks_never_settle() {
    let store = MemoryStore::new();
    seed_record(&store, 500, &[]);
    let (engine, ledger) = engine_over(&store, &["anna"]);
    for now in [1u64, 60_000, WORK_DURATION_MS - 1] {
        let result = engine.tick("inn-1", now).expect("tick");
        assert!(result.settlement.is_none());
    }
    assert_eq!(ledger.total(), 0, "no credits outside a boundary");
}

#[test]
fn counters_reset_when_the_break_ends() {
    let store = MemoryStore::new();
    seed_record(&store, 80, &[]);
    let (engine, _ledger) = engine_over(&store, &["anna"]);

    let result = engine.tick("inn-1", WORK_DURATION_MS).expect("boundary");
    let kind = result.phase.break_kind().expect("break");
    let state = engine.snapshot("inn-1").expect("load").expect("exists");
    assert_eq!(state.accrued_revenue, 80, "counters survive into the break");

    let reopened = engine
        .tick("inn-1", WORK_DURATION_MS + kind.duration_ms())
        .expect("break over");
    assert!(reopened.phase.is_working());
    let state = engine.snapshot("inn-1").expect("load").expect("exists");
    assert_eq!(state.accrued_revenue, 0);
    assert_eq!(state.accrued_adjustments, 0);
}
