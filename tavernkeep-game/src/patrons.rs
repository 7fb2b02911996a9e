//! Patron lifecycle: arrival, ordering, departure, and overnight stays.
//!
//! All rolls draw from injected RNG streams; nothing here touches an
//! ambient random source. Every mutation leaves the record's invariants
//! intact: wealth never goes negative and exactly one departure path
//! applies to a customer per tick.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::archetypes::{ArchetypeList, MenuCatalog};
use crate::config::InnConfig;
use crate::constants::{
    DEPARTURE_REPUTATION_GAIN, HAPPINESS_SEED_MAX, HAPPINESS_SEED_MIN, HAPPY_DEPARTURE_MIN,
    MAX_VISIT_MS, ORDER_SPACING_MS, OVERNIGHT_HAPPINESS_GAIN, OVERNIGHT_MIN_HAPPINESS,
    OVERNIGHT_STAY_CHANCE, REPUTATION_MIDPOINT, STORM_OUT_BASE_PENALTY,
    STORM_OUT_PENALTY_DIVISOR, STORM_OUT_THRESHOLD,
};
use crate::state::{EventKind, InnState};

/// A transient guest of the inn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u64,
    pub archetype_id: String,
    /// Mood, held in `[0, 100]`.
    pub happiness: i32,
    /// Coins on hand; never negative.
    pub wealth: i64,
    pub arrived_at: u64,
    #[serde(default)]
    pub orders_placed: u32,
    #[serde(default)]
    pub orders_fulfilled: u32,
    /// Last instant an order attempt was made; zero means never.
    #[serde(default)]
    pub last_order_attempt_at: u64,
}

impl Customer {
    pub fn clamp(&mut self) {
        self.happiness = self.happiness.clamp(0, 100);
        self.wealth = self.wealth.max(0);
    }

    #[must_use]
    pub const fn is_happy(&self) -> bool {
        self.happiness >= HAPPY_DEPARTURE_MIN
    }

    #[cfg(test)]
    pub(crate) fn sample(id: u64, archetype_id: &str, wealth: i64) -> Self {
        Self {
            id,
            archetype_id: archetype_id.to_string(),
            happiness: 55,
            wealth,
            arrived_at: 0,
            orders_placed: 0,
            orders_fulfilled: 0,
            last_order_attempt_at: 0,
        }
    }
}

/// An order waiting in the FIFO service queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub customer_id: u64,
    pub item_id: String,
    pub price: i64,
    pub placed_at: u64,
}

/// Why a patron left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureReason {
    /// Spent every last coin.
    Broke,
    /// Misery crossed the storm-out line; reputation takes the hit.
    StormedOut,
    /// Stayed out their welcome and wandered off content.
    VisitOver,
    /// Sent home when the inn closed for a break.
    Closing,
}

impl DepartureReason {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Broke => "broke",
            Self::StormedOut => "stormed_out",
            Self::VisitOver => "visit_over",
            Self::Closing => "closing",
        }
    }
}

/// Arrival probability for the current reputation, clipped to the
/// configured floor and ceiling.
#[must_use]
pub fn arrival_chance(cfg: &InnConfig, reputation: i32) -> f32 {
    let swing = (reputation - REPUTATION_MIDPOINT) as f32 / 100.0;
    (cfg.base_arrival_chance + swing).clamp(cfg.arrival_floor, cfg.arrival_ceiling)
}

/// Roll for one arrival. Working phase only; the caller guards the phase.
pub fn arrival_step(
    state: &mut InnState,
    cfg: &InnConfig,
    archetypes: &ArchetypeList,
    rng: &mut impl Rng,
    now: u64,
) -> Option<u64> {
    if state.live_customer_count() >= cfg.max_customers as usize {
        return None;
    }
    let chance = arrival_chance(cfg, state.reputation.value());
    if rng.r#gen::<f32>() >= chance {
        return None;
    }
    let archetype = archetypes.pick(rng)?;
    let id = state.allocate_customer_id();
    let happiness = rng.gen_range(HAPPINESS_SEED_MIN..=HAPPINESS_SEED_MAX);
    state.customers.push(Customer {
        id,
        archetype_id: archetype.id.clone(),
        happiness,
        wealth: archetype.base_wealth,
        arrived_at: now,
        orders_placed: 0,
        orders_fulfilled: 0,
        last_order_attempt_at: 0,
    });
    state.push_event(
        now,
        EventKind::PatronArrived {
            customer_id: id,
            archetype_id: archetype.id.clone(),
        },
    );
    debug!("patron {id} ({}) arrived at {}", archetype.id, state.entity_id);
    Some(id)
}

/// Let idle customers attempt orders, spaced by the minimum interval and
/// gated on mood. Returns the number of orders placed.
pub fn ordering_step(
    state: &mut InnState,
    catalog: &MenuCatalog,
    rng: &mut impl Rng,
    now: u64,
) -> u32 {
    let candidates: Vec<u64> = state
        .customers
        .iter()
        .filter(|c| {
            !state.has_active_order(c.id)
                && (c.last_order_attempt_at == 0
                    || now.saturating_sub(c.last_order_attempt_at) >= ORDER_SPACING_MS)
        })
        .map(|c| c.id)
        .collect();

    let mut placed = 0;
    for customer_id in candidates {
        let Some(customer) = state.customer_mut(customer_id) else {
            continue;
        };
        customer.last_order_attempt_at = now;
        let appetite = customer.happiness.clamp(0, 100) as f32 / 100.0;
        if rng.r#gen::<f32>() >= appetite {
            continue;
        }
        let Some((item, price)) = catalog.draw_order(rng) else {
            continue;
        };
        let item_id = item.id.clone();
        let Some(customer) = state.customer_mut(customer_id) else {
            continue;
        };
        customer.orders_placed = customer.orders_placed.saturating_add(1);
        state.order_queue.push_back(PendingOrder {
            customer_id,
            item_id: item_id.clone(),
            price,
            placed_at: now,
        });
        state.push_event(
            now,
            EventKind::OrderPlaced {
                customer_id,
                item_id,
                price,
            },
        );
        placed += 1;
    }
    placed
}

/// Apply the standard departure rules. Exactly one path fires per customer:
/// broke, stormed out, or overstayed, in that order of precedence.
pub fn departure_step(state: &mut InnState, now: u64) -> u32 {
    let ids: Vec<u64> = state.customers.iter().map(|c| c.id).collect();
    let mut departed = 0;
    for customer_id in ids {
        let Some(customer) = state.customer(customer_id) else {
            continue;
        };
        let reason = if customer.wealth == 0 {
            DepartureReason::Broke
        } else if customer.happiness <= STORM_OUT_THRESHOLD {
            DepartureReason::StormedOut
        } else if now.saturating_sub(customer.arrived_at) >= MAX_VISIT_MS {
            DepartureReason::VisitOver
        } else {
            continue;
        };
        depart(state, customer_id, reason, now);
        departed += 1;
    }
    departed
}

/// Break-entry pass: qualified patrons may pay to stay the night; everyone
/// else leaves through the standard rule. This is the only phase-specific
/// departure variant, and each customer takes exactly one of the two paths.
pub fn break_departure_step(
    state: &mut InnState,
    cfg: &InnConfig,
    rng: &mut impl Rng,
    now: u64,
) -> (u32, u32) {
    let ids: Vec<u64> = state.customers.iter().map(|c| c.id).collect();
    let mut stayed = 0;
    let mut departed = 0;
    for customer_id in ids {
        let Some((happiness, wealth)) = state
            .customer(customer_id)
            .map(|c| (c.happiness, c.wealth))
        else {
            continue;
        };
        let qualifies = happiness >= OVERNIGHT_MIN_HAPPINESS && wealth > cfg.overnight_fee;
        if qualifies && rng.r#gen::<f32>() < OVERNIGHT_STAY_CHANCE {
            let fee = cfg.overnight_fee;
            if let Some(customer) = state.customer_mut(customer_id) {
                customer.wealth -= fee;
                customer.happiness = (customer.happiness + OVERNIGHT_HAPPINESS_GAIN).clamp(0, 100);
            }
            state.accrued_adjustments = state.accrued_adjustments.saturating_add(fee);
            state.push_event(now, EventKind::OvernightStay { customer_id, fee });
            stayed += 1;
            continue;
        }
        let reason = if wealth == 0 {
            DepartureReason::Broke
        } else if happiness <= STORM_OUT_THRESHOLD {
            DepartureReason::StormedOut
        } else {
            DepartureReason::Closing
        };
        depart(state, customer_id, reason, now);
        departed += 1;
    }
    (stayed, departed)
}

fn depart(state: &mut InnState, customer_id: u64, reason: DepartureReason, now: u64) {
    let Some(customer) = state.remove_customer(customer_id) else {
        return;
    };
    match reason {
        DepartureReason::StormedOut => {
            let misery = (STORM_OUT_THRESHOLD - customer.happiness).max(0);
            let penalty = STORM_OUT_BASE_PENALTY + misery / STORM_OUT_PENALTY_DIVISOR;
            state.reputation.apply(-penalty);
        }
        DepartureReason::Broke | DepartureReason::VisitOver | DepartureReason::Closing => {
            if customer.is_happy() {
                state.reputation.apply(DEPARTURE_REPUTATION_GAIN);
            }
        }
    }
    state.push_event(now, EventKind::PatronDeparted { customer_id, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Reputation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn catalog() -> MenuCatalog {
        MenuCatalog::from_json(
            r#"{ "ale": { "name": "Ale", "weight": 1, "min_price": 2, "max_price": 3 } }"#,
        )
        .unwrap()
    }

    #[test]
    fn arrival_chance_clips_to_bounds() {
        let cfg = InnConfig::default();
        let floor = arrival_chance(&cfg, 0);
        let ceiling = arrival_chance(&cfg, 100);
        assert!((floor - cfg.arrival_floor).abs() < f32::EPSILON);
        assert!((ceiling - 0.75).abs() < f32::EPSILON);
        let midpoint = arrival_chance(&cfg, 50);
        assert!((midpoint - cfg.base_arrival_chance).abs() < f32::EPSILON);
    }

    #[test]
    fn arrivals_respect_population_cap() {
        let cfg = InnConfig {
            max_customers: 1,
            ..InnConfig::default()
        };
        let archetypes = ArchetypeList::from_json(
            r#"{ "farmhand": { "name": "Farmhand", "weight": 1, "base_wealth": 10 } }"#,
        )
        .unwrap();
        let mut state = InnState::new("inn-1", 0);
        state.customers.push(Customer::sample(1, "farmhand", 10));
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(arrival_step(&mut state, &cfg, &archetypes, &mut rng, 100).is_none());
        assert_eq!(state.live_customer_count(), 1);
    }

    #[test]
    fn order_attempts_are_spaced() {
        let mut state = InnState::new("inn-1", 0);
        let mut patron = Customer::sample(1, "farmhand", 50);
        patron.happiness = 100;
        state.customers.push(patron);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let placed = ordering_step(&mut state, &catalog(), &mut rng, 1_000);
        assert_eq!(placed, 1);
        // Second attempt inside the spacing window is skipped even though
        // the first order is still queued.
        state.order_queue.clear();
        let placed = ordering_step(&mut state, &catalog(), &mut rng, 2_000);
        assert_eq!(placed, 0);
        let placed = ordering_step(&mut state, &catalog(), &mut rng, 1_000 + ORDER_SPACING_MS);
        assert_eq!(placed, 1);
    }

    #[test]
    fn active_order_blocks_new_attempts() {
        let mut state = InnState::new("inn-1", 0);
        let mut patron = Customer::sample(1, "farmhand", 50);
        patron.happiness = 100;
        state.customers.push(patron);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_eq!(ordering_step(&mut state, &catalog(), &mut rng, 1_000), 1);
        assert_eq!(
            ordering_step(&mut state, &catalog(), &mut rng, 1_000 + ORDER_SPACING_MS),
            0
        );
    }

    #[test]
    fn broke_customer_departs_with_goodwill() {
        let mut state = InnState::new("inn-1", 0);
        let mut patron = Customer::sample(1, "farmhand", 0);
        patron.happiness = 80;
        state.customers.push(patron);
        let before = state.reputation.value();
        let departed = departure_step(&mut state, 10);
        assert_eq!(departed, 1);
        assert!(state.customers.is_empty());
        assert_eq!(state.reputation.value(), before + DEPARTURE_REPUTATION_GAIN);
    }

    #[test]
    fn storm_out_penalty_scales_with_misery() {
        let mut state = InnState::new("inn-1", 0);
        state.reputation = Reputation::new(50);
        let mut patron = Customer::sample(1, "farmhand", 5);
        patron.happiness = 0;
        state.customers.push(patron);
        departure_step(&mut state, 10);
        let flat_penalty = STORM_OUT_BASE_PENALTY + STORM_OUT_THRESHOLD / STORM_OUT_PENALTY_DIVISOR;
        assert_eq!(state.reputation.value(), 50 - flat_penalty);

        let mut state = InnState::new("inn-2", 0);
        state.reputation = Reputation::new(50);
        let mut patron = Customer::sample(1, "farmhand", 5);
        patron.happiness = STORM_OUT_THRESHOLD;
        state.customers.push(patron);
        departure_step(&mut state, 10);
        assert_eq!(state.reputation.value(), 50 - STORM_OUT_BASE_PENALTY);
    }

    #[test]
    fn departure_paths_are_mutually_exclusive() {
        // A broke and miserable patron leaves through the broke path only;
        // reputation still gets no storm-out penalty.
        let mut state = InnState::new("inn-1", 0);
        state.reputation = Reputation::new(50);
        let mut patron = Customer::sample(1, "farmhand", 0);
        patron.happiness = 0;
        state.customers.push(patron);
        departure_step(&mut state, 10);
        assert_eq!(state.reputation.value(), 50);
        let last = state.events.back().expect("departure event");
        assert!(matches!(
            last.kind,
            EventKind::PatronDeparted {
                reason: DepartureReason::Broke,
                ..
            }
        ));
    }

    #[test]
    fn overstay_sends_patron_home() {
        let mut state = InnState::new("inn-1", 0);
        let mut patron = Customer::sample(1, "farmhand", 30);
        patron.arrived_at = 0;
        patron.happiness = 60;
        state.customers.push(patron);
        assert_eq!(departure_step(&mut state, MAX_VISIT_MS - 1), 0);
        assert_eq!(departure_step(&mut state, MAX_VISIT_MS), 1);
    }

    #[test]
    fn break_pass_touches_each_customer_once() {
        let cfg = InnConfig::default();
        let mut state = InnState::new("inn-1", 0);
        for id in 1..=6 {
            let mut patron = Customer::sample(id, "farmhand", 100);
            patron.happiness = 90;
            state.customers.push(patron);
        }
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let (stayed, departed) = break_departure_step(&mut state, &cfg, &mut rng, 500);
        assert_eq!(stayed + departed, 6);
        assert_eq!(state.live_customer_count(), stayed as usize);
        assert_eq!(
            state.accrued_adjustments,
            i64::from(stayed) * cfg.overnight_fee
        );
    }

    #[test]
    fn unqualified_patrons_depart_at_break() {
        let cfg = InnConfig::default();
        let mut state = InnState::new("inn-1", 0);
        let mut grump = Customer::sample(1, "farmhand", 100);
        grump.happiness = 10;
        state.customers.push(grump);
        let mut pauper = Customer::sample(2, "pilgrim", cfg.overnight_fee);
        pauper.happiness = 95;
        state.customers.push(pauper);
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let (stayed, departed) = break_departure_step(&mut state, &cfg, &mut rng, 500);
        assert_eq!(stayed, 0);
        assert_eq!(departed, 2);
        assert!(state.customers.is_empty());
    }
}
