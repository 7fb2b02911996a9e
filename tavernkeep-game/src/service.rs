//! Order servicing: capacity from present staff, FIFO fulfilment, and the
//! quality tier derived from queue pressure.

use serde::{Deserialize, Serialize};

use crate::config::InnConfig;
use crate::constants::{
    CAPACITY_PERCEPTION_DIVISOR, CAPACITY_SPEED_DIVISOR, FAST_HAPPINESS_DELTA,
    ON_TIME_HAPPINESS_DELTA, SERVICE_FAST_RATIO, SERVICE_SLOW_RATIO, SLOW_HAPPINESS_DELTA,
};
use crate::staff::Participant;
use crate::state::{EventKind, InnState};

/// How the kitchen kept up with demand this batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Fast,
    OnTime,
    Slow,
}

impl ServiceTier {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::OnTime => "on_time",
            Self::Slow => "slow",
        }
    }

    #[must_use]
    pub const fn happiness_delta(self) -> i32 {
        match self {
            Self::Fast => FAST_HAPPINESS_DELTA,
            Self::OnTime => ON_TIME_HAPPINESS_DELTA,
            Self::Slow => SLOW_HAPPINESS_DELTA,
        }
    }

    /// Classify queue pressure: orders waiting per unit of capacity.
    #[must_use]
    pub fn from_pressure(queue_len: usize, capacity: u32) -> Self {
        let ratio = queue_len as f32 / capacity.max(1) as f32;
        if ratio < SERVICE_FAST_RATIO {
            Self::Fast
        } else if ratio > SERVICE_SLOW_RATIO {
            Self::Slow
        } else {
            Self::OnTime
        }
    }
}

/// Outcome of one service batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBatch {
    pub served: u32,
    pub still_queued: u32,
    pub tier: ServiceTier,
    /// Coins added to the period's accrued revenue by this batch.
    pub earned: i64,
}

/// Service slots available this tick: one per present participant plus
/// additive bonuses from aggregate speed and perception.
#[must_use]
pub fn compute_capacity(participants: &[Participant]) -> u32 {
    if participants.is_empty() {
        return 0;
    }
    let base = participants.len() as i32;
    let speed: i32 = participants.iter().map(|p| p.stats.speed.max(0)).sum();
    let perception: i32 = participants.iter().map(|p| p.stats.perception.max(0)).sum();
    let bonus = speed / CAPACITY_SPEED_DIVISOR + perception / CAPACITY_PERCEPTION_DIVISOR;
    (base + bonus).max(0) as u32
}

/// Service up to `capacity` orders in placement order. Fulfilled orders
/// deduct patron wealth and accrue revenue; an order its patron cannot pay
/// for stays queued for the next tick.
pub fn process_orders(
    state: &mut InnState,
    cfg: &InnConfig,
    capacity: u32,
    now: u64,
) -> Option<ServiceBatch> {
    if capacity == 0 || state.order_queue.is_empty() {
        return None;
    }
    let queue_len = state.order_queue.len();
    let tier = ServiceTier::from_pressure(queue_len, capacity);
    let budget = queue_len.min(capacity as usize);

    let mut served = 0u32;
    let mut earned = 0i64;
    let mut retained = Vec::new();
    for _ in 0..budget {
        let Some(order) = state.order_queue.pop_front() else {
            break;
        };
        let Some(customer) = state.customer_mut(order.customer_id) else {
            // Patron already departed; the order dies with them.
            continue;
        };
        if customer.wealth < order.price {
            retained.push(order);
            continue;
        }
        customer.wealth -= order.price;
        customer.orders_fulfilled = customer.orders_fulfilled.saturating_add(1);
        customer.happiness = (customer.happiness + tier.happiness_delta()).clamp(0, 100);
        let income = (order.price as f64 * f64::from(cfg.base_earnings_rate)).floor() as i64;
        earned = earned.saturating_add(income.max(0));
        served += 1;
    }
    for order in retained.into_iter().rev() {
        state.order_queue.push_front(order);
    }
    state.accrued_revenue = state.accrued_revenue.saturating_add(earned);

    let still_queued = state.order_queue.len() as u32;
    state.push_event(
        now,
        EventKind::OrdersServed {
            served,
            still_queued,
            tier,
        },
    );
    Some(ServiceBatch {
        served,
        still_queued,
        tier,
        earned,
    })
}
