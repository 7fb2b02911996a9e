//! End-of-shift settlement: wages, exact remainder distribution,
//! performance multipliers, and the randomized top-performer bonus.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{STAT_BONUS_CAP, STAT_BONUS_PER_POINT};
use crate::staff::{ActorId, ContributionStats, Participant};
use crate::state::{EventKind, InnState};

/// Result of one Working→Break settlement, handed to external payout and
/// reporting collaborators. The engine performs no currency I/O itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub total_revenue: i64,
    pub total_adjustments: i64,
    pub wages_paid: i64,
    /// Final per-participant payouts, multiplier and bonus applied.
    pub shares: Vec<(ActorId, i64)>,
    pub top_performer: Option<ActorId>,
    pub employees_dismissed: bool,
}

impl SettlementRecord {
    /// Total coins actually handed out. Because the top-performer bonus is
    /// additive rather than reallocated, this can exceed
    /// `total_revenue + total_adjustments - wages_paid`.
    #[must_use]
    pub fn total_paid(&self) -> i64 {
        self.shares.iter().map(|(_, amount)| amount).sum()
    }
}

/// Exact floor-division split of `remainder` across `count` recipients.
/// The integer remainder of the division lands on the first recipient so
/// the distributed total equals `remainder` with no rounding loss.
#[must_use]
pub fn split_remainder(remainder: i64, count: usize) -> Vec<i64> {
    if count == 0 {
        return Vec::new();
    }
    let remainder = remainder.max(0);
    let n = count as i64;
    let base = remainder / n;
    let extra = remainder % n;
    let mut shares = vec![base; count];
    shares[0] += extra;
    shares
}

/// Performance multiplier: `1 + Σ(capped per-stat bonus)` over
/// speed/perception/luck/strength.
#[must_use]
pub fn performance_multiplier(stats: &ContributionStats) -> f64 {
    let bonus = |stat: i32| (f64::from(stat.max(0)) * STAT_BONUS_PER_POINT).min(STAT_BONUS_CAP);
    1.0 + bonus(stats.speed) + bonus(stats.perception) + bonus(stats.luck) + bonus(stats.strength)
}

/// Settle the period's accrued earnings against wages and distribute the
/// remainder among present participants.
///
/// When the pool cannot cover wages, every employee is dismissed and the
/// whole pool proceeds to distribution; that is a modeled business outcome,
/// not an error. The counters on `state` are left for the Break→Working
/// reset, so a settlement is only ever produced once per boundary.
pub fn settle(
    state: &mut InnState,
    participants: &[Participant],
    rng: &mut impl Rng,
    now: u64,
) -> SettlementRecord {
    let total_revenue = state.accrued_revenue.max(0);
    let total_adjustments = state.accrued_adjustments.max(0);
    let pool = total_revenue.saturating_add(total_adjustments);
    let wages: i64 = state.employees.iter().map(|e| e.wage_cost.max(0)).sum();

    let (wages_paid, remainder, employees_dismissed) = if pool < wages {
        let count = state.employees.len() as u32;
        state.employees.clear();
        state.push_event(now, EventKind::EmployeesDismissed { count });
        debug!(
            "{}: pool {pool} under wages {wages}, dismissing {count} employees",
            state.entity_id
        );
        (0, pool, true)
    } else {
        for employee in &mut state.employees {
            let gained = employee.grant_settlement_xp();
            if gained > 0 {
                debug!(
                    "{}: employee {} reached level {}",
                    state.entity_id, employee.actor_id, employee.level
                );
            }
        }
        (wages, pool - wages, false)
    };

    // Sorted order makes the remainder recipient deterministic.
    let mut roster: Vec<&Participant> = participants.iter().collect();
    roster.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));

    let base_shares = split_remainder(remainder, roster.len());
    let mut shares: Vec<(ActorId, i64)> = roster
        .iter()
        .zip(base_shares)
        .map(|(participant, share)| {
            let multiplier = performance_multiplier(&participant.stats);
            let payout = (share as f64 * multiplier).floor() as i64;
            (participant.actor_id.clone(), payout)
        })
        .collect();

    let top_performer = if shares.len() > 1 {
        let winner = rng.gen_range(0..shares.len());
        shares[winner].1 = shares[winner].1.saturating_mul(2);
        Some(shares[winner].0.clone())
    } else {
        None
    };

    state.push_event(
        now,
        EventKind::PayrollSettled {
            revenue: pool,
            wages: wages_paid,
            participants: shares.len() as u32,
        },
    );

    SettlementRecord {
        total_revenue,
        total_adjustments,
        wages_paid,
        shares,
        top_performer,
        employees_dismissed,
    }
}
