//! Shift phase state machine: Working and Break periods bounded by
//! persisted wall-clock deadlines.
//!
//! Evaluation only ever compares the caller's `now` against persisted
//! timestamps, so skipped, delayed, or duplicated invocations all converge:
//! a tick that arrives late applies the one transition that is due and the
//! next tick picks up from there.

use crate::constants::{LONG_BREAK_CYCLE, WORK_DURATION_MS};
use crate::state::{BreakKind, EventKind, InnState, ShiftPhase};

/// A due phase change. Applying it is a separate step so the caller can
/// run boundary work (break departures, payroll) between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Working period is over; the inn closes for the given break.
    EndShift { break_kind: BreakKind },
    /// Break is over; a fresh working period begins.
    StartShift,
}

/// Which break the given cycle number earns.
#[must_use]
pub const fn break_kind_for_cycle(cycle: u32) -> BreakKind {
    if cycle % LONG_BREAK_CYCLE == 0 {
        BreakKind::Long
    } else {
        BreakKind::Short
    }
}

/// Check the persisted deadlines against `now`.
#[must_use]
pub fn evaluate(state: &InnState, now: u64) -> Option<Transition> {
    let elapsed = now.saturating_sub(state.phase_started_at);
    match state.phase {
        ShiftPhase::Working => {
            if elapsed >= WORK_DURATION_MS {
                let break_kind = break_kind_for_cycle(state.cycle_count.saturating_add(1));
                Some(Transition::EndShift { break_kind })
            } else {
                None
            }
        }
        ShiftPhase::Break { kind } => {
            if elapsed >= kind.duration_ms() {
                Some(Transition::StartShift)
            } else {
                None
            }
        }
    }
}

/// Close the working period: bump the cycle counter and enter the break.
pub fn apply_end_shift(state: &mut InnState, break_kind: BreakKind, now: u64) {
    state.cycle_count = state.cycle_count.saturating_add(1);
    state.phase = ShiftPhase::Break { kind: break_kind };
    state.phase_started_at = now;
    state.last_event_at = now;
    state.push_event(
        now,
        EventKind::ShiftEnded {
            cycle: state.cycle_count,
            break_kind,
        },
    );
}

/// Open a fresh working period: clear the per-shift event ring and the
/// running revenue counters.
pub fn apply_start_shift(state: &mut InnState, now: u64) {
    state.phase = ShiftPhase::Working;
    state.phase_started_at = now;
    state.last_event_at = now;
    state.accrued_revenue = 0;
    state.accrued_adjustments = 0;
    state.events.clear();
    state.push_event(
        now,
        EventKind::BreakEnded {
            cycle: state.cycle_count,
        },
    );
}
