//! Staff-side types: live participants present for a tick and hired
//! employees carried on the persisted record.

use serde::{Deserialize, Serialize};

use crate::constants::{SETTLEMENT_XP, WAGE_STEP_PER_LEVEL, XP_PER_LEVEL};

/// Opaque actor identifier owned by the surrounding platform.
pub type ActorId = String;

/// Point-in-time contribution stats fetched from the external provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContributionStats {
    #[serde(default)]
    pub speed: i32,
    #[serde(default)]
    pub perception: i32,
    #[serde(default)]
    pub luck: i32,
    #[serde(default)]
    pub strength: i32,
}

/// A player/staff member present at the inn for the current tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub actor_id: ActorId,
    #[serde(default)]
    pub stats: ContributionStats,
}

impl Participant {
    #[must_use]
    pub fn new(actor_id: &str, stats: ContributionStats) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            stats,
        }
    }
}

/// A hired employee. Wages are owed every settlement whether or not the
/// revenue covers them; the payroll engine decides what happens when it
/// does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub actor_id: ActorId,
    #[serde(default = "Employee::default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u32,
    pub wage_cost: i64,
}

impl Employee {
    const fn default_level() -> u32 {
        1
    }

    #[must_use]
    pub fn hired(actor_id: &str, wage_cost: i64) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            level: 1,
            xp: 0,
            wage_cost,
        }
    }

    /// Grant end-of-shift experience; returns the number of levels gained.
    pub fn grant_settlement_xp(&mut self) -> u32 {
        self.xp = self.xp.saturating_add(SETTLEMENT_XP);
        let mut gained = 0;
        while self.xp >= XP_PER_LEVEL {
            self.xp -= XP_PER_LEVEL;
            self.level = self.level.saturating_add(1);
            self.wage_cost = self.wage_cost.saturating_add(WAGE_STEP_PER_LEVEL);
            gained += 1;
        }
        gained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_accumulates_and_levels() {
        let mut employee = Employee::hired("barkeep", 10);
        let per_level = XP_PER_LEVEL / SETTLEMENT_XP;
        for _ in 0..per_level - 1 {
            assert_eq!(employee.grant_settlement_xp(), 0);
        }
        assert_eq!(employee.grant_settlement_xp(), 1);
        assert_eq!(employee.level, 2);
        assert_eq!(employee.xp, 0);
        assert_eq!(employee.wage_cost, 10 + WAGE_STEP_PER_LEVEL);
    }

    #[test]
    fn stats_default_to_zero() {
        let stats: ContributionStats = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, ContributionStats::default());
    }
}
