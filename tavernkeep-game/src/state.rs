use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;

use crate::constants::{LONG_BREAK_MS, MAX_EVENT_LOG, SHORT_BREAK_MS};
use crate::patrons::{Customer, DepartureReason, PendingOrder};
use crate::service::ServiceTier;
use crate::staff::Employee;

/// Break length classifier; every Nth completed cycle earns the long one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }

    /// Wall-clock duration of this break in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> u64 {
        match self {
            Self::Short => SHORT_BREAK_MS,
            Self::Long => LONG_BREAK_MS,
        }
    }
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Tagged phase union persisted with the record. The break kind only exists
/// while the inn is actually on break; the Working variant carries nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ShiftPhase {
    #[default]
    Working,
    Break {
        kind: BreakKind,
    },
}

impl ShiftPhase {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Break { .. } => "break",
        }
    }

    #[must_use]
    pub const fn is_working(self) -> bool {
        matches!(self, Self::Working)
    }

    #[must_use]
    pub const fn break_kind(self) -> Option<BreakKind> {
        match self {
            Self::Working => None,
            Self::Break { kind } => Some(kind),
        }
    }
}

impl fmt::Display for ShiftPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Inn reputation, always held inside `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reputation(i32);

impl Reputation {
    pub const MIN: i32 = 0;
    pub const MAX: i32 = 100;

    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(clamp_reputation(value))
    }

    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Apply a signed delta, clamping at the bounds.
    pub const fn apply(&mut self, delta: i32) {
        self.0 = clamp_reputation(self.0.saturating_add(delta));
    }

    /// Re-assert the bounds on a value that may have been persisted raw.
    pub const fn clamp(&mut self) {
        self.0 = clamp_reputation(self.0);
    }
}

const fn clamp_reputation(value: i32) -> i32 {
    if value < Reputation::MIN {
        Reputation::MIN
    } else if value > Reputation::MAX {
        Reputation::MAX
    } else {
        value
    }
}

impl Default for Reputation {
    fn default() -> Self {
        Self(50)
    }
}

/// Maximum tag capacity stored inline without additional allocations.
pub type EventTagSet = SmallVec<[EventTag; 4]>;

/// Tag describing why an event entry ended up in the shift log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTag(pub String);

impl EventTag {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Content of a shift-log entry. Rendering is an external concern; these
/// carry counts and identifiers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PatronArrived {
        customer_id: u64,
        archetype_id: String,
    },
    OrderPlaced {
        customer_id: u64,
        item_id: String,
        price: i64,
    },
    OrdersServed {
        served: u32,
        still_queued: u32,
        tier: ServiceTier,
    },
    PatronDeparted {
        customer_id: u64,
        reason: DepartureReason,
    },
    OvernightStay {
        customer_id: u64,
        fee: i64,
    },
    ShiftEnded {
        cycle: u32,
        break_kind: BreakKind,
    },
    BreakEnded {
        cycle: u32,
    },
    PayrollSettled {
        revenue: i64,
        wages: i64,
        participants: u32,
    },
    EmployeesDismissed {
        count: u32,
    },
}

impl EventKind {
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::PatronArrived { .. } => "patron.arrived",
            Self::OrderPlaced { .. } => "order.placed",
            Self::OrdersServed { .. } => "orders.served",
            Self::PatronDeparted { .. } => "patron.departed",
            Self::OvernightStay { .. } => "patron.overnight",
            Self::ShiftEnded { .. } => "shift.ended",
            Self::BreakEnded { .. } => "break.ended",
            Self::PayrollSettled { .. } => "payroll.settled",
            Self::EmployeesDismissed { .. } => "payroll.dismissed",
        }
    }
}

/// One entry in the bounded per-shift event ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftEvent {
    /// Monotonic sequence number within the entity's lifetime.
    pub seq: u64,
    /// Wall-clock timestamp the event was recorded at (unix ms).
    pub at: u64,
    pub kind: EventKind,
    #[serde(default)]
    pub tags: EventTagSet,
}

/// The durable record for a single inn, mutated only through
/// read-modify-conditional-write cycles keyed on `revision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnState {
    pub entity_id: String,
    #[serde(default)]
    pub phase: ShiftPhase,
    #[serde(default)]
    pub phase_started_at: u64,
    #[serde(default)]
    pub cycle_count: u32,
    #[serde(default)]
    pub last_event_at: u64,
    /// Optimistic-concurrency token; bumped on every successful write.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub reputation: Reputation,
    /// Fulfilled-order income accrued during the current Working period.
    #[serde(default)]
    pub accrued_revenue: i64,
    /// Ad hoc income (overnight fees and the like) for the current period.
    #[serde(default)]
    pub accrued_adjustments: i64,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub order_queue: VecDeque<PendingOrder>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub events: VecDeque<ShiftEvent>,
    #[serde(default)]
    pub event_seq: u64,
    #[serde(default)]
    pub next_customer_id: u64,
}

impl InnState {
    /// Fresh record for an entity seen for the first time.
    #[must_use]
    pub fn new(entity_id: &str, now: u64) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            phase: ShiftPhase::Working,
            phase_started_at: now,
            cycle_count: 0,
            last_event_at: now,
            revision: 0,
            reputation: Reputation::default(),
            accrued_revenue: 0,
            accrued_adjustments: 0,
            customers: Vec::new(),
            order_queue: VecDeque::new(),
            employees: Vec::new(),
            events: VecDeque::with_capacity(MAX_EVENT_LOG),
            event_seq: 0,
            next_customer_id: 1,
        }
    }

    /// Append an event, evicting the oldest entry once the ring is full.
    pub fn push_event(&mut self, at: u64, kind: EventKind) {
        self.push_event_tagged(at, kind, EventTagSet::new());
    }

    pub fn push_event_tagged(&mut self, at: u64, kind: EventKind, tags: EventTagSet) {
        self.event_seq = self.event_seq.saturating_add(1);
        while self.events.len() >= MAX_EVENT_LOG {
            self.events.pop_front();
        }
        self.events.push_back(ShiftEvent {
            seq: self.event_seq,
            at,
            kind,
            tags,
        });
    }

    /// Events recorded after the given sequence watermark, oldest first.
    #[must_use]
    pub fn events_since(&self, seq: u64) -> Vec<ShiftEvent> {
        self.events
            .iter()
            .filter(|event| event.seq > seq)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn live_customer_count(&self) -> usize {
        self.customers.len()
    }

    #[must_use]
    pub fn customer(&self, customer_id: u64) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    pub fn customer_mut(&mut self, customer_id: u64) -> Option<&mut Customer> {
        self.customers.iter_mut().find(|c| c.id == customer_id)
    }

    /// Whether the customer currently has an order waiting in the queue.
    #[must_use]
    pub fn has_active_order(&self, customer_id: u64) -> bool {
        self.order_queue
            .iter()
            .any(|order| order.customer_id == customer_id)
    }

    /// Remove a customer and any orders they still had queued.
    pub fn remove_customer(&mut self, customer_id: u64) -> Option<Customer> {
        let index = self.customers.iter().position(|c| c.id == customer_id)?;
        self.order_queue.retain(|order| order.customer_id != customer_id);
        Some(self.customers.remove(index))
    }

    pub fn allocate_customer_id(&mut self) -> u64 {
        let id = self.next_customer_id;
        self.next_customer_id = self.next_customer_id.saturating_add(1);
        id
    }

    /// Normalize a record straight off the store: clamp bounded values,
    /// drop queue entries that no longer reference a live customer, and
    /// trim an oversized event ring. Business logic downstream can then
    /// trust the invariants instead of re-checking them defensively.
    pub fn normalize(&mut self) {
        self.reputation.clamp();
        for customer in &mut self.customers {
            customer.clamp();
        }
        let live: std::collections::HashSet<u64> =
            self.customers.iter().map(|c| c.id).collect();
        self.order_queue.retain(|order| live.contains(&order.customer_id));
        while self.events.len() > MAX_EVENT_LOG {
            self.events.pop_front();
        }
        if self.accrued_revenue < 0 {
            self.accrued_revenue = 0;
        }
        if self.accrued_adjustments < 0 {
            self.accrued_adjustments = 0;
        }
        let floor = self
            .customers
            .iter()
            .map(|c| c.id)
            .max()
            .map_or(1, |max| max.saturating_add(1));
        if self.next_customer_id < floor {
            self.next_customer_id = floor;
        }
    }
}
