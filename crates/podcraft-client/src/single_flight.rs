//! Per-kind single-flight guard for follow-up fetches.
//!
//! At most one fetch per `FollowUpKind` is in flight.  A request that arrives
//! while one is running is coalesced into it.  Each kind carries a revision
//! that advances whenever its availability flag flips; a fetch issued under
//! an older revision is stale when it completes.
//!
//! ```text
//!  observe(kind, available)  : record the flag from the latest snapshot
//!  try_begin(kind)           : Some(ticket) if idle, None if coalesced
//!  finish(ticket)            : Apply | Stale { reissue }
//! ```

use std::collections::HashMap;

use crate::status::FollowUpKind;

/// Proof that a fetch was started; hand it back to `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: FollowUpKind,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Result is current; apply it.
    Apply,
    /// Superseded by a newer snapshot; drop the result.  `reissue` is true
    /// when the kind is still available and a fresh fetch should start.
    Stale { reissue: bool },
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: bool,
    available: bool,
    revision: u64,
}

#[derive(Debug, Default)]
pub struct SingleFlight {
    slots: HashMap<FollowUpKind, Slot>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the availability flag of `kind` from the latest snapshot.
    pub fn observe(&mut self, kind: FollowUpKind, available: bool) {
        let slot = self.slots.entry(kind).or_default();
        if slot.available != available {
            slot.available = available;
            slot.revision += 1;
        }
    }

    /// Start a fetch unless one of the same kind is already running.
    pub fn try_begin(&mut self, kind: FollowUpKind) -> Option<Ticket> {
        let slot = self.slots.entry(kind).or_default();
        if slot.in_flight {
            return None;
        }
        slot.in_flight = true;
        Some(Ticket {
            kind,
            revision: slot.revision,
        })
    }

    pub fn finish(&mut self, ticket: Ticket) -> Completion {
        let slot = self.slots.entry(ticket.kind).or_default();
        slot.in_flight = false;
        if ticket.revision == slot.revision && slot.available {
            Completion::Apply
        } else {
            Completion::Stale {
                reissue: slot.available,
            }
        }
    }

    pub fn in_flight(&self, kind: FollowUpKind) -> bool {
        self.slots.get(&kind).is_some_and(|s| s.in_flight)
    }
}
