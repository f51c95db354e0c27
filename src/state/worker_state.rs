/// Worker lifecycle definitions
///
/// This module defines the states a crawl worker moves through between
/// claiming its seeds and terminating.
use std::fmt;

/// Represents the current lifecycle state of a crawl worker
///
/// ```text
/// Seeding ──► Running ◄──► Flushing
///    │           │
///    └─────────► Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Worker is claiming its initial seed batch from the frontier
    Seeding,

    /// Worker is popping, fetching, and extracting from its local queue
    Running,

    /// Worker is writing its pending buffers to the shared stores mid-run
    Flushing,

    /// Worker has performed its final flush and stopped
    Done,
}

impl WorkerState {
    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (Self::Seeding, Self::Running)
                | (Self::Seeding, Self::Done)
                | (Self::Running, Self::Flushing)
                | (Self::Flushing, Self::Running)
                | (Self::Running, Self::Done)
        )
    }

    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Running => "running",
            Self::Flushing => "flushing",
            Self::Done => "done",
        }
    }

    /// Returns all worker states
    pub fn all_states() -> Vec<Self> {
        vec![Self::Seeding, Self::Running, Self::Flushing, Self::Done]
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
