//! States of an orchestrated run.

use serde::Serialize;

/// One step of the fallback state machine.
///
/// A run moves `Idle -> Trying(i) -> {Accepted | BestUpdated | Rejected}`
/// for each enabled strategy `i`, then `Exhausted` if no strategy was
/// confident enough, and always ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "index")]
pub enum OrchestratorState {
    /// Nothing tried yet.
    Idle,
    /// Waiting on strategy `i`.
    Trying(usize),
    /// Strategy `i` was confident enough to stop the run.
    Accepted(usize),
    /// Strategy `i` validated; the run continues.
    BestUpdated(usize),
    /// Strategy `i` missed, timed out or was rejected.
    Rejected(usize),
    /// Every strategy has been tried.
    Exhausted,
    /// The run returned.
    Done,
}

impl OrchestratorState {
    /// Strategy index, for per-strategy states.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Trying(i) | Self::Accepted(i) | Self::BestUpdated(i) | Self::Rejected(i) => Some(*i),
            Self::Idle | Self::Exhausted | Self::Done => None,
        }
    }

    /// Returns true for `Done`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Ordered states visited by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTrace {
    states: Vec<OrchestratorState>,
}

impl RunTrace {
    pub(crate) fn new() -> Self {
        Self {
            states: vec![OrchestratorState::Idle],
        }
    }

    pub(crate) fn push(&mut self, state: OrchestratorState) {
        self.states.push(state);
    }

    /// States in visit order.
    #[must_use]
    pub fn states(&self) -> &[OrchestratorState] {
        &self.states
    }

    /// Indexes of every strategy that was invoked.
    #[must_use]
    pub fn invoked(&self) -> Vec<usize> {
        self.states
            .iter()
            .filter_map(|state| match state {
                OrchestratorState::Trying(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Last state reached.
    #[must_use]
    pub fn last(&self) -> OrchestratorState {
        self.states.last().copied().unwrap_or(OrchestratorState::Idle)
    }
}
