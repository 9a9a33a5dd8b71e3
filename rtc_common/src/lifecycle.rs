//! Component lifecycle states.
//!
//! ```text
//!  Created ──initialize──► Inactive ◄──deactivate── Active
//!                            │  ▲                     ▲ │
//!                            │  └──────reset───┐      │ │
//!                            │              Error ◄───┘ │ (callback failure)
//!                            └────activate──────────────┘
//! ```

use serde::Serialize;
use std::fmt;

/// Lifecycle state of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LifeCycleState {
    /// Constructed, not yet initialized
    #[default]
    Created,
    /// Initialized, not executing
    Inactive,
    /// Executing on its execution context
    Active,
    /// A callback failed; waits for reset
    Error,
}

impl LifeCycleState {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition(self, to: LifeCycleState) -> bool {
        use LifeCycleState::*;
        matches!(
            (self, to),
            (Created, Inactive)
                | (Inactive, Active)
                | (Active, Inactive)
                | (Active, Error)
                | (Inactive, Error)
                | (Error, Inactive)
        )
    }
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifeCycleState::Created => "CREATED",
            LifeCycleState::Inactive => "INACTIVE",
            LifeCycleState::Active => "ACTIVE",
            LifeCycleState::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::LifeCycleState::*;

    #[test]
    fn test_legal_transitions() {
        assert!(Created.can_transition(Inactive));
        assert!(Inactive.can_transition(Active));
        assert!(Active.can_transition(Inactive));
        assert!(Active.can_transition(Error));
        assert!(Error.can_transition(Inactive));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Created.can_transition(Active));
        assert!(!Error.can_transition(Active));
        assert!(!Inactive.can_transition(Created));
        assert!(!Active.can_transition(Active));
    }

    #[test]
    fn test_display() {
        assert_eq!(Active.to_string(), "ACTIVE");
        assert_eq!(super::LifeCycleState::default(), Created);
    }
}
