//! Error types for automaton editing and document loading.

use thiserror::Error;

use crate::automata::ElementId;

/// Result type alias for automaton operations.
pub type AutomataResult<T> = Result<T, AutomataError>;

/// Errors that can occur while editing or loading an automaton.
#[derive(Debug, Error)]
pub enum AutomataError {
    /// Deleting the sole remaining state.
    #[error("You must have at least one State")]
    LastState,

    /// A transition whose end is its own start.
    #[error("transition already exists or not possible: {state} cannot transition to itself")]
    SelfLoop { state: ElementId },

    /// A second live transition for the same ordered pair of states.
    #[error("transition already exists or not possible: {from} already transitions to {to}")]
    DuplicateTransition { from: ElementId, to: ElementId },

    /// An id that does not name a live element of the expected kind.
    #[error("unknown element: {id}")]
    UnknownElement { id: ElementId },

    /// A document without any state cannot form an automaton.
    #[error("document contains no states")]
    EmptyDocument,

    /// Document (de)serialization error.
    #[error("document serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (document files).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomataError {
    /// True for errors that reject an edit because it would break a graph invariant.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AutomataError::LastState
                | AutomataError::SelfLoop { .. }
                | AutomataError::DuplicateTransition { .. }
        )
    }
}
