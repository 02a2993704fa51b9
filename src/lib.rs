//! Ticktock - Timed Finite-State Automata
//! A graph of timed states and transitions, a tick scheduler to run it,
//! and the editing, drawing and document layers around them

pub mod automata;
pub mod document;
pub mod editor;
pub mod error;
pub mod runtime;
pub mod scene;

pub use automata::*;
pub use document::{Document, LoadReport};
pub use editor::{EditorController, HitTest, InspectorEdit, InspectorView, PointerEvent};
pub use error::{AutomataError, AutomataResult};
pub use runtime::{Scheduler, TickEvent, TickReport};
pub use scene::{RenderStyle, Scene};
