//! Runtime Scheduler
//! Advances an automaton one discrete tick at a time

use log::debug;
use serde::Serialize;

use crate::automata::{AutomataModel, Element, ElementId};

#[cfg(test)]
mod tests;

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TickEvent {
    /// The element's timer advanced by one tick
    Advanced(Element),
    /// The active state completed and handed over to this transition
    TransitionStarted(ElementId),
    /// The active transition completed and its end state became active
    StateEntered(ElementId),
}

impl TickEvent {
    /// True for the events that move the active pointer.
    pub fn is_state_change(&self) -> bool {
        !matches!(self, TickEvent::Advanced(_))
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// Tick number (0-indexed)
    pub tick: u64,
    pub event: TickEvent,
    /// Whether the model was edited since the previous tick (the dirty flag is cleared)
    pub model_changed: bool,
}

/// Drives [`AutomataModel`] progress. Holds no graph state of its own, so one
/// scheduler may be kept across document loads.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    ticks: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one simulation step.
    ///
    /// Firing is checked before advancement, so a completing transition and
    /// a completing state are never both processed in the same tick.
    pub fn tick(&mut self, model: &mut AutomataModel) -> TickReport {
        let tick = self.ticks;
        self.ticks += 1;

        let event = match Self::fire(model) {
            Some(event) => event,
            None => {
                let event = Self::advance(model);
                model.clear_trigger_once();
                event
            }
        };

        if event.is_state_change() {
            debug!("tick {tick}: {event:?}");
        }
        TickReport {
            tick,
            event,
            model_changed: model.take_changed(),
        }
    }

    /// Run `count` ticks back to back.
    pub fn run(&mut self, model: &mut AutomataModel, count: u64) -> Vec<TickReport> {
        (0..count).map(|_| self.tick(model)).collect()
    }

    /// Move the active pointer if the active element has completed.
    fn fire(model: &mut AutomataModel) -> Option<TickEvent> {
        if let Some(transition) = model.active_transition() {
            if !transition.timer.is_complete() {
                return None;
            }
            let end = transition.end_state()?.clone();
            // ids come from the live model, so these cannot fail
            model.set_active_state(&end).ok()?;
            model.set_active_transition(None).ok()?;
            return Some(TickEvent::StateEntered(end));
        }

        let state = model.active_state()?;
        if !state.timer.is_complete() {
            return None;
        }
        let next = model.outgoing(state.id()).find(|t| t.is_armed())?;
        let (id, one_shot) = (next.id().clone(), !next.triggered);

        model.set_active_transition(Some(&id)).ok()?;
        if one_shot {
            model.consume_trigger_once(&id);
        }
        Some(TickEvent::TransitionStarted(id))
    }

    fn advance(model: &mut AutomataModel) -> TickEvent {
        let element = match model.active_transition_id() {
            Some(id) => Element::Transition(id.clone()),
            None => Element::State(model.active_state_id().clone()),
        };
        if let Some(timer) = model.timer_mut(&element) {
            timer.advance();
        }
        TickEvent::Advanced(element)
    }
}
