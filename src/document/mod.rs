//! Automaton Documents
//! Flat, id-referenced form of a model for export and import

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::automata::{AutomataModel, ElementId, Point, State, Timer, Transition};
use crate::error::AutomataResult;


/// Exported automaton. Back-references are flattened to ids.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub states: Vec<StateRecord>,
    pub transitions: Vec<TransitionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    pub name: String,
    pub id: ElementId,
    pub duration: u32,
    pub position: Point,
    #[serde(default)]
    pub transition_to: Vec<ElementId>,
    #[serde(default)]
    pub transition_from: Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub name: String,
    pub id: ElementId,
    pub duration: u32,
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub is_reverse: bool,
    pub start_state: ElementId,
    pub end_state: ElementId,
}

/// What a load had to leave out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub states: usize,
    pub transitions: usize,
    /// Transitions whose start or end state id did not resolve
    pub dropped: Vec<ElementId>,
    /// Records skipped because their id was already taken
    pub duplicates: Vec<ElementId>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.duplicates.is_empty()
    }
}

impl Document {
    pub fn from_json(json: &str) -> AutomataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> AutomataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read_from(path: impl AsRef<Path>) -> AutomataResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> AutomataResult<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

impl AutomataModel {
    /// Flatten the model. Drafts are not part of the model and never exported.
    pub fn export(&self) -> Document {
        let states = self
            .states()
            .iter()
            .map(|s| StateRecord {
                name: s.name.clone(),
                id: s.id().clone(),
                duration: s.timer.duration,
                position: s.position,
                transition_to: s.transition_to().to_vec(),
                transition_from: s.transition_from().to_vec(),
            })
            .collect();
        let transitions = self
            .transitions()
            .iter()
            .filter_map(|t| {
                Some(TransitionRecord {
                    name: t.name.clone(),
                    id: t.id().clone(),
                    duration: t.timer.duration,
                    triggered: t.triggered,
                    is_reverse: t.is_reverse(),
                    start_state: t.start_state().clone(),
                    end_state: t.end_state()?.clone(),
                })
            })
            .collect();
        Document {
            states,
            transitions,
        }
    }

    /// Replace the model with the contents of `document`.
    ///
    /// Transitions referring to unknown states are dropped and loading goes
    /// on. A document without states is rejected and the model is untouched.
    /// Afterwards the first state is active and all timers start fresh.
    pub fn load(&mut self, document: Document) -> AutomataResult<LoadReport> {
        let mut report = LoadReport::default();
        let mut seen = HashSet::new();

        // pass 1: states, adjacency still as raw ids
        let mut states: Vec<State> = Vec::with_capacity(document.states.len());
        for record in document.states {
            if !seen.insert(record.id.clone()) {
                warn!("skipping state with duplicate id {}", record.id);
                report.duplicates.push(record.id);
                continue;
            }
            let mut state = State::new(record.id, record.name, record.position);
            state.timer = Timer::new(record.duration);
            state.transition_to = record.transition_to;
            state.transition_from = record.transition_from;
            states.push(state);
        }

        // pass 2: transitions, endpoints resolved against pass 1
        let mut transitions: Vec<Transition> = Vec::with_capacity(document.transitions.len());
        for record in document.transitions {
            let resolves = |id: &ElementId| states.iter().any(|s| s.id() == id);
            if !resolves(&record.start_state) || !resolves(&record.end_state) {
                warn!(
                    "dropping transition {}: {} -> {} does not resolve",
                    record.id, record.start_state, record.end_state
                );
                report.dropped.push(record.id);
                continue;
            }
            if !seen.insert(record.id.clone()) {
                warn!("skipping transition with duplicate id {}", record.id);
                report.duplicates.push(record.id);
                continue;
            }
            let mut transition = Transition::draft(record.id, record.name, record.start_state);
            transition.end_state = Some(record.end_state);
            transition.timer = Timer::new(record.duration);
            transition.triggered = record.triggered;
            transition.is_reverse = record.is_reverse;
            transitions.push(transition);
        }

        // pass 3: adjacency ids re-resolved against the surviving transitions
        for state in &mut states {
            let listed_to = std::mem::take(&mut state.transition_to);
            let listed_from = std::mem::take(&mut state.transition_from);
            let outgoing = |id: &ElementId| {
                transitions
                    .iter()
                    .any(|t| t.id() == id && t.start_state() == state.id())
            };
            let incoming = |id: &ElementId| {
                transitions
                    .iter()
                    .any(|t| t.id() == id && t.end_state() == Some(state.id()))
            };
            let mut transition_to = Vec::new();
            for id in listed_to.into_iter().filter(|id| outgoing(id)) {
                if !transition_to.contains(&id) {
                    transition_to.push(id);
                }
            }
            let mut transition_from = Vec::new();
            for id in listed_from.into_iter().filter(|id| incoming(id)) {
                if !transition_from.contains(&id) {
                    transition_from.push(id);
                }
            }
            // keep the mirror complete even when the lists were inconsistent
            for t in &transitions {
                if t.start_state() == state.id() && !transition_to.contains(t.id()) {
                    transition_to.push(t.id().clone());
                }
                if t.end_state() == Some(state.id()) && !transition_from.contains(t.id()) {
                    transition_from.push(t.id().clone());
                }
            }
            state.transition_to = transition_to;
            state.transition_from = transition_from;
        }

        report.states = states.len();
        report.transitions = transitions.len();
        *self = AutomataModel::from_parts(states, transitions)?;
        info!(
            "loaded {} state(s), {} transition(s)",
            report.states, report.transitions
        );
        Ok(report)
    }

    /// Build a fresh model from a document.
    pub fn from_document(document: Document) -> AutomataResult<(Self, LoadReport)> {
        let mut model = AutomataModel::new();
        let report = model.load(document)?;
        Ok((model, report))
    }
}
