//! Automaton Graph Model
//! States, timed transitions and the active pointer that runs over them

use std::fmt;
use std::ops::{Add, Mul, Sub};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{AutomataError, AutomataResult};


const ID_PREFIX: &str = "AID_";

/// Tick count new states and transitions start with.
pub const DEFAULT_DURATION: u32 = 1;

/// Stable identifier shared by states and transitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of ids minted by a model (`AID_<n>`).
    fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix(ID_PREFIX)?.parse().ok()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A 2D coordinate in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).length()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Discrete timer shared by states and transitions.
///
/// Progress is derived from the tick counter, never from wall-clock time:
/// `progress = clamp(elapsed_time / duration, 0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Ticks required for progress to reach 1
    pub duration: u32,
    /// Ticks since the last reset
    pub elapsed_time: u32,
}

impl Timer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            elapsed_time: 0,
        }
    }

    /// Normalized completion in `[0, 1]`. A zero duration counts as complete.
    pub fn progress(&self) -> f32 {
        if self.duration == 0 {
            return 1.0;
        }
        (self.elapsed_time as f32 / self.duration as f32).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_time >= self.duration
    }

    pub fn advance(&mut self) {
        self.elapsed_time = self.elapsed_time.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.elapsed_time = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

/// Reference to either kind of graph element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Element {
    State(ElementId),
    Transition(ElementId),
}

impl Element {
    pub fn id(&self) -> &ElementId {
        match self {
            Element::State(id) | Element::Transition(id) => id,
        }
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Element::State(_))
    }
}

/// A node of the automaton
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub(crate) id: ElementId,
    /// Display label, not required to be unique
    pub name: String,
    /// Canvas position (meaningless when running headless)
    pub position: Point,
    pub timer: Timer,
    /// Outgoing transitions in creation order; the order breaks firing ties
    pub(crate) transition_to: Vec<ElementId>,
    /// Incoming transitions, bookkeeping only
    pub(crate) transition_from: Vec<ElementId>,
    pub(crate) deleted: bool,
}

impl State {
    pub(crate) fn new(id: ElementId, name: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            timer: Timer::default(),
            transition_to: Vec::new(),
            transition_from: Vec::new(),
            deleted: false,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn transition_to(&self) -> &[ElementId] {
        &self.transition_to
    }

    pub fn transition_from(&self) -> &[ElementId] {
        &self.transition_from
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A timed, directed edge between two states
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub(crate) id: ElementId,
    pub name: String,
    pub timer: Timer,
    pub(crate) start_state: ElementId,
    /// `None` only while the transition is a draft
    pub(crate) end_state: Option<ElementId>,
    /// Sticky trigger, stays set until cleared
    pub triggered: bool,
    /// One-shot trigger, consumed by the next tick
    pub trigger_once: bool,
    /// Set on both members of an opposite-direction pair
    pub(crate) is_reverse: bool,
    pub(crate) deleted: bool,
}

impl Transition {
    pub(crate) fn draft(id: ElementId, name: impl Into<String>, start_state: ElementId) -> Self {
        Self {
            id,
            name: name.into(),
            timer: Timer::default(),
            start_state,
            end_state: None,
            triggered: false,
            trigger_once: false,
            is_reverse: false,
            deleted: false,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn start_state(&self) -> &ElementId {
        &self.start_state
    }

    pub fn end_state(&self) -> Option<&ElementId> {
        self.end_state.as_ref()
    }

    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Eligible for firing once its source state completes.
    pub fn is_armed(&self) -> bool {
        self.triggered || self.trigger_once
    }

    fn connects(&self, from: &ElementId, to: &ElementId) -> bool {
        &self.start_state == from && self.end_state.as_ref() == Some(to)
    }
}

/// Elements discarded by a delete, tombstoned
#[derive(Debug, Default)]
pub struct Removal {
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

impl Removal {
    pub fn contains(&self, id: &ElementId) -> bool {
        self.states.iter().any(|s| &s.id == id) || self.transitions.iter().any(|t| &t.id == id)
    }

    pub fn len(&self) -> usize {
        self.states.len() + self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The full automaton: all states, all transitions and the active pointers.
///
/// Invariants kept by every operation:
/// - at least one state exists and exactly one of them is active;
/// - a transition is listed in its start's `transition_to` and its end's
///   `transition_from` iff it is live and finalized;
/// - ids are unique across states and transitions.
#[derive(Debug, Clone)]
pub struct AutomataModel {
    states: Vec<State>,
    transitions: Vec<Transition>,
    active_state: ElementId,
    active_transition: Option<ElementId>,
    changed: bool,
    next_id: u64,
}

impl AutomataModel {
    /// A model with a single active state named `init`.
    pub fn new() -> Self {
        let mut model = Self {
            states: Vec::new(),
            transitions: Vec::new(),
            active_state: ElementId::new(""),
            active_transition: None,
            changed: false,
            next_id: 0,
        };
        let init = model.mint_id();
        model
            .states
            .push(State::new(init.clone(), "init", Point::new(50.0, 50.0)));
        model.active_state = init;
        model
    }

    /// Assemble a model from already linked parts. The first state becomes active.
    pub(crate) fn from_parts(
        states: Vec<State>,
        transitions: Vec<Transition>,
    ) -> AutomataResult<Self> {
        let active_state = states
            .first()
            .map(|s| s.id.clone())
            .ok_or(AutomataError::EmptyDocument)?;
        let next_id = states
            .iter()
            .map(|s| &s.id)
            .chain(transitions.iter().map(|t| &t.id))
            .filter_map(ElementId::sequence)
            .max()
            .unwrap_or(0);
        Ok(Self {
            states,
            transitions,
            active_state,
            active_transition: None,
            changed: false,
            next_id,
        })
    }

    fn mint_id(&mut self) -> ElementId {
        loop {
            // past the top of the range, rescan from the bottom skipping taken ids
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            let id = ElementId(format!("{ID_PREFIX}{}", self.next_id));
            if !self.contains_id(&id) {
                return id;
            }
        }
    }

    fn contains_id(&self, id: &ElementId) -> bool {
        self.states.iter().any(|s| &s.id == id) || self.transitions.iter().any(|t| &t.id == id)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn state(&self, id: &ElementId) -> Option<&State> {
        self.states.iter().find(|s| &s.id == id)
    }

    fn state_mut(&mut self, id: &ElementId) -> Option<&mut State> {
        self.states.iter_mut().find(|s| &s.id == id)
    }

    pub fn transition(&self, id: &ElementId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.id == id)
    }

    fn transition_mut(&mut self, id: &ElementId) -> Option<&mut Transition> {
        self.transitions.iter_mut().find(|t| &t.id == id)
    }

    /// Classify a live id.
    pub fn element(&self, id: &ElementId) -> Option<Element> {
        if self.state(id).is_some() {
            Some(Element::State(id.clone()))
        } else if self.transition(id).is_some() {
            Some(Element::Transition(id.clone()))
        } else {
            None
        }
    }

    pub fn timer(&self, element: &Element) -> Option<&Timer> {
        match element {
            Element::State(id) => self.state(id).map(|s| &s.timer),
            Element::Transition(id) => self.transition(id).map(|t| &t.timer),
        }
    }

    pub(crate) fn timer_mut(&mut self, element: &Element) -> Option<&mut Timer> {
        match element {
            Element::State(id) => self.state_mut(id).map(|s| &mut s.timer),
            Element::Transition(id) => self.transition_mut(id).map(|t| &mut t.timer),
        }
    }

    pub fn active_state_id(&self) -> &ElementId {
        &self.active_state
    }

    pub fn active_state(&self) -> Option<&State> {
        self.state(&self.active_state)
    }

    pub fn active_transition_id(&self) -> Option<&ElementId> {
        self.active_transition.as_ref()
    }

    pub fn active_transition(&self) -> Option<&Transition> {
        self.active_transition
            .as_ref()
            .and_then(|id| self.transition(id))
    }

    /// True if `id` is the active state or the active transition.
    pub fn is_active(&self, id: &ElementId) -> bool {
        &self.active_state == id || self.active_transition.as_ref() == Some(id)
    }

    /// Outgoing transitions of a state, in firing-priority order.
    pub fn outgoing<'a>(&'a self, state: &ElementId) -> impl Iterator<Item = &'a Transition> + 'a {
        self.state(state)
            .into_iter()
            .flat_map(|s| s.transition_to.iter())
            .filter_map(move |id| self.transition(id))
    }

    /// The live transition running `from -> to`, if any.
    pub fn find_transition(&self, from: &ElementId, to: &ElementId) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.connects(from, to))
    }

    // ------------------------------------------------------------------
    // Dirty flag
    // ------------------------------------------------------------------

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Return and clear the dirty flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append a new state. Names need not be unique.
    pub fn add_state(&mut self, name: impl Into<String>, position: Point) -> ElementId {
        let id = self.mint_id();
        let state = State::new(id.clone(), name, position);
        info!("added state '{}' ({id})", state.name);
        self.states.push(state);
        self.changed = true;
        id
    }

    /// Start a draft transition from `start`. The draft is not attached to
    /// the graph until [`finalize_transition`](Self::finalize_transition).
    pub fn begin_transition(
        &mut self,
        name: impl Into<String>,
        start: &ElementId,
    ) -> AutomataResult<Transition> {
        if self.state(start).is_none() {
            return Err(AutomataError::UnknownElement { id: start.clone() });
        }
        let id = self.mint_id();
        debug!("drafting transition {id} from {start}");
        Ok(Transition::draft(id, name, start.clone()))
    }

    /// Attach a draft to `end`. Self-loops and duplicate edges are rejected and
    /// the draft is discarded with the model left untouched.
    pub fn finalize_transition(
        &mut self,
        mut draft: Transition,
        end: &ElementId,
    ) -> AutomataResult<ElementId> {
        let start = draft.start_state.clone();
        for id in [&start, end] {
            if self.state(id).is_none() {
                return Err(AutomataError::UnknownElement { id: id.clone() });
            }
        }
        if &start == end {
            return Err(AutomataError::SelfLoop { state: start });
        }
        if self.find_transition(&start, end).is_some() {
            return Err(AutomataError::DuplicateTransition {
                from: start,
                to: end.clone(),
            });
        }

        let id = draft.id.clone();
        draft.end_state = Some(end.clone());
        if let Some(partner) = self.transitions.iter_mut().find(|t| t.connects(end, &start)) {
            partner.is_reverse = true;
            draft.is_reverse = true;
        }
        if let Some(state) = self.state_mut(&start) {
            state.transition_to.push(id.clone());
        }
        if let Some(state) = self.state_mut(end) {
            state.transition_from.push(id.clone());
        }

        info!("added transition '{}' ({id}): {start} -> {end}", draft.name);
        self.transitions.push(draft);
        self.changed = true;
        Ok(id)
    }

    /// Delete a state (with every incident transition) or a single transition.
    pub fn delete_element(&mut self, element: &Element) -> AutomataResult<Removal> {
        let removal = match element {
            Element::State(id) => {
                if self.state(id).is_none() {
                    return Err(AutomataError::UnknownElement { id: id.clone() });
                }
                if self.states.len() == 1 {
                    return Err(AutomataError::LastState);
                }
                self.remove_state(id)
            }
            Element::Transition(id) => {
                let transition = self
                    .take_transition(id)
                    .ok_or_else(|| AutomataError::UnknownElement { id: id.clone() })?;
                Removal {
                    states: Vec::new(),
                    transitions: vec![transition],
                }
            }
        };

        if removal.contains(&self.active_state) {
            if let Some(first) = self.states.first().map(|s| s.id.clone()) {
                self.force_state(&first)?;
            }
        }
        if self
            .active_transition
            .as_ref()
            .is_some_and(|id| removal.contains(id))
        {
            self.active_transition = None;
        }

        info!(
            "deleted {} ({} element(s) removed)",
            element.id(),
            removal.len()
        );
        self.changed = true;
        Ok(removal)
    }

    fn remove_state(&mut self, id: &ElementId) -> Removal {
        let incident: Vec<ElementId> = self
            .state(id)
            .map(|s| {
                s.transition_to
                    .iter()
                    .chain(s.transition_from.iter())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let transitions = incident
            .iter()
            .filter_map(|t| self.take_transition(t))
            .collect();

        let mut states = Vec::new();
        if let Some(index) = self.states.iter().position(|s| &s.id == id) {
            let mut state = self.states.remove(index);
            state.deleted = true;
            states.push(state);
        }
        Removal {
            states,
            transitions,
        }
    }

    /// Unlink a transition from both endpoints and its mirror partner.
    fn take_transition(&mut self, id: &ElementId) -> Option<Transition> {
        let index = self.transitions.iter().position(|t| &t.id == id)?;
        let mut transition = self.transitions.remove(index);

        if let Some(start) = self.state_mut(&transition.start_state) {
            start.transition_to.retain(|t| t != id);
        }
        if let Some(end_id) = transition.end_state.clone() {
            if let Some(end) = self.state_mut(&end_id) {
                end.transition_from.retain(|t| t != id);
            }
            if let Some(partner) = self
                .transitions
                .iter_mut()
                .find(|t| t.connects(&end_id, &transition.start_state))
            {
                partner.is_reverse = false;
            }
        }

        transition.deleted = true;
        Some(transition)
    }

    // ------------------------------------------------------------------
    // Active pointers
    // ------------------------------------------------------------------

    /// Switch the active state, resetting the previously active one first.
    pub fn set_active_state(&mut self, id: &ElementId) -> AutomataResult<()> {
        if self.state(id).is_none() {
            return Err(AutomataError::UnknownElement { id: id.clone() });
        }
        let previous = self.active_state.clone();
        if let Some(state) = self.state_mut(&previous) {
            state.timer.reset();
        }
        debug!("active state {previous} -> {id}");
        self.active_state = id.clone();
        Ok(())
    }

    /// Switch the active transition, resetting the previously active one first.
    pub fn set_active_transition(&mut self, id: Option<&ElementId>) -> AutomataResult<()> {
        if let Some(id) = id {
            if self.transition(id).is_none() {
                return Err(AutomataError::UnknownElement { id: id.clone() });
            }
        }
        if let Some(previous) = self.active_transition.take() {
            if let Some(transition) = self.transition_mut(&previous) {
                transition.timer.reset();
            }
        }
        self.active_transition = id.cloned();
        Ok(())
    }

    /// Activate a state immediately, bypassing normal firing.
    pub fn force_state(&mut self, id: &ElementId) -> AutomataResult<()> {
        self.set_active_state(id)?;
        self.set_active_transition(None)
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn rename(&mut self, element: &Element, name: impl Into<String>) -> AutomataResult<()> {
        let name = name.into();
        match element {
            Element::State(id) => self.state_mut(id).map(|s| s.name = name),
            Element::Transition(id) => self.transition_mut(id).map(|t| t.name = name),
        }
        .ok_or_else(|| AutomataError::UnknownElement {
            id: element.id().clone(),
        })?;
        self.changed = true;
        Ok(())
    }

    pub fn set_duration(&mut self, element: &Element, duration: u32) -> AutomataResult<()> {
        let timer = self
            .timer_mut(element)
            .ok_or_else(|| AutomataError::UnknownElement {
                id: element.id().clone(),
            })?;
        timer.duration = duration;
        self.changed = true;
        Ok(())
    }

    pub fn set_triggered(&mut self, id: &ElementId, triggered: bool) -> AutomataResult<()> {
        let transition = self
            .transition_mut(id)
            .ok_or_else(|| AutomataError::UnknownElement { id: id.clone() })?;
        transition.triggered = triggered;
        self.changed = true;
        Ok(())
    }

    /// Arm a transition for the next tick only. Runtime input, not a document edit.
    pub fn trigger_once(&mut self, id: &ElementId) -> AutomataResult<()> {
        let transition = self
            .transition_mut(id)
            .ok_or_else(|| AutomataError::UnknownElement { id: id.clone() })?;
        transition.trigger_once = true;
        Ok(())
    }

    /// Translate a state. Leaves the dirty flag alone: a drag marks the model
    /// once, when the gesture ends.
    pub fn move_state(&mut self, id: &ElementId, delta: Point) -> AutomataResult<()> {
        let state = self
            .state_mut(id)
            .ok_or_else(|| AutomataError::UnknownElement { id: id.clone() })?;
        state.position = state.position + delta;
        Ok(())
    }

    pub(crate) fn consume_trigger_once(&mut self, id: &ElementId) {
        if let Some(transition) = self.transition_mut(id) {
            transition.trigger_once = false;
        }
    }

    pub(crate) fn clear_trigger_once(&mut self) {
        for transition in &mut self.transitions {
            transition.trigger_once = false;
        }
    }
}

impl Default for AutomataModel {
    fn default() -> Self {
        Self::new()
    }
}
