//! Editor Gesture Controller
//! Turns raw pointer and keyboard input into automaton edits

use log::{debug, info, warn};

use crate::automata::{AutomataModel, Element, ElementId, Point, Transition};
use crate::error::AutomataResult;

#[cfg(test)]
mod tests;

/// Name given to states created by a shift-click
pub const NEW_STATE_NAME: &str = "State";
/// Name given to drafts until they are attached
pub const NEW_TRANSITION_NAME: &str = "Transition";

/// What the controller is currently doing with the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Button held after selecting an element
    Selecting,
    /// A draft transition follows the pointer
    DraftingTransition,
    /// A selected state follows the pointer
    Dragging,
    /// The view follows the pointer
    Panning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    /// Cmd on macOS, Ctrl elsewhere
    pub command: bool,
}

/// A pointer press, in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(position: Point, button: PointerButton) -> Self {
        Self {
            position,
            button,
            modifiers: Modifiers::default(),
        }
    }

    pub fn primary(position: Point) -> Self {
        Self::new(position, PointerButton::Primary)
    }

    pub fn secondary(position: Point) -> Self {
        Self::new(position, PointerButton::Secondary)
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn with_command(mut self) -> Self {
        self.modifiers.command = true;
        self
    }

    fn is_primary(&self) -> bool {
        self.button == PointerButton::Primary
    }
}

/// Which part of a drawn element was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Fill,
    Stroke,
    /// A vertex of a transition path
    Segment,
}

/// Hit-test result: the id of the group that owns the hit item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub owner: ElementId,
    pub kind: HitKind,
}

/// Hit-testing capability of the render surface
pub trait HitTest {
    fn hit_test(&self, point: Point) -> Option<Hit>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    /// Delete the selection
    Delete,
    /// Abandon the draft transition
    Escape,
}

/// Fields the property inspector shows for the selection
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorView {
    pub element: Element,
    pub name: String,
    pub duration: u32,
    /// Hidden (`None`) for states
    pub triggered: Option<bool>,
    pub progress: f32,
    pub elapsed_time: u32,
}

/// Edits the property inspector can request
#[derive(Debug, Clone, PartialEq)]
pub enum InspectorEdit {
    Name(String),
    Duration(u32),
    Triggered(bool),
    Delete,
}

/// Single-threaded gesture interpreter. Every handler runs to completion
/// against the model before returning.
#[derive(Debug, Clone, Default)]
pub struct EditorController {
    selection: Option<Element>,
    draft: Option<Transition>,
    draft_tip: Option<Point>,
    gesture: Gesture,
    /// Whether the current drag moved a state
    moved: bool,
    view_center: Point,
}

impl EditorController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<&Element> {
        self.selection.as_ref()
    }

    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selection.as_ref().is_some_and(|e| e.id() == id)
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// The transition being drawn, not yet part of the model
    pub fn draft(&self) -> Option<&Transition> {
        self.draft.as_ref()
    }

    /// Free end of the draft, tracking the pointer
    pub fn draft_tip(&self) -> Option<Point> {
        self.draft_tip
    }

    /// Canvas point shown at the center of the view
    pub fn view_center(&self) -> Point {
        self.view_center
    }

    pub fn set_view_center(&mut self, center: Point) {
        self.view_center = center;
    }

    /// Forget selection and draft, e.g. after a document load.
    pub fn reset(&mut self) {
        self.selection = None;
        self.cancel_draft();
        self.moved = false;
        self.gesture = Gesture::Idle;
    }

    pub fn pointer_down(
        &mut self,
        model: &mut AutomataModel,
        surface: &impl HitTest,
        event: PointerEvent,
    ) -> AutomataResult<()> {
        self.selection = None;
        self.moved = false;

        let Some(hit) = surface.hit_test(event.position) else {
            self.cancel_draft();
            self.gesture = Gesture::Idle;
            if event.is_primary() && event.modifiers.shift {
                model.add_state(NEW_STATE_NAME, event.position);
            }
            return Ok(());
        };

        let element = model.element(&hit.owner);
        if self.draft.is_some() && (hit.kind == HitKind::Segment || element.is_none()) {
            self.cancel_draft();
            self.gesture = Gesture::Idle;
            return Ok(());
        }
        let Some(element) = element else {
            self.gesture = Gesture::Idle;
            return Ok(());
        };

        if event.is_primary() && event.modifiers.command {
            if let Element::State(id) = &element {
                info!("forcing state {id}");
                model.force_state(id)?;
            }
        }
        self.selection = Some(element.clone());
        self.gesture = Gesture::Selecting;

        match element {
            Element::State(end) => {
                if let Some(draft) = self.draft.take() {
                    self.draft_tip = None;
                    return self.attach_draft(model, draft, &end);
                }
                if event.button == PointerButton::Secondary {
                    let draft = model.begin_transition(NEW_TRANSITION_NAME, &end)?;
                    self.draft_tip = model.state(&end).map(|s| s.position);
                    self.draft = Some(draft);
                    self.gesture = Gesture::DraftingTransition;
                }
            }
            // an existing edge under the pointer abandons the draft
            Element::Transition(_) => self.cancel_draft(),
        }
        Ok(())
    }

    fn attach_draft(
        &mut self,
        model: &mut AutomataModel,
        mut draft: Transition,
        end: &ElementId,
    ) -> AutomataResult<()> {
        if let Some(state) = model.state(end) {
            draft.name = format!("To{}", state.name);
        }
        match model.finalize_transition(draft, end) {
            Ok(id) => {
                debug!("attached draft {id} to {end}");
                Ok(())
            }
            Err(err) => {
                warn!("{err}");
                Err(err)
            }
        }
    }

    pub fn pointer_move(&mut self, position: Point) {
        if self.draft.is_some() {
            self.draft_tip = Some(position);
        }
    }

    /// Drag by `delta` canvas units: moves the selected state with the primary
    /// button, pans the view otherwise.
    pub fn pointer_drag(
        &mut self,
        model: &mut AutomataModel,
        delta: Point,
        button: PointerButton,
    ) -> AutomataResult<()> {
        match &self.selection {
            Some(Element::State(id)) if button == PointerButton::Primary => {
                model.move_state(id, delta)?;
                self.moved = true;
                self.gesture = Gesture::Dragging;
            }
            _ => {
                self.view_center = self.view_center - delta;
                self.gesture = Gesture::Panning;
            }
        }
        Ok(())
    }

    pub fn pointer_up(&mut self, model: &mut AutomataModel) {
        if std::mem::take(&mut self.moved) {
            model.mark_changed();
        }
        self.settle();
    }

    pub fn key_down(&mut self, model: &mut AutomataModel, key: EditorKey) -> AutomataResult<()> {
        match key {
            EditorKey::Delete => self.delete_selection(model),
            EditorKey::Escape => {
                self.cancel_draft();
                self.settle();
                Ok(())
            }
        }
    }

    pub fn inspector_view(&self, model: &AutomataModel) -> Option<InspectorView> {
        let element = self.selection.clone()?;
        let (name, timer, triggered) = match &element {
            Element::State(id) => {
                let state = model.state(id)?;
                (state.name.clone(), state.timer, None)
            }
            Element::Transition(id) => {
                let transition = model.transition(id)?;
                (
                    transition.name.clone(),
                    transition.timer,
                    Some(transition.triggered),
                )
            }
        };
        Some(InspectorView {
            element,
            name,
            duration: timer.duration,
            triggered,
            progress: timer.progress(),
            elapsed_time: timer.elapsed_time,
        })
    }

    /// Apply an inspector edit to the selection. No-op without a selection.
    pub fn apply_inspector_edit(
        &mut self,
        model: &mut AutomataModel,
        edit: InspectorEdit,
    ) -> AutomataResult<()> {
        let Some(element) = self.selection.clone() else {
            return Ok(());
        };
        match edit {
            InspectorEdit::Name(name) => model.rename(&element, name),
            InspectorEdit::Duration(duration) => model.set_duration(&element, duration),
            InspectorEdit::Triggered(triggered) => match &element {
                Element::Transition(id) => model.set_triggered(id, triggered),
                Element::State(_) => Ok(()),
            },
            InspectorEdit::Delete => self.delete_selection(model),
        }
    }

    fn delete_selection(&mut self, model: &mut AutomataModel) -> AutomataResult<()> {
        let Some(element) = self.selection.clone() else {
            return Ok(());
        };
        let removal = match model.delete_element(&element) {
            Ok(removal) => removal,
            Err(err) => {
                warn!("{err}");
                return Err(err);
            }
        };
        self.selection = None;
        if self
            .draft
            .as_ref()
            .is_some_and(|draft| removal.contains(draft.start_state()))
        {
            self.cancel_draft();
            self.settle();
        }
        Ok(())
    }

    fn cancel_draft(&mut self) {
        if let Some(mut draft) = self.draft.take() {
            draft.deleted = true;
            debug!("discarded draft {}", draft.id());
        }
        self.draft_tip = None;
    }

    fn settle(&mut self) {
        self.gesture = if self.draft.is_some() {
            Gesture::DraftingTransition
        } else {
            Gesture::Idle
        };
    }
}
