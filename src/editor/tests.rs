//! Unit tests for the gesture controller, driven through a real scene

use crate::automata::{AutomataModel, Element, ElementId, Point};
use crate::editor::{
    EditorController, EditorKey, Gesture, InspectorEdit, PointerButton, PointerEvent,
    NEW_STATE_NAME,
};
use crate::error::AutomataError;
use crate::scene::{RenderStyle, Scene};

const A: Point = Point { x: 50.0, y: 50.0 };
const B: Point = Point { x: 250.0, y: 50.0 };
const EMPTY: Point = Point { x: 150.0, y: 400.0 };

struct Fixture {
    model: AutomataModel,
    editor: EditorController,
    style: RenderStyle,
    a: ElementId,
    b: ElementId,
}

impl Fixture {
    /// `init` renamed to `A` at (50, 50) and `B` at (250, 50), no transitions.
    fn new() -> Self {
        let mut model = AutomataModel::new();
        let a = model.active_state_id().clone();
        model.rename(&Element::State(a.clone()), "A").unwrap();
        let b = model.add_state("B", B);
        model.take_changed();
        Self {
            model,
            editor: EditorController::new(),
            style: RenderStyle::default(),
            a,
            b,
        }
    }

    fn down(&mut self, event: PointerEvent) -> Result<(), AutomataError> {
        let scene = Scene::build(&self.model, &self.editor, &self.style);
        self.editor.pointer_down(&mut self.model, &scene, event)
    }

    fn click(&mut self, event: PointerEvent) -> Result<(), AutomataError> {
        let result = self.down(event);
        self.editor.pointer_up(&mut self.model);
        result
    }

    /// Right-click `from`, then left-click `to`.
    fn connect(&mut self, from: Point, to: Point) -> Result<(), AutomataError> {
        self.click(PointerEvent::secondary(from))?;
        self.editor.pointer_move(to);
        self.click(PointerEvent::primary(to))
    }
}

#[test]
fn test_shift_click_on_empty_canvas_adds_state() {
    let mut f = Fixture::new();
    f.click(PointerEvent::primary(EMPTY).with_shift()).unwrap();

    assert_eq!(f.model.states().len(), 3);
    let added = f.model.states().last().unwrap();
    assert_eq!(added.name, NEW_STATE_NAME);
    assert_eq!(added.position, EMPTY);
    assert!(f.model.is_changed());
    assert!(f.editor.selection().is_none());
}

#[test]
fn test_plain_click_on_empty_canvas_clears_selection() {
    let mut f = Fixture::new();
    f.click(PointerEvent::primary(A)).unwrap();
    assert!(f.editor.is_selected(&f.a));

    f.click(PointerEvent::primary(EMPTY)).unwrap();
    assert!(f.editor.selection().is_none());
    assert_eq!(f.model.states().len(), 2);
    assert!(!f.model.is_changed());
}

#[test]
fn test_right_click_then_click_creates_named_transition() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    assert_eq!(f.editor.gesture(), Gesture::DraftingTransition);
    assert_eq!(f.editor.draft().unwrap().start_state(), &f.a);
    assert!(f.model.transitions().is_empty());

    f.editor.pointer_move(Point::new(180.0, 60.0));
    assert_eq!(f.editor.draft_tip(), Some(Point::new(180.0, 60.0)));

    f.click(PointerEvent::primary(B)).unwrap();
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);

    let t = f.model.find_transition(&f.a, &f.b).unwrap();
    assert_eq!(t.name, "ToB");
    assert!(f.model.is_changed());
    assert_eq!(f.model.state(&f.a).unwrap().transition_to(), &[t.id().clone()]);
}

#[test]
fn test_self_loop_is_rejected_and_draft_discarded() {
    let mut f = Fixture::new();
    let result = f.connect(A, A);

    assert!(matches!(result, Err(AutomataError::SelfLoop { .. })));
    assert!(f.editor.draft().is_none());
    assert!(f.model.transitions().is_empty());
    assert!(!f.model.is_changed());
}

#[test]
fn test_duplicate_transition_is_rejected() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    f.model.take_changed();

    let result = f.connect(A, B);
    assert!(matches!(result, Err(AutomataError::DuplicateTransition { .. })));
    assert_eq!(f.model.transitions().len(), 1);
    assert!(f.editor.draft().is_none());
    assert!(!f.model.is_changed());
}

#[test]
fn test_reverse_connection_marks_pair() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    f.connect(B, A).unwrap();

    assert_eq!(f.model.transitions().len(), 2);
    assert!(f.model.transitions().iter().all(|t| t.is_reverse()));
    let back = f.model.find_transition(&f.b, &f.a).unwrap();
    assert_eq!(back.name, "ToA");
}

#[test]
fn test_draft_is_cancelled_by_empty_click_or_edge() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    f.editor.pointer_move(EMPTY);
    f.click(PointerEvent::primary(Point::new(600.0, 600.0))).unwrap();
    assert!(f.editor.draft().is_none());
    assert_eq!(f.model.states().len(), 2);

    f.connect(A, B).unwrap();
    f.click(PointerEvent::secondary(B)).unwrap();
    f.editor.pointer_move(Point::new(250.0, 300.0));
    // on the A -> B path, clear of both circles
    f.click(PointerEvent::primary(Point::new(150.0, 50.0))).unwrap();
    assert!(f.editor.draft().is_none());
    assert_eq!(f.model.transitions().len(), 1);
}

#[test]
fn test_clicking_the_draft_itself_cancels_it() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    f.editor.pointer_move(EMPTY);
    f.click(PointerEvent::primary(EMPTY)).unwrap();
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);
}

#[test]
fn test_escape_abandons_draft() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    f.editor.key_down(&mut f.model, EditorKey::Escape).unwrap();
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);
    assert!(f.model.transitions().is_empty());
}

#[test]
fn test_command_click_forces_state() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    let t = f.model.find_transition(&f.a, &f.b).unwrap().id().clone();
    f.model.set_active_transition(Some(&t)).unwrap();

    f.click(PointerEvent::primary(B).with_command()).unwrap();
    assert_eq!(f.model.active_state_id(), &f.b);
    assert!(f.model.active_transition().is_none());
    assert!(f.editor.is_selected(&f.b));
}

#[test]
fn test_drag_moves_selected_state_and_marks_once() {
    let mut f = Fixture::new();
    f.down(PointerEvent::primary(B)).unwrap();
    f.editor
        .pointer_drag(&mut f.model, Point::new(10.0, 5.0), PointerButton::Primary)
        .unwrap();
    f.editor
        .pointer_drag(&mut f.model, Point::new(10.0, 5.0), PointerButton::Primary)
        .unwrap();

    assert_eq!(f.editor.gesture(), Gesture::Dragging);
    assert_eq!(f.model.state(&f.b).unwrap().position, Point::new(270.0, 60.0));
    assert!(!f.model.is_changed());

    f.editor.pointer_up(&mut f.model);
    assert!(f.model.take_changed());
    assert_eq!(f.editor.gesture(), Gesture::Idle);

    // a plain click afterwards does not mark again
    f.click(PointerEvent::primary(B)).unwrap();
    assert!(!f.model.is_changed());
}

#[test]
fn test_drag_on_empty_canvas_pans() {
    let mut f = Fixture::new();
    f.down(PointerEvent::primary(EMPTY)).unwrap();
    f.editor
        .pointer_drag(&mut f.model, Point::new(30.0, -20.0), PointerButton::Primary)
        .unwrap();

    assert_eq!(f.editor.gesture(), Gesture::Panning);
    assert_eq!(f.editor.view_center(), Point::new(-30.0, 20.0));
    assert_eq!(f.model.state(&f.b).unwrap().position, B);

    f.editor.pointer_up(&mut f.model);
    assert!(!f.model.is_changed());
}

#[test]
fn test_inspector_hides_triggered_for_states() {
    let mut f = Fixture::new();
    assert!(f.editor.inspector_view(&f.model).is_none());

    f.click(PointerEvent::primary(A)).unwrap();
    let view = f.editor.inspector_view(&f.model).unwrap();
    assert_eq!(view.element, Element::State(f.a.clone()));
    assert_eq!(view.name, "A");
    assert_eq!(view.triggered, None);
    assert_eq!(view.duration, 1);

    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Triggered(true))
        .unwrap();
    assert!(!f.model.is_changed());
}

#[test]
fn test_inspector_edits_transition() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    f.model.take_changed();
    f.click(PointerEvent::primary(Point::new(150.0, 50.0))).unwrap();

    let view = f.editor.inspector_view(&f.model).unwrap();
    assert!(!view.element.is_state());
    assert_eq!(view.triggered, Some(false));

    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Name("go".into()))
        .unwrap();
    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Duration(7))
        .unwrap();
    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Triggered(true))
        .unwrap();

    let view = f.editor.inspector_view(&f.model).unwrap();
    assert_eq!(view.name, "go");
    assert_eq!(view.duration, 7);
    assert_eq!(view.triggered, Some(true));
    assert_eq!(view.progress, 0.0);
    assert!(f.model.is_changed());
}

#[test]
fn test_delete_key_removes_selection() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    f.click(PointerEvent::primary(B)).unwrap();

    f.editor.key_down(&mut f.model, EditorKey::Delete).unwrap();
    assert_eq!(f.model.states().len(), 1);
    assert!(f.model.transitions().is_empty());
    assert!(f.editor.selection().is_none());
    assert!(f.model.state(&f.a).unwrap().transition_to().is_empty());
}

#[test]
fn test_deleting_last_state_is_refused() {
    let mut f = Fixture::new();
    f.click(PointerEvent::primary(B)).unwrap();
    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Delete)
        .unwrap();
    f.click(PointerEvent::primary(A)).unwrap();

    let result = f.editor.key_down(&mut f.model, EditorKey::Delete);
    assert!(matches!(result, Err(AutomataError::LastState)));
    assert_eq!(f.model.states().len(), 1);
    assert!(f.editor.is_selected(&f.a));
}

#[test]
fn test_reset_clears_selection_and_draft() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    f.editor.reset();
    assert!(f.editor.selection().is_none());
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);
}

#[test]
fn test_deleting_draft_start_state_abandons_draft() {
    let mut f = Fixture::new();
    let c = f.model.add_state("C", EMPTY);
    f.click(PointerEvent::secondary(B)).unwrap();
    assert!(f.editor.is_selected(&f.b));

    f.editor.key_down(&mut f.model, EditorKey::Delete).unwrap();
    assert!(f.model.state(&f.b).is_none());
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);

    // the next click on a state is a plain selection
    f.click(PointerEvent::primary(EMPTY)).unwrap();
    assert!(f.editor.is_selected(&c));
    assert!(f.model.transitions().is_empty());
}

#[test]
fn test_inspector_delete_of_draft_start_abandons_draft() {
    let mut f = Fixture::new();
    f.connect(A, B).unwrap();
    f.click(PointerEvent::secondary(B)).unwrap();
    assert_eq!(f.editor.gesture(), Gesture::DraftingTransition);

    f.editor
        .apply_inspector_edit(&mut f.model, InspectorEdit::Delete)
        .unwrap();
    assert!(f.model.state(&f.b).is_none());
    assert!(f.model.transitions().is_empty());
    assert!(f.editor.draft().is_none());
    assert_eq!(f.editor.gesture(), Gesture::Idle);
}

#[test]
fn test_rejected_attach_then_release_settles() {
    let mut f = Fixture::new();
    f.click(PointerEvent::secondary(A)).unwrap();
    let result = f.down(PointerEvent::primary(A));
    assert!(matches!(result, Err(AutomataError::SelfLoop { .. })));

    f.editor.pointer_up(&mut f.model);
    assert_eq!(f.editor.gesture(), Gesture::Idle);
    assert!(f.editor.draft().is_none());
    assert!(!f.model.is_changed());
}
