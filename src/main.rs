//! Ticktock GUI - Timed Automaton Editor
//! Interactive editor and simulator for timed finite-state automata

use eframe::egui;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use ticktock::automata::{AutomataModel, Element, Point};
use ticktock::document::Document;
use ticktock::editor::{
    EditorController, EditorKey, InspectorEdit, InspectorView, PointerButton, PointerEvent,
};
use ticktock::error::AutomataError;
use ticktock::runtime::{Scheduler, TickEvent};
use ticktock::scene::{EdgeShape, NodeShape, RenderStyle, Rgb, Scene};

/// Upper bound on catch-up ticks after a stalled frame
const MAX_TICKS_PER_FRAME: u32 = 240;
const LOG_LINES: usize = 200;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Ticktock - Timed Automata"),
        ..Default::default()
    };

    eframe::run_native(
        "Ticktock",
        options,
        Box::new(|cc| Ok(Box::new(TicktockApp::new(cc)))),
    )
}

/// Simulation settings
#[derive(Clone, Debug)]
struct SimSettings {
    /// Ticks per second
    tick_rate: f32,
    running: bool,
    /// Write the document back to its file whenever the model changes
    autosave: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            running: true,
            autosave: false,
        }
    }
}

struct TicktockApp {
    model: AutomataModel,
    editor: EditorController,
    scheduler: Scheduler,
    style: RenderStyle,
    sim: SimSettings,
    /// Unspent frame time, in seconds
    tick_accum_s: f32,
    last_frame: Option<Instant>,
    /// File the document was opened from or last saved to
    document_path: Option<PathBuf>,
    zoom: f32,
    /// A press started on the canvas and has not been released yet
    pressed_on_canvas: bool,
    /// Blocking warning shown in a modal window
    warning: Option<String>,
    log: Vec<String>,
}

impl TicktockApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            model: AutomataModel::new(),
            editor: EditorController::new(),
            scheduler: Scheduler::new(),
            style: RenderStyle::default(),
            sim: SimSettings::default(),
            tick_accum_s: 0.0,
            last_frame: None,
            document_path: None,
            zoom: 1.0,
            pressed_on_canvas: false,
            warning: None,
            log: Vec::new(),
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        if self.log.len() > LOG_LINES {
            let excess = self.log.len() - LOG_LINES;
            self.log.drain(..excess);
        }
    }

    /// Structural errors block with a modal; anything else goes to the log.
    fn report(&mut self, err: AutomataError) {
        if err.is_structural() {
            // the modal swallows the release, so end the press here
            if std::mem::take(&mut self.pressed_on_canvas) {
                self.editor.pointer_up(&mut self.model);
            }
            self.warning = Some(err.to_string());
        } else {
            error!("{err}");
            self.push_log(format!("error: {err}"));
        }
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    fn new_document(&mut self) {
        self.model = AutomataModel::new();
        self.editor.reset();
        self.editor.set_view_center(Point::ZERO);
        self.document_path = None;
        self.push_log("new document");
    }

    fn open_document(&mut self, path: PathBuf) {
        let loaded = Document::read_from(&path).and_then(|doc| self.model.load(doc));
        match loaded {
            Ok(report) => {
                self.editor.reset();
                self.push_log(format!(
                    "opened {} ({} states, {} transitions)",
                    path.display(),
                    report.states,
                    report.transitions
                ));
                if !report.is_clean() {
                    self.warning = Some(format!(
                        "Some entries could not be loaded: {} dangling transition(s), {} duplicate id(s).",
                        report.dropped.len(),
                        report.duplicates.len()
                    ));
                }
                self.document_path = Some(path);
            }
            Err(err) => {
                warn!("could not open {}: {err}", path.display());
                self.warning = Some(format!("Could not open {}: {err}", path.display()));
            }
        }
    }

    fn save_document(&mut self, path: PathBuf) {
        match self.model.export().write_to(&path) {
            Ok(()) => {
                info!("saved {}", path.display());
                self.push_log(format!("saved {}", path.display()));
                self.document_path = Some(path);
            }
            Err(err) => {
                self.warning = Some(format!("Could not save {}: {err}", path.display()));
            }
        }
    }

    fn save_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Automaton", &["json"])
            .save_file()
        {
            self.save_document(path);
        }
    }

    fn on_model_changed(&mut self) {
        if !self.sim.autosave {
            return;
        }
        match &self.document_path {
            Some(path) => {
                if let Err(err) = self.model.export().write_to(path) {
                    error!("autosave to {} failed: {err}", path.display());
                } else {
                    debug!("autosaved {}", path.display());
                }
            }
            None => debug!("autosave skipped: document has no file yet"),
        }
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    fn step(&mut self) {
        let report = self.scheduler.tick(&mut self.model);
        match &report.event {
            TickEvent::TransitionStarted(id) => {
                if let Some(t) = self.model.transition(id) {
                    let line = format!("[{}] --> {}", report.tick, t.name);
                    self.push_log(line);
                }
            }
            TickEvent::StateEntered(id) => {
                if let Some(s) = self.model.state(id) {
                    let line = format!("[{}] {}", report.tick, s.name);
                    self.push_log(line);
                }
            }
            TickEvent::Advanced(_) => {}
        }
        if report.model_changed {
            self.on_model_changed();
        }
    }

    /// Fixed-step ticking driven by frame time.
    fn run_simulation(&mut self) {
        let now = Instant::now();
        let dt_s = self
            .last_frame
            .map(|last| (now - last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        if !self.sim.running {
            self.tick_accum_s = 0.0;
            if self.model.take_changed() {
                self.on_model_changed();
            }
            return;
        }

        let period = 1.0 / self.sim.tick_rate.max(1.0);
        self.tick_accum_s += dt_s;
        let mut budget = MAX_TICKS_PER_FRAME;
        while self.tick_accum_s >= period && budget > 0 {
            self.tick_accum_s -= period;
            budget -= 1;
            self.step();
        }
        if budget == 0 {
            self.tick_accum_s = 0.0;
        }
    }

    // ------------------------------------------------------------------
    // Inspector
    // ------------------------------------------------------------------

    fn apply_edit(&mut self, edit: InspectorEdit) {
        if let Err(err) = self.editor.apply_inspector_edit(&mut self.model, edit) {
            self.report(err);
        }
    }

    fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Inspector");
        ui.separator();

        let Some(view) = self.editor.inspector_view(&self.model) else {
            ui.label("Nothing selected.");
            return;
        };
        let InspectorView {
            element,
            name,
            duration,
            triggered,
            progress,
            elapsed_time,
        } = view;

        ui.label(if element.is_state() { "State" } else { "Transition" });
        ui.small(element.id().as_str());

        let mut name_buf = name;
        ui.horizontal(|ui| {
            ui.label("Name");
            if ui.text_edit_singleline(&mut name_buf).changed() {
                self.apply_edit(InspectorEdit::Name(name_buf.clone()));
            }
        });

        let mut duration_buf = duration;
        ui.horizontal(|ui| {
            ui.label("Duration");
            if ui
                .add(egui::DragValue::new(&mut duration_buf).speed(0.2).suffix(" ticks"))
                .changed()
            {
                self.apply_edit(InspectorEdit::Duration(duration_buf));
            }
        });

        if let Some(mut triggered_buf) = triggered {
            if ui.checkbox(&mut triggered_buf, "Triggered").changed() {
                self.apply_edit(InspectorEdit::Triggered(triggered_buf));
            }
            if let Element::Transition(id) = &element {
                if ui.button("Trigger once").clicked() {
                    if let Err(err) = self.model.trigger_once(id) {
                        self.report(err);
                    }
                }
            }
        }

        ui.add(
            egui::ProgressBar::new(progress).text(format!("{elapsed_time}/{duration}")),
        );

        ui.separator();
        if ui.button("🗑 Delete").clicked() {
            self.apply_edit(InspectorEdit::Delete);
        }
    }

    // ------------------------------------------------------------------
    // Canvas
    // ------------------------------------------------------------------

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let zoom = self.zoom;
        let center = self.editor.view_center();
        let to_world = |pos: egui::Pos2| -> Point {
            Point::new(
                (pos.x - rect.center().x) / zoom + center.x,
                (pos.y - rect.center().y) / zoom + center.y,
            )
        };

        if self.warning.is_none() {
            let scene = Scene::build(&self.model, &self.editor, &self.style);
            self.handle_pointer(ui, &response, &scene, to_world);
            self.handle_keys(ui);
        }

        // Handle zoom with scroll
        let scroll_delta = ui.ctx().input(|i| i.raw_scroll_delta);
        if response.hovered() && scroll_delta.y != 0.0 {
            self.zoom = (self.zoom + scroll_delta.y * 0.001).clamp(0.3, 3.0);
        }

        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(25, 28, 32));
        let scene = Scene::build(&self.model, &self.editor, &self.style);
        let view = View {
            origin: rect.center(),
            center: self.editor.view_center(),
            zoom: self.zoom,
        };
        for edge in &scene.edges {
            draw_edge(&painter, &view, edge, self.style.font_size);
        }
        if let Some(draft) = &scene.draft {
            draw_draft(&painter, &view, draft);
        }
        for node in &scene.nodes {
            draw_node(&painter, &view, node, &self.style);
        }
    }

    fn handle_pointer(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        scene: &Scene,
        to_world: impl Fn(egui::Pos2) -> Point,
    ) {
        if let Some(pos) = response.hover_pos() {
            self.editor.pointer_move(to_world(pos));
        }

        let (press, modifiers, released) = ui.input(|i| {
            let press = [
                (egui::PointerButton::Primary, PointerButton::Primary),
                (egui::PointerButton::Secondary, PointerButton::Secondary),
                (egui::PointerButton::Middle, PointerButton::Middle),
            ]
            .into_iter()
            .find(|(button, _)| i.pointer.button_pressed(*button))
            .zip(i.pointer.interact_pos());
            (press, i.modifiers, i.pointer.any_released())
        });

        if let Some(((_, button), pos)) = press {
            if response.hovered() {
                let mut event = PointerEvent::new(to_world(pos), button);
                event.modifiers.shift = modifiers.shift;
                event.modifiers.command = modifiers.command;
                self.pressed_on_canvas = true;
                if let Err(err) = self.editor.pointer_down(&mut self.model, scene, event) {
                    self.report(err);
                }
            }
        }

        if self.pressed_on_canvas {
            let delta = response.drag_delta() / self.zoom;
            if delta != egui::Vec2::ZERO {
                let button = if response.dragged_by(egui::PointerButton::Primary) {
                    PointerButton::Primary
                } else {
                    PointerButton::Middle
                };
                let delta = Point::new(delta.x, delta.y);
                if let Err(err) = self.editor.pointer_drag(&mut self.model, delta, button) {
                    self.report(err);
                }
            }
            if released {
                self.pressed_on_canvas = false;
                self.editor.pointer_up(&mut self.model);
            }
        }
    }

    fn handle_keys(&mut self, ui: &egui::Ui) {
        // text fields own the keyboard while focused
        if ui.ctx().memory(|m| m.focused().is_some()) {
            return;
        }
        let (delete, escape) = ui.input(|i| {
            (
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.key_pressed(egui::Key::Escape),
            )
        });
        let key = if delete {
            Some(EditorKey::Delete)
        } else if escape {
            Some(EditorKey::Escape)
        } else {
            None
        };
        if let Some(key) = key {
            if let Err(err) = self.editor.key_down(&mut self.model, key) {
                self.report(err);
            }
        }
    }
}

impl eframe::App for TicktockApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("➕ New").clicked() {
                        self.new_document();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("📂 Open...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Automaton", &["json"])
                            .pick_file()
                        {
                            self.open_document(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("💾 Save").clicked() {
                        match self.document_path.clone() {
                            Some(path) => self.save_document(path),
                            None => self.save_as(),
                        }
                        ui.close_menu();
                    }
                    if ui.button("💾 Save As...").clicked() {
                        self.save_as();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.checkbox(&mut self.sim.autosave, "Autosave");
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Reset View").clicked() {
                        self.zoom = 1.0;
                        self.editor.set_view_center(Point::ZERO);
                        ui.close_menu();
                    }
                });

                ui.menu_button("Simulation", |ui| {
                    if ui
                        .button(if self.sim.running { "⏸ Pause" } else { "▶ Run" })
                        .clicked()
                    {
                        self.sim.running = !self.sim.running;
                        ui.close_menu();
                    }
                    if ui.button("⏭ Step").clicked() {
                        self.step();
                        ui.close_menu();
                    }
                    ui.add(
                        egui::Slider::new(&mut self.sim.tick_rate, 1.0..=240.0)
                            .text("ticks/s"),
                    );
                });
            });
        });

        if let Some(message) = self.warning.clone() {
            egui::Window::new("⚠ Warning")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        self.warning = None;
                    }
                });
        }

        egui::SidePanel::right("inspector_panel")
            .default_width(260.0)
            .show(ctx, |ui| {
                self.inspector_ui(ui);

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Events");
                    if ui.button("Clear").clicked() {
                        self.log.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log {
                            ui.monospace(line);
                        }
                    });
            });

        // Bottom panel: Info
        egui::TopBottomPanel::bottom("info_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Ticktock v0.1.0");
                ui.separator();
                ui.label("Shift-click: add state | Right-click: draw transition | Cmd-click: force state | Del: delete");
                ui.separator();
                ui.label(format!("tick {}", self.scheduler.ticks()));
                if let Some(path) = &self.document_path {
                    ui.separator();
                    ui.label(path.display().to_string());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_ui(ui);
        });

        self.run_simulation();
        if self.sim.running {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

/// Canvas-to-screen transform: `screen = origin + (world - center) * zoom`
struct View {
    origin: egui::Pos2,
    center: Point,
    zoom: f32,
}

impl View {
    fn to_screen(&self, p: Point) -> egui::Pos2 {
        self.origin + egui::vec2(p.x - self.center.x, p.y - self.center.y) * self.zoom
    }
}

fn color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

fn draw_edge(painter: &egui::Painter, view: &View, edge: &EdgeShape, font_size: f32) {
    let stroke = egui::Stroke::new(edge.stroke_width * view.zoom, color(edge.stroke));
    painter.line_segment([view.to_screen(edge.from), view.to_screen(edge.tip)], stroke);
    painter.add(egui::Shape::line(
        edge.arrow.iter().map(|p| view.to_screen(*p)).collect(),
        stroke,
    ));
    painter.text(
        view.to_screen(edge.label_position),
        egui::Align2::CENTER_BOTTOM,
        &edge.label,
        egui::FontId::proportional(font_size * view.zoom),
        color(edge.stroke),
    );

    // moving dot for the active transition
    if let Some(progress) = edge.progress {
        painter.circle_filled(
            view.to_screen(edge.point_at(progress)),
            (edge.stroke_width + 2.0) * view.zoom,
            color(edge.stroke),
        );
    }
}

fn draw_draft(painter: &egui::Painter, view: &View, draft: &EdgeShape) {
    let stroke = egui::Stroke::new(draft.stroke_width * view.zoom, color(draft.stroke));
    painter.extend(egui::Shape::dashed_line(
        &[view.to_screen(draft.from), view.to_screen(draft.tip)],
        stroke,
        8.0 * view.zoom,
        6.0 * view.zoom,
    ));
    painter.add(egui::Shape::line(
        draft.arrow.iter().map(|p| view.to_screen(*p)).collect(),
        stroke,
    ));
}

fn draw_node(painter: &egui::Painter, view: &View, node: &NodeShape, style: &RenderStyle) {
    let center = view.to_screen(node.center);
    let radius = node.radius * view.zoom;
    painter.circle_filled(center, radius, color(node.fill));
    painter.circle_stroke(
        center,
        radius,
        egui::Stroke::new(node.stroke_width * view.zoom, color(node.stroke)),
    );
    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        &node.label,
        egui::FontId::proportional(style.font_size * 1.4 * view.zoom),
        color(node.text_color),
    );

    // progress ring just outside the circle, clockwise from 12 o'clock
    if let Some(progress) = node.progress {
        if progress > 0.0 {
            let ring = radius + node.stroke_width * view.zoom * 1.5;
            let steps = ((progress * 64.0).ceil() as usize).max(2);
            let points = (0..=steps)
                .map(|i| {
                    let angle = -std::f32::consts::FRAC_PI_2
                        + std::f32::consts::TAU * progress * i as f32 / steps as f32;
                    center + egui::vec2(angle.cos(), angle.sin()) * ring
                })
                .collect();
            painter.add(egui::Shape::line(
                points,
                egui::Stroke::new(style.stroke_width * view.zoom, color(style.active_color)),
            ));
        }
    }
}
