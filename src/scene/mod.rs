//! Scene Geometry
//! Headless drawing primitives for an automaton, plus hit-testing against them.
//!
//! The model knows nothing about colors or sizes; everything visual comes from
//! the [`RenderStyle`] handed to [`Scene::build`].

use crate::automata::{AutomataModel, ElementId, Point};
use crate::editor::{EditorController, Hit, HitKind, HitTest};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    pub const fn hex(value: u32) -> Self {
        Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Colors and sizes used to draw an automaton
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub select_color: Rgb,
    pub stroke_color: Rgb,
    pub fill_color: Rgb,
    pub active_color: Rgb,
    pub text_color: Rgb,
    pub triggered_color: Rgb,
    pub stroke_width: f32,
    pub stroke_width_active: f32,
    pub node_radius: f32,
    /// Sideways offset between the two paths of a reverse pair
    pub reverse_offset: f32,
    pub arrow_length: f32,
    pub font_size: f32,
    pub hit_tolerance: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            select_color: Rgb::hex(0x919191),
            stroke_color: Rgb::hex(0x878787),
            fill_color: Rgb::hex(0x333333),
            active_color: Rgb::hex(0xffa800),
            text_color: Rgb::hex(0xd9d9d9),
            triggered_color: Rgb::hex(0x2f8f58),
            stroke_width: 3.0,
            stroke_width_active: 5.0,
            node_radius: 50.0,
            reverse_offset: 20.0,
            arrow_length: 15.0,
            font_size: 10.0,
            hit_tolerance: 5.0,
        }
    }
}

/// A state drawn as a labelled circle
#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    pub id: ElementId,
    pub center: Point,
    pub radius: f32,
    pub label: String,
    pub fill: Rgb,
    pub stroke: Rgb,
    pub stroke_width: f32,
    pub text_color: Rgb,
    /// Timer progress, drawn only for the active state
    pub progress: Option<f32>,
}

/// A transition drawn as a straight path with an arrowhead
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeShape {
    pub id: ElementId,
    pub from: Point,
    pub to: Point,
    /// Where the path enters the target circle; the arrowhead points here
    pub tip: Point,
    /// Arrowhead polyline: wing, tip, wing
    pub arrow: [Point; 3],
    pub label: String,
    pub label_position: Point,
    pub stroke: Rgb,
    pub stroke_width: f32,
    /// Timer progress, drawn only for the active transition
    pub progress: Option<f32>,
}

impl EdgeShape {
    /// Point at `t` (0..=1) along the visible part of the path.
    pub fn point_at(&self, t: f32) -> Point {
        self.from + (self.tip - self.from) * t.clamp(0.0, 1.0)
    }
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Drawn first, below the nodes
    pub edges: Vec<EdgeShape>,
    /// The transition being drafted, if any
    pub draft: Option<EdgeShape>,
    pub nodes: Vec<NodeShape>,
    hit_tolerance: f32,
}

impl Scene {
    pub fn build(model: &AutomataModel, editor: &EditorController, style: &RenderStyle) -> Self {
        let edges = model
            .transitions()
            .iter()
            .filter_map(|t| {
                let start = model.state(t.start_state())?;
                let end = model.state(t.end_state()?)?;
                let (from, to) = if t.is_reverse() {
                    let offset = rotate(end.position - start.position, 90.0);
                    let offset = with_length(offset, style.reverse_offset);
                    (start.position + offset, end.position + offset)
                } else {
                    (start.position, end.position)
                };
                let tip = circle_entry(from, to, end.position, style.node_radius)
                    .unwrap_or(start.position);
                let active = model.active_transition_id() == Some(t.id());
                let stroke = if active {
                    style.active_color
                } else if editor.is_selected(t.id()) {
                    style.text_color
                } else if t.triggered {
                    style.triggered_color
                } else {
                    style.stroke_color
                };
                Some(EdgeShape {
                    id: t.id().clone(),
                    from,
                    to,
                    tip,
                    arrow: arrowhead(from, tip, style.arrow_length),
                    label: t.name.clone(),
                    label_position: midpoint(from, to),
                    stroke,
                    stroke_width: stroke_width(style, active),
                    progress: active.then(|| t.timer.progress()),
                })
            })
            .collect();

        let draft = editor.draft().and_then(|draft| {
            let from = model.state(draft.start_state())?.position;
            let to = editor.draft_tip().unwrap_or(from);
            Some(EdgeShape {
                id: draft.id().clone(),
                from,
                to,
                tip: to,
                arrow: arrowhead(from, to, style.arrow_length),
                label: draft.name.clone(),
                label_position: midpoint(from, to),
                stroke: style.stroke_color,
                stroke_width: style.stroke_width,
                progress: None,
            })
        });

        let nodes = model
            .states()
            .iter()
            .map(|s| {
                let active = model.active_state_id() == s.id();
                let selected = editor.is_selected(s.id());
                NodeShape {
                    id: s.id().clone(),
                    center: s.position,
                    radius: style.node_radius,
                    label: s.name.clone(),
                    fill: if selected { style.select_color } else { style.fill_color },
                    stroke: if active { style.active_color } else { style.stroke_color },
                    stroke_width: stroke_width(style, active),
                    text_color: if selected { Rgb::BLACK } else { style.text_color },
                    progress: active.then(|| s.timer.progress()),
                }
            })
            .collect();

        Self {
            edges,
            draft,
            nodes,
            hit_tolerance: style.hit_tolerance,
        }
    }

    pub fn node(&self, id: &ElementId) -> Option<&NodeShape> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &ElementId) -> Option<&EdgeShape> {
        self.edges.iter().find(|e| &e.id == id)
    }
}

impl HitTest for Scene {
    /// Nodes sit above edges; later items sit above earlier ones.
    fn hit_test(&self, point: Point) -> Option<Hit> {
        let tolerance = self.hit_tolerance;

        for node in self.nodes.iter().rev() {
            let distance = point.distance(node.center);
            let kind = if (distance - node.radius).abs() <= tolerance + node.stroke_width / 2.0 {
                HitKind::Stroke
            } else if distance < node.radius {
                HitKind::Fill
            } else {
                continue;
            };
            return Some(Hit {
                owner: node.id.clone(),
                kind,
            });
        }

        for edge in self.draft.iter().chain(self.edges.iter().rev()) {
            let kind = if point.distance(edge.from) <= tolerance || point.distance(edge.to) <= tolerance {
                HitKind::Segment
            } else if distance_to_segment(point, edge.from, edge.to) <= tolerance + edge.stroke_width / 2.0 {
                HitKind::Stroke
            } else {
                continue;
            };
            return Some(Hit {
                owner: edge.id.clone(),
                kind,
            });
        }
        None
    }
}

fn stroke_width(style: &RenderStyle, active: bool) -> f32 {
    if active {
        style.stroke_width_active
    } else {
        style.stroke_width
    }
}

fn midpoint(a: Point, b: Point) -> Point {
    a + (b - a) * 0.5
}

/// Rotate clockwise on screen (y grows downwards).
fn rotate(v: Point, degrees: f32) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Point::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

fn with_length(v: Point, length: f32) -> Point {
    let current = v.length();
    if current <= f32::EPSILON {
        return Point::ZERO;
    }
    v * (length / current)
}

/// Arrowhead wings for a path arriving at `tip` from `from`.
fn arrowhead(from: Point, tip: Point, length: f32) -> [Point; 3] {
    let v = with_length(tip - from, length);
    [tip + rotate(v, 135.0), tip, tip + rotate(v, -135.0)]
}

/// First point where the segment `a -> b` crosses the circle.
fn circle_entry(a: Point, b: Point, center: Point, radius: f32) -> Option<Point> {
    let d = b - a;
    let f = a - center;
    let qa = d.x * d.x + d.y * d.y;
    if qa <= f32::EPSILON {
        return None;
    }
    let qb = 2.0 * (f.x * d.x + f.y * d.y);
    let qc = f.x * f.x + f.y * f.y - radius * radius;
    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .find(|t| (0.0..=1.0).contains(t))
        .map(|t| a + d * t)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let ap = p - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
