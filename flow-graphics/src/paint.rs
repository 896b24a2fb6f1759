use egui::{
    Color32, Id, Pos2, Rect, Response, Sense, Shape, Stroke, Vec2, epaint::CubicBezierShape,
};
use flow_core::{
    model::{Connection, EdgeId, EdgeMarker, HandleType, MarkerKind},
    store::{Action, Snapshot},
};
use itertools::Itertools;

use crate::{
    marker::MarkerRegistry,
    path::EdgePath,
    renderer::EdgeRenderer,
    unit::{EdgeGeometry, EdgeWrapper},
};

/// Distance (in graph units) within which the pointer counts as being on an edge.
const TOLERANCE: f32 = 5.0;
pub const STROKE_WIDTH: f32 = 1.0;

impl EdgeRenderer<EdgeWrapper> {
    /// Paint the rendered edges into `ui` and dispatch pointer interaction to the
    /// callbacks in the capability bundle. Nothing is written to the store: requested
    /// state changes come back as actions.
    ///
    /// `ui` is expected to be in graph coordinates (e.g. the inside of a [`egui::Scene`]),
    /// and `response` the response covering the whole pane.
    pub fn ui(&mut self, ui: &egui::Ui, response: &Response, snapshot: &Snapshot) -> Vec<Action> {
        let Some(bundle) = self.bundle().cloned() else {
            return Vec::new();
        };
        let mut actions = Vec::new();

        let order = self.paint_order(snapshot);
        let geometries = order
            .iter()
            .filter_map(|id| self.unit_mut(id)?.geometry(snapshot))
            .collect_vec();

        let pointer = response.hover_pos();
        let hit = pointer.and_then(|pos| {
            geometries
                .iter()
                .rev()
                .find(|geometry| geometry.path.contains_point(pos, TOLERANCE))
                .map(|geometry| geometry.edge.id.clone())
        });

        let callbacks = &bundle.callbacks;
        let pointer_moved = ui.input(|i| i.pointer.delta() != Vec2::ZERO);
        for geometry in &geometries {
            let edge = geometry.edge;
            let Some(unit) = self.unit_mut(&edge.id) else {
                continue;
            };
            let pos = match pointer {
                Some(pos) if hit.as_ref() == Some(&edge.id) => pos,
                _ => {
                    if let Some((_, last)) = unit.leave() {
                        if let Some(on_mouse_leave) = &callbacks.on_mouse_leave {
                            on_mouse_leave(edge, pointer.unwrap_or(last));
                        }
                    }
                    continue;
                }
            };
            if unit.hover(edge, pos) {
                if let Some(on_mouse_enter) = &callbacks.on_mouse_enter {
                    on_mouse_enter(edge, pos);
                }
            } else if pointer_moved {
                if let Some(on_mouse_move) = &callbacks.on_mouse_move {
                    on_mouse_move(edge, pos);
                }
            }

            if response.clicked() {
                if bundle.is_selectable(edge) {
                    actions.push(Action::SelectEdges {
                        ids: vec![edge.id.clone()],
                        additive: ui.input(|i| i.modifiers.shift),
                    });
                }
                if let Some(on_click) = &callbacks.on_click {
                    on_click(edge, pos);
                }
            }
            if response.double_clicked() {
                if let Some(on_double_click) = &callbacks.on_double_click {
                    on_double_click(edge, pos);
                }
            }
            if response.secondary_clicked() {
                if let Some(on_context_menu) = &callbacks.on_context_menu {
                    on_context_menu(edge, pos);
                }
            }
        }

        let mut shapes = Vec::new();
        for geometry in &geometries {
            let edge = geometry.edge;
            let hovered = self.unit(&edge.id).is_some_and(EdgeWrapper::is_hovered);
            let stroke = if edge.selected {
                ui.visuals().selection.stroke
            } else if hovered {
                ui.style().visuals.widgets.hovered.fg_stroke
            } else {
                ui.visuals().noninteractive().fg_stroke
            };

            shapes.push(path_shape(&geometry.path, stroke));
            if let Some(marker) = &edge.marker_start {
                shapes.extend(marker_shape(
                    self.markers(),
                    marker,
                    geometry.path.start(),
                    geometry.path.start_direction(),
                    stroke,
                ));
            }
            if let Some(marker) = &edge.marker_end {
                shapes.extend(marker_shape(
                    self.markers(),
                    marker,
                    geometry.path.end(),
                    geometry.path.end_direction(),
                    stroke,
                ));
            }
        }

        for geometry in &geometries {
            if bundle.is_updatable(geometry.edge) {
                self.reconnect_handles(ui, snapshot, geometry, &mut shapes);
            }
        }

        ui.painter().extend(shapes);
        actions
    }

    /// The two drag handles at the ends of an updatable edge.
    fn reconnect_handles(
        &mut self,
        ui: &egui::Ui,
        snapshot: &Snapshot,
        geometry: &EdgeGeometry<'_>,
        shapes: &mut Vec<Shape>,
    ) {
        let edge = geometry.edge;
        let Some(unit) = self.unit_mut(&edge.id) else {
            return;
        };
        let bundle = unit.bundle().clone();
        let radius = bundle.reconnect_radius;

        for (handle, anchor) in [
            (HandleType::Source, geometry.path.start()),
            (HandleType::Target, geometry.path.end()),
        ] {
            let response = ui.interact(
                Rect::from_center_size(anchor, Vec2::splat(2.0 * radius)),
                Id::new((
                    "flow-edge-reconnect",
                    bundle.renderer_id.as_str(),
                    edge.id.as_str(),
                    handle,
                )),
                Sense::drag(),
            );
            let pointer = response.interact_pointer_pos().unwrap_or(anchor);

            if response.drag_started() {
                unit.start_reconnect(handle, pointer);
                if let Some(on_reconnect_start) = &bundle.callbacks.on_reconnect_start {
                    on_reconnect_start(edge, pointer, handle);
                }
            }
            if response.dragged() {
                unit.drag_reconnect(pointer);
            }

            if unit.reconnecting() == Some(handle) && !response.drag_stopped() {
                let fixed = match handle {
                    HandleType::Source => geometry.path.end(),
                    HandleType::Target => geometry.path.start(),
                };
                shapes.extend(Shape::dashed_line(
                    &[fixed, pointer],
                    ui.style().visuals.widgets.active.fg_stroke,
                    4.0,
                    4.0,
                ));
            }

            let released = response
                .drag_stopped()
                .then(|| unit.finish_reconnect())
                .flatten()
                .filter(|(dragged, _)| *dragged == handle);
            if let Some((_, last)) = released {
                let pointer = response.interact_pointer_pos().unwrap_or(last);
                if let Some(on_reconnect_end) = &bundle.callbacks.on_reconnect_end {
                    on_reconnect_end(edge, pointer, handle);
                }
                let over = snapshot
                    .nodes()
                    .values()
                    .rev()
                    .find(|node| node.rect().contains(pointer));
                if let (Some(node), Some(on_reconnect)) = (over, &bundle.callbacks.on_reconnect) {
                    let connection = match handle {
                        HandleType::Source => Connection {
                            source: node.id.clone(),
                            target: edge.target.clone(),
                        },
                        HandleType::Target => Connection {
                            source: edge.source.clone(),
                            target: node.id.clone(),
                        },
                    };
                    tracing::debug!(edge = %edge.id, ?connection, "reconnect");
                    on_reconnect(edge, &connection);
                }
            }

            if response.hovered() || unit.is_hovered() {
                let stroke = ui.style().interact(&response).fg_stroke;
                shapes.push(Shape::circle_stroke(anchor, radius / 2.0, stroke));
            }
        }
    }

    /// Ids hit by `pos`, topmost first.
    #[must_use]
    pub fn edges_at(&mut self, snapshot: &Snapshot, pos: Pos2) -> Vec<EdgeId> {
        self.paint_order(snapshot)
            .iter()
            .rev()
            .filter_map(|id| {
                let geometry = self.unit_mut(id)?.geometry(snapshot)?;
                geometry
                    .path
                    .contains_point(pos, TOLERANCE)
                    .then(|| id.clone())
            })
            .collect()
    }
}

fn path_shape(path: &EdgePath, stroke: Stroke) -> Shape {
    match path {
        EdgePath::Line(points) => Shape::line_segment(*points, stroke),
        EdgePath::Cubic(points) => Shape::CubicBezier(CubicBezierShape::from_points_stroke(
            *points,
            false,
            Color32::TRANSPARENT,
            stroke,
        )),
        EdgePath::Polyline(points) => Shape::line(points.clone(), stroke),
    }
}

fn marker_shape(
    markers: &MarkerRegistry,
    marker: &EdgeMarker,
    tip: Pos2,
    direction: Vec2,
    stroke: Stroke,
) -> Option<Shape> {
    let definition = markers.get(marker)?;
    let color = Color32::from_hex(&definition.color).unwrap_or(stroke.color);
    let outline = definition.outline(tip, direction, stroke.width.max(STROKE_WIDTH));
    let stroke = Stroke::new(definition.stroke_width * stroke.width, color);
    Some(match definition.kind {
        MarkerKind::Arrow => Shape::line(outline, stroke),
        MarkerKind::ArrowClosed => Shape::convex_polygon(outline, color, stroke),
    })
}
