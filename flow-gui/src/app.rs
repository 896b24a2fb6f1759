use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use eframe::egui::{
    self, Align2, CornerRadius, FontId, Pos2, Rect, Scene, StrokeKind, Vec2,
};
use egui_notify::Toasts;
use flow_core::{
    error::ErrorSink,
    model::{Connection, EdgeId},
    store::{Action, GraphState, Store},
    viewport::Viewport,
};
use flow_graphics::{
    EdgeRenderer, EdgeRendererProps, EdgeWrapper,
    capability::{ConnectionHandler, EdgeCallbacks, PointerHandler, ReconnectHandler},
};
use tracing::{debug, warn};

use crate::demo::DemoConfig;

const EVENT_LOG_LEN: usize = 12;

type Shared<T> = Rc<RefCell<T>>;

pub struct App {
    store: Store,
    renderer: Shared<EdgeRenderer<EdgeWrapper>>,
    scene_rect: Rect,
    reset_requested: bool,
    errors: Shared<VecDeque<String>>,
    events: Shared<VecDeque<String>>,
    reconnects: Shared<Vec<(EdgeId, Connection)>>,
    toasts: Toasts,
}

impl App {
    /// Called once before the first frame.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: &DemoConfig) -> anyhow::Result<Self> {
        Self::from_config(config)
    }

    pub fn from_config(config: &DemoConfig) -> anyhow::Result<Self> {
        let errors = Shared::<VecDeque<String>>::default();
        let events = Shared::<VecDeque<String>>::default();
        let reconnects = Shared::<Vec<(EdgeId, Connection)>>::default();

        let mut state = config.graph()?;
        state.on_error = {
            let errors = errors.clone();
            ErrorSink::new(move |code, message| {
                warn!("[{code}] {message}");
                errors.borrow_mut().push_back(format!("[{code}] {message}"));
            })
        };
        let mut store = Store::new(state);

        let mut props = config.props();
        props.callbacks = callbacks(&events, &reconnects);
        let renderer = Rc::new(RefCell::new(EdgeRenderer::new(props)));
        EdgeRenderer::subscribe(&renderer, &mut store);

        Ok(Self {
            store,
            renderer,
            scene_rect: Rect::ZERO,
            reset_requested: true,
            errors,
            events,
            reconnects,
            toasts: Toasts::default(),
        })
    }

    fn reset(&mut self) {
        self.reset_requested = true;
    }

    const ZOOM_FACTOR: f32 = 1.25;

    fn zoom_in(&mut self) {
        self.scene_rect = self.scene_rect.scale_from_center(Self::ZOOM_FACTOR.recip());
    }

    fn zoom_out(&mut self) {
        self.scene_rect = self.scene_rect.scale_from_center(Self::ZOOM_FACTOR);
    }

    fn export_svg(&self) -> String {
        self.renderer
            .borrow_mut()
            .export_svg(&self.store.snapshot())
            .to_string()
    }

    /// Update a store flag only when it actually changes, so the renderer is not woken for
    /// nothing.
    fn set_flag(&mut self, value: bool, flag: fn(&mut GraphState) -> &mut bool) {
        let mut current = GraphState::clone(&self.store.snapshot());
        if *flag(&mut current) != value {
            self.store.update(|state| *flag(state) = value);
        }
    }

    /// Props are not part of the store, so the renderer is brought up to date here instead
    /// of on the next commit.
    fn update_props(&mut self, f: impl FnOnce(&mut EdgeRendererProps)) {
        let mut renderer = self.renderer.borrow_mut();
        renderer.update_props(f);
        renderer.render(&self.store.snapshot());
    }

    fn apply_pending(&mut self) {
        let reconnects = std::mem::take(&mut *self.reconnects.borrow_mut());
        for (id, connection) in reconnects {
            let result = self.store.try_update(|state| {
                state.update_edge(&id, |edge| {
                    edge.source = connection.source;
                    edge.target = connection.target;
                })
            });
            if let Err(err) = result {
                self.toasts.error(err.to_string());
            }
        }

        let errors = std::mem::take(&mut *self.errors.borrow_mut());
        for error in errors {
            self.toasts.warning(error);
        }
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Renderer");
        let props = self.renderer.borrow().props().clone();
        let mut only_visible = props.only_render_visible_elements;
        let mut elevate = props.elevate_edges_on_select;
        ui.checkbox(&mut only_visible, "Only render visible edges");
        ui.checkbox(&mut elevate, "Elevate selected edges");
        self.update_props(|props| {
            props.only_render_visible_elements = only_visible;
            props.elevate_edges_on_select = elevate;
        });

        ui.separator();
        ui.heading("Store");
        let snapshot = self.store.snapshot();
        let mut focusable = snapshot.edges_focusable;
        let mut updatable = snapshot.edges_updatable;
        let mut selectable = snapshot.elements_selectable;
        ui.checkbox(&mut focusable, "Edges focusable");
        ui.checkbox(&mut updatable, "Edges updatable");
        ui.checkbox(&mut selectable, "Elements selectable");
        self.set_flag(focusable, |state| &mut state.edges_focusable);
        self.set_flag(updatable, |state| &mut state.edges_updatable);
        self.set_flag(selectable, |state| &mut state.elements_selectable);

        ui.separator();
        let renderer = self.renderer.borrow();
        egui::Grid::new("stats").show(ui, |ui| {
            ui.label("Version");
            ui.label(snapshot.version().to_string());
            ui.end_row();
            ui.label("Nodes");
            ui.label(snapshot.nodes().len().to_string());
            ui.end_row();
            ui.label("Edges");
            ui.label(snapshot.edges().len().to_string());
            ui.end_row();
            ui.label("Rendered");
            ui.label(renderer.visible_ids().len().to_string());
            ui.end_row();
            ui.label("Markers");
            ui.label(renderer.markers().definitions().len().to_string());
            ui.end_row();
            ui.label("Renders");
            ui.label(renderer.render_count().to_string());
            ui.end_row();
        });

        ui.separator();
        ui.heading("Events");
        for event in self.events.borrow().iter().rev() {
            ui.monospace(event);
        }
    }

    fn graph_ui(&mut self, ui: &mut egui::Ui) {
        let snapshot = self.store.snapshot();
        let renderer = self.renderer.clone();
        let mut actions = Vec::new();
        let mut visible = Rect::NOTHING;

        let response = Scene::new()
            .show(ui, &mut self.scene_rect, |ui| {
                let painter = ui.painter();
                let response = ui.response();
                visible = ui.clip_rect();

                painter.add(egui::Shape::rect_filled(
                    ui.clip_rect(),
                    CornerRadius::ZERO,
                    ui.visuals().faint_bg_color,
                ));

                actions = renderer.borrow_mut().ui(ui, &response, &snapshot);

                let stroke = ui.visuals().noninteractive().fg_stroke;
                for node in snapshot.nodes().values() {
                    let stroke = if node.selected {
                        ui.visuals().selection.stroke
                    } else {
                        stroke
                    };
                    painter.rect(
                        node.rect(),
                        CornerRadius::same(4),
                        ui.visuals().extreme_bg_color,
                        stroke,
                        StrokeKind::Inside,
                    );
                    painter.text(
                        node.rect().center(),
                        Align2::CENTER_CENTER,
                        node.id.as_str(),
                        FontId::proportional(14.0),
                        ui.visuals().text_color(),
                    );
                }

                if response.clicked() && actions.is_empty() {
                    actions.push(Action::UnselectAll);
                }
            })
            .response;

        for action in &actions {
            debug!(?action, "apply");
            self.store.update(|state| state.apply(action));
        }

        // Keep the store's idea of the viewport in line with what the scene shows.
        let size = response.rect.size();
        if visible.is_positive() && size.x > 0.0 {
            let viewport = Viewport::fitting(visible, size.x);
            if snapshot.viewport != viewport || snapshot.size() != size {
                self.store.batch(|store| {
                    store.update(|state| state.resize(size.x, size.y));
                    store.update(|state| state.set_viewport(viewport));
                });
            }
        }

        if self.reset_requested {
            self.scene_rect = graph_bounds(&snapshot).expand(40.0);
            self.reset_requested = false;
        }
    }
}

fn graph_bounds(state: &GraphState) -> Rect {
    state
        .nodes()
        .values()
        .map(|node| node.rect())
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::from_min_size(Pos2::ZERO, Vec2::splat(100.0)))
}

fn callbacks(
    events: &Shared<VecDeque<String>>,
    reconnects: &Shared<Vec<(EdgeId, Connection)>>,
) -> EdgeCallbacks {
    let log = |name: &'static str| {
        let events = events.clone();
        PointerHandler::new(move |edge, _| push_event(&events, format!("{name} {}", edge.id)))
    };
    let log_handle = |name: &'static str| {
        let events = events.clone();
        ReconnectHandler::new(move |edge, _, handle| {
            push_event(&events, format!("{name} {} {handle:?}", edge.id));
        })
    };
    let on_reconnect = {
        let events = events.clone();
        let reconnects = reconnects.clone();
        ConnectionHandler::new(move |edge, connection| {
            push_event(
                &events,
                format!(
                    "reconnect {} {} -> {}",
                    edge.id, connection.source, connection.target
                ),
            );
            reconnects
                .borrow_mut()
                .push((edge.id.clone(), connection.clone()));
        })
    };

    EdgeCallbacks {
        on_click: Some(log("click")),
        on_double_click: Some(log("double click")),
        on_context_menu: Some(log("context menu")),
        on_mouse_enter: Some(log("enter")),
        on_mouse_move: None,
        on_mouse_leave: Some(log("leave")),
        on_reconnect_start: Some(log_handle("reconnect start")),
        on_reconnect_end: Some(log_handle("reconnect end")),
        on_reconnect: Some(on_reconnect),
    }
}

fn push_event(events: &Shared<VecDeque<String>>, event: String) {
    let mut events = events.borrow_mut();
    events.push_back(event);
    while events.len() > EVENT_LOG_LEN {
        events.pop_front();
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_pending();

        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.visuals_mut().button_frame = false;
                egui::widgets::global_theme_preference_buttons(ui);

                ui.separator();

                if ui.button("Reset").clicked() {
                    self.reset();
                }
                if ui.button("Zoom In").clicked() {
                    self.zoom_in();
                }
                if ui.button("Zoom Out").clicked() {
                    self.zoom_out();
                }

                ui.separator();

                if ui.button("Copy SVG").clicked() {
                    ui.ctx().copy_text(self.export_svg());
                    self.toasts.info("SVG copied to clipboard");
                }
            });
        });

        egui::SidePanel::right("controls").show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("controls")
                .show(ui, |ui| self.controls_ui(ui));
        });

        egui::CentralPanel::default().show(ctx, |ui| self.graph_ui(ui));

        self.toasts.show(ctx);
    }
}
