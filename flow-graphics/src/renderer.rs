use std::{
    cell::RefCell,
    collections::HashSet,
    rc::{Rc, Weak},
    sync::Arc,
};

use derivative::Derivative;
use flow_core::{
    error::ErrorSink,
    model::{ConnectionMode, EdgeId},
    selector::{Memo, Selector},
    store::{GraphState, ListenerId, Snapshot, Store},
    visibility::{group_edges_by_z_level, visible_edge_ids},
};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    capability::{CapabilityBundle, EdgeCallbacks, registry_eq},
    edge_type::EdgeTypeRegistry,
    marker::MarkerRegistry,
};

/// What the caller hands the renderer, as opposed to what it reads from the store.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct EdgeRendererProps {
    /// Namespaces marker ids so several editors can share one document.
    pub renderer_id: String,
    pub default_marker_color: String,
    /// Only render edges with an endpoint inside the viewport.
    pub only_render_visible_elements: bool,
    pub elevate_edges_on_select: bool,
    #[derivative(PartialEq(compare_with = "registry_eq"))]
    pub edge_types: Arc<EdgeTypeRegistry>,
    pub no_pan_class_name: String,
    pub reconnect_radius: f32,
    pub callbacks: EdgeCallbacks,
}

impl Default for EdgeRendererProps {
    fn default() -> Self {
        Self {
            renderer_id: "1".to_owned(),
            default_marker_color: "#b1b1b7".to_owned(),
            only_render_visible_elements: false,
            elevate_edges_on_select: false,
            edge_types: Arc::new(EdgeTypeRegistry::default()),
            no_pan_class_name: "nopan".to_owned(),
            reconnect_radius: 10.0,
            callbacks: EdgeCallbacks::default(),
        }
    }
}

/// The part of the store the renderer depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSlice {
    pub width: f32,
    pub height: f32,
    pub edges_focusable: bool,
    pub edges_updatable: bool,
    pub elements_selectable: bool,
    pub connection_mode: ConnectionMode,
    pub on_error: ErrorSink,
}

impl RendererSlice {
    #[must_use]
    pub fn select(state: &GraphState) -> Self {
        Self {
            width: state.width,
            height: state.height,
            edges_focusable: state.edges_focusable,
            edges_updatable: state.edges_updatable,
            elements_selectable: state.elements_selectable,
            connection_mode: state.connection_mode,
            on_error: state.on_error.clone(),
        }
    }
}

/// A per-edge rendering unit, kept alive for as long as its edge stays visible.
pub trait EdgeUnit {
    fn mount(id: &EdgeId, bundle: &Arc<CapabilityBundle>) -> Self
    where
        Self: Sized;

    /// Called when the renderer built a new bundle; never called with the bundle the unit
    /// already holds.
    fn set_bundle(&mut self, bundle: &Arc<CapabilityBundle>);

    fn unmount(self)
    where
        Self: Sized,
    {
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// This snapshot was already rendered.
    Skipped,
    /// A new snapshot, but nothing the renderer depends on changed.
    Unchanged,
    Rendered {
        mounted: Vec<EdgeId>,
        unmounted: Vec<EdgeId>,
    },
}

pub struct EdgeRenderer<U> {
    props: EdgeRendererProps,
    props_dirty: bool,
    slice: Selector<RendererSlice>,
    visible: Memo<Arc<[EdgeId]>>,
    bundle: Option<Arc<CapabilityBundle>>,
    markers: MarkerRegistry,
    units: IndexMap<EdgeId, U>,
    rendered: Option<Snapshot>,
    renders: u64,
}

impl<U: EdgeUnit> EdgeRenderer<U> {
    #[must_use]
    pub fn new(props: EdgeRendererProps) -> Self {
        let markers = MarkerRegistry::new(&props.renderer_id, &props.default_marker_color);
        Self {
            props,
            props_dirty: true,
            slice: Selector::new(RendererSlice::select),
            visible: Memo::default(),
            bundle: None,
            markers,
            units: IndexMap::new(),
            rendered: None,
            renders: 0,
        }
    }

    #[must_use]
    pub const fn props(&self) -> &EdgeRendererProps {
        &self.props
    }

    /// Replace the props. Equal props (callbacks compared by identity) are a no-op.
    pub fn set_props(&mut self, props: EdgeRendererProps) {
        if props == self.props {
            return;
        }
        if props.renderer_id != self.props.renderer_id
            || props.default_marker_color != self.props.default_marker_color
        {
            self.markers = MarkerRegistry::new(&props.renderer_id, &props.default_marker_color);
        }
        self.props = props;
        self.props_dirty = true;
    }

    pub fn update_props(&mut self, f: impl FnOnce(&mut EdgeRendererProps)) {
        let mut props = self.props.clone();
        f(&mut props);
        self.set_props(props);
    }

    /// Bring the rendered units in line with `snapshot`.
    pub fn render(&mut self, snapshot: &Snapshot) -> RenderOutcome {
        let seen = self
            .rendered
            .as_ref()
            .is_some_and(|rendered| rendered.ptr_eq(snapshot));
        if !self.props_dirty && seen {
            return RenderOutcome::Skipped;
        }
        self.rendered = Some(snapshot.clone());
        let markers_changed = self.markers.sync(snapshot);

        let props_changed = std::mem::take(&mut self.props_dirty);
        let slice_changed = self.slice.poll(snapshot);
        let visible_changed = self.visible.update_seq(visible_edge_ids(
            snapshot,
            self.props.only_render_visible_elements,
        ));

        let bundle_changed = props_changed || slice_changed || self.bundle.is_none();
        if !bundle_changed && !visible_changed && !markers_changed {
            tracing::trace!(version = snapshot.version(), "edge renderer unchanged");
            return RenderOutcome::Unchanged;
        }

        if bundle_changed {
            self.bundle = self.build_bundle().map(Arc::new);
        }
        let Some(bundle) = self.bundle.clone() else {
            return RenderOutcome::Unchanged;
        };

        let visible = self.visible_ids();
        let (mounted, unmounted) = self.reconcile(&visible, &bundle, bundle_changed);
        self.renders += 1;
        tracing::debug!(
            version = snapshot.version(),
            visible = visible.len(),
            mounted = mounted.len(),
            unmounted = unmounted.len(),
            "edge renderer rendered"
        );
        RenderOutcome::Rendered { mounted, unmounted }
    }

    fn build_bundle(&self) -> Option<CapabilityBundle> {
        let slice = self.slice.get()?;
        Some(CapabilityBundle {
            edges_focusable: slice.edges_focusable,
            edges_updatable: slice.edges_updatable,
            elements_selectable: slice.elements_selectable,
            connection_mode: slice.connection_mode,
            elevate_edges_on_select: self.props.elevate_edges_on_select,
            renderer_id: self.props.renderer_id.clone(),
            on_error: slice.on_error.clone(),
            edge_types: self.props.edge_types.clone(),
            no_pan_class_name: self.props.no_pan_class_name.clone(),
            reconnect_radius: self.props.reconnect_radius,
            callbacks: self.props.callbacks.clone(),
        })
    }

    /// Units are matched by id: an id visible before and after keeps its unit, wherever it
    /// moved in the sequence.
    fn reconcile(
        &mut self,
        visible: &[EdgeId],
        bundle: &Arc<CapabilityBundle>,
        bundle_changed: bool,
    ) -> (Vec<EdgeId>, Vec<EdgeId>) {
        let wanted: HashSet<&EdgeId> = visible.iter().collect();
        let (mut kept, gone): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(&mut self.units)
            .into_iter()
            .partition(|(id, _)| wanted.contains(id));

        let unmounted = gone
            .into_iter()
            .map(|(id, unit)| {
                unit.unmount();
                id
            })
            .collect_vec();

        let mut mounted = Vec::new();
        for id in visible {
            let unit = match kept.swap_remove(id) {
                Some(mut unit) => {
                    if bundle_changed {
                        unit.set_bundle(bundle);
                    }
                    unit
                }
                None => {
                    mounted.push(id.clone());
                    U::mount(id, bundle)
                }
            };
            self.units.insert(id.clone(), unit);
        }

        (mounted, unmounted)
    }

    /// The visible edge ids of the last render, in store order.
    #[must_use]
    pub fn visible_ids(&self) -> Arc<[EdgeId]> {
        self.visible
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Visible ids in the order they are painted: by z level, then store order.
    #[must_use]
    pub fn paint_order(&self, state: &GraphState) -> Vec<EdgeId> {
        group_edges_by_z_level(
            state,
            self.units.keys(),
            self.props.elevate_edges_on_select,
        )
        .into_iter()
        .flat_map(|(_, ids)| ids)
        .collect()
    }

    #[must_use]
    pub const fn bundle(&self) -> Option<&Arc<CapabilityBundle>> {
        self.bundle.as_ref()
    }

    #[must_use]
    pub const fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn units(&self) -> impl Iterator<Item = (&EdgeId, &U)> {
        self.units.iter()
    }

    #[must_use]
    pub fn unit(&self, id: &EdgeId) -> Option<&U> {
        self.units.get(id)
    }

    pub fn unit_mut(&mut self, id: &EdgeId) -> Option<&mut U> {
        self.units.get_mut(id)
    }

    /// Number of renders that got past the change checks.
    #[must_use]
    pub const fn render_count(&self) -> u64 {
        self.renders
    }
}

impl<U: EdgeUnit + 'static> EdgeRenderer<U> {
    /// Render on every commit of `store`. The store only holds a weak reference, so dropping
    /// the renderer ends the subscription's effect.
    pub fn subscribe(renderer: &Rc<RefCell<Self>>, store: &mut Store) -> ListenerId {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(renderer);
        let id = store.subscribe(move |snapshot| {
            if let Some(renderer) = weak.upgrade() {
                renderer.borrow_mut().render(snapshot);
            }
        });
        renderer.borrow_mut().render(&store.snapshot());
        id
    }
}
