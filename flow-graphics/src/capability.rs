use std::{fmt, ops::Deref, sync::Arc};

use derivative::Derivative;
use egui::Pos2;
use flow_core::{
    error::ErrorSink,
    model::{Connection, ConnectionMode, Edge, HandleType},
};

use crate::edge_type::EdgeTypeRegistry;

/// A shared handler. Two callbacks are equal iff they are the same allocation, so passing
/// the same callback again never looks like a change to the units receiving it.
pub struct Callback<F: ?Sized>(Arc<F>);

impl<F: ?Sized> Callback<F> {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F: ?Sized> PartialEq for Callback<F> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<F: ?Sized> Deref for Callback<F> {
    type Target = F;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

impl<F: ?Sized> From<Arc<F>> for Callback<F> {
    fn from(f: Arc<F>) -> Self {
        Self(f)
    }
}

pub type PointerHandler = Callback<dyn Fn(&Edge, Pos2)>;
pub type ReconnectHandler = Callback<dyn Fn(&Edge, Pos2, HandleType)>;
pub type ConnectionHandler = Callback<dyn Fn(&Edge, &Connection)>;

impl PointerHandler {
    pub fn new(f: impl Fn(&Edge, Pos2) + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl ReconnectHandler {
    pub fn new(f: impl Fn(&Edge, Pos2, HandleType) + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl ConnectionHandler {
    pub fn new(f: impl Fn(&Edge, &Connection) + 'static) -> Self {
        Self(Arc::new(f))
    }
}

/// Interaction callbacks forwarded untouched to every rendered edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeCallbacks {
    pub on_click: Option<PointerHandler>,
    pub on_double_click: Option<PointerHandler>,
    pub on_context_menu: Option<PointerHandler>,
    pub on_mouse_enter: Option<PointerHandler>,
    pub on_mouse_move: Option<PointerHandler>,
    pub on_mouse_leave: Option<PointerHandler>,
    pub on_reconnect_start: Option<ReconnectHandler>,
    pub on_reconnect_end: Option<ReconnectHandler>,
    /// Called with the new connection when a reconnect gesture is released over a node.
    pub on_reconnect: Option<ConnectionHandler>,
}

/// The capabilities every edge of one render pass receives.
///
/// Built by the renderer only when one of its inputs changed, then shared by reference, so
/// all units of a pass see the very same bundle.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct CapabilityBundle {
    pub edges_focusable: bool,
    pub edges_updatable: bool,
    pub elements_selectable: bool,
    pub connection_mode: ConnectionMode,
    /// Paint selected edges (and edges touching selected nodes) above the others.
    pub elevate_edges_on_select: bool,
    pub renderer_id: String,
    pub on_error: ErrorSink,
    #[derivative(PartialEq(compare_with = "registry_eq"))]
    pub edge_types: Arc<EdgeTypeRegistry>,
    /// Class attached to edges so the host does not start a pan from them.
    pub no_pan_class_name: String,
    pub reconnect_radius: f32,
    pub callbacks: EdgeCallbacks,
}

pub(crate) fn registry_eq(a: &Arc<EdgeTypeRegistry>, b: &Arc<EdgeTypeRegistry>) -> bool {
    Arc::ptr_eq(a, b)
}

impl CapabilityBundle {
    /// A global `false` always wins; otherwise the edge may opt out.
    #[must_use]
    pub fn is_selectable(&self, edge: &Edge) -> bool {
        self.elements_selectable && edge.selectable.unwrap_or(true)
    }

    #[must_use]
    pub fn is_focusable(&self, edge: &Edge) -> bool {
        self.edges_focusable && edge.focusable.unwrap_or(true)
    }

    #[must_use]
    pub fn is_updatable(&self, edge: &Edge) -> bool {
        self.edges_updatable && edge.updatable.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn bundle(global: bool) -> CapabilityBundle {
        CapabilityBundle {
            edges_focusable: global,
            edges_updatable: global,
            elements_selectable: global,
            connection_mode: ConnectionMode::Strict,
            elevate_edges_on_select: false,
            renderer_id: "1".to_owned(),
            on_error: ErrorSink::default(),
            edge_types: Arc::new(EdgeTypeRegistry::default()),
            no_pan_class_name: "nopan".to_owned(),
            reconnect_radius: 10.0,
            callbacks: EdgeCallbacks::default(),
        }
    }

    #[rstest]
    #[case(true, None, true)]
    #[case(true, Some(true), true)]
    #[case(true, Some(false), false)]
    #[case(false, None, false)]
    #[case(false, Some(true), false)]
    #[case(false, Some(false), false)]
    fn global_false_wins(
        #[case] global: bool,
        #[case] per_edge: Option<bool>,
        #[case] expected: bool,
    ) {
        let mut edge = Edge::new("e1", "a", "b");
        edge.selectable = per_edge;
        edge.focusable = per_edge;
        edge.updatable = per_edge;
        edge.selected = true;

        let bundle = bundle(global);
        assert_eq!(bundle.is_selectable(&edge), expected);
        assert_eq!(bundle.is_focusable(&edge), expected);
        assert_eq!(bundle.is_updatable(&edge), expected);
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let click = PointerHandler::new(|_, _| {});
        let a = EdgeCallbacks {
            on_click: Some(click.clone()),
            ..EdgeCallbacks::default()
        };
        let b = EdgeCallbacks {
            on_click: Some(click),
            ..EdgeCallbacks::default()
        };
        let c = EdgeCallbacks {
            on_click: Some(PointerHandler::new(|_, _| {})),
            ..EdgeCallbacks::default()
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
