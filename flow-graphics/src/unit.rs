use std::{collections::HashSet, sync::Arc};

use egui::Pos2;
use flow_core::{
    model::{Edge, EdgeId, HandleType, Node, NodeId},
    store::GraphState,
};

use crate::{
    capability::CapabilityBundle,
    edge_type::{EdgeError, EdgeType},
    path::EdgePath,
    renderer::EdgeUnit,
};

/// An edge resolved against the store: the edge itself and the path it is drawn along.
#[derive(Debug)]
pub struct EdgeGeometry<'a> {
    pub edge: &'a Edge,
    pub path: EdgePath,
}

/// The default per-edge unit: resolves its edge's endpoints and type, and keeps the
/// pointer state of the edge between frames.
pub struct EdgeWrapper {
    id: EdgeId,
    bundle: Arc<CapabilityBundle>,
    edge_type: Option<(String, Arc<dyn EdgeType>)>,
    /// The edge as it was while hovered, and where the pointer last was on it.
    hovered: Option<(Edge, Pos2)>,
    reconnecting: Option<(HandleType, Pos2)>,
    reported: HashSet<EdgeError>,
}

impl EdgeUnit for EdgeWrapper {
    fn mount(id: &EdgeId, bundle: &Arc<CapabilityBundle>) -> Self {
        tracing::trace!(%id, "mount edge");
        Self {
            id: id.clone(),
            bundle: bundle.clone(),
            edge_type: None,
            hovered: None,
            reconnecting: None,
            reported: HashSet::new(),
        }
    }

    fn set_bundle(&mut self, bundle: &Arc<CapabilityBundle>) {
        if !Arc::ptr_eq(&self.bundle.edge_types, &bundle.edge_types) {
            self.edge_type = None;
        }
        self.bundle = bundle.clone();
    }

    fn unmount(mut self) {
        tracing::trace!(id = %self.id, "unmount edge");
        if let Some((edge, pos)) = self.leave() {
            if let Some(on_mouse_leave) = &self.bundle.callbacks.on_mouse_leave {
                on_mouse_leave(&edge, pos);
            }
        }
    }
}

impl EdgeWrapper {
    #[must_use]
    pub const fn id(&self) -> &EdgeId {
        &self.id
    }

    #[must_use]
    pub const fn bundle(&self) -> &Arc<CapabilityBundle> {
        &self.bundle
    }

    #[must_use]
    pub const fn is_hovered(&self) -> bool {
        self.hovered.is_some()
    }

    /// Record the pointer at `pos` on `edge`; returns whether it just entered.
    pub(crate) fn hover(&mut self, edge: &Edge, pos: Pos2) -> bool {
        self.hovered.replace((edge.clone(), pos)).is_none()
    }

    /// Clear the hover state, returning the last hover if there was one.
    pub(crate) fn leave(&mut self) -> Option<(Edge, Pos2)> {
        self.hovered.take()
    }

    #[must_use]
    pub fn reconnecting(&self) -> Option<HandleType> {
        self.reconnecting.map(|(handle, _)| handle)
    }

    pub(crate) fn start_reconnect(&mut self, handle: HandleType, pos: Pos2) {
        self.reconnecting = Some((handle, pos));
    }

    pub(crate) fn drag_reconnect(&mut self, pos: Pos2) {
        if let Some((_, last)) = &mut self.reconnecting {
            *last = pos;
        }
    }

    /// End the drag, returning the handle and where it was last dragged to.
    pub(crate) fn finish_reconnect(&mut self) -> Option<(HandleType, Pos2)> {
        self.reconnecting.take()
    }

    /// Resolve the edge in `state`. Edges whose endpoints are missing are not drawn; that
    /// and unknown edge types are reported through the bundle's error sink, once each.
    pub fn geometry<'a>(&mut self, state: &'a GraphState) -> Option<EdgeGeometry<'a>> {
        let edge = state.edge(&self.id)?;
        let source = self.endpoint(state, edge, &edge.source)?;
        let target = self.endpoint(state, edge, &edge.target)?;
        let edge_type = self.edge_type(&edge.kind)?;
        let path = edge_type.path(
            source.rect().center_bottom(),
            target.rect().center_top(),
        );
        Some(EdgeGeometry { edge, path })
    }

    fn endpoint<'a>(
        &mut self,
        state: &'a GraphState,
        edge: &Edge,
        id: &NodeId,
    ) -> Option<&'a Node> {
        let node = state.node(id);
        if node.is_none() {
            self.report(EdgeError::MissingNode {
                edge: edge.id.to_string(),
                node: id.to_string(),
            });
        }
        node
    }

    fn edge_type(&mut self, kind: &str) -> Option<Arc<dyn EdgeType>> {
        if let Some((name, edge_type)) = &self.edge_type {
            if name == kind {
                return Some(edge_type.clone());
            }
        }
        let edge_type = match self.bundle.edge_types.resolve(kind) {
            Ok(edge_type) => edge_type,
            Err((error, fallback)) => {
                self.report(error);
                fallback?
            }
        };
        self.edge_type = Some((kind.to_owned(), edge_type.clone()));
        Some(edge_type)
    }

    fn report(&mut self, error: EdgeError) {
        if self.reported.insert(error.clone()) {
            error.report(&self.bundle.on_error);
        }
    }
}
