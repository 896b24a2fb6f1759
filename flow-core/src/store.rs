use std::{ops::Deref, sync::Arc};

use derivative::Derivative;
use emath::{Pos2, Rect, Vec2, vec2};
use indexmap::IndexMap;

use crate::{
    error::{ErrorSink, StoreError},
    model::{ConnectionMode, Edge, EdgeId, Node, NodeId},
    viewport::Viewport,
};

/// Everything the editor shares between its components.
///
/// Collections sit behind [`Arc`]s so that committing a change to one field does not copy the
/// others: a snapshot taken before the commit keeps sharing whatever the commit left alone.
#[derive(Clone, Debug, Derivative)]
#[derivative(Default)]
pub struct GraphState {
    edges: Arc<IndexMap<EdgeId, Edge>>,
    nodes: Arc<IndexMap<NodeId, Node>>,
    pub viewport: Viewport,
    pub width: f32,
    pub height: f32,
    #[derivative(Default(value = "true"))]
    pub edges_focusable: bool,
    #[derivative(Default(value = "true"))]
    pub edges_updatable: bool,
    #[derivative(Default(value = "true"))]
    pub elements_selectable: bool,
    pub connection_mode: ConnectionMode,
    pub on_error: ErrorSink,
    #[derivative(Default(value = "true"))]
    pub nodes_draggable: bool,
    #[derivative(Default(value = "true"))]
    pub pan_on_drag: bool,
    pub user_selection_active: bool,
}

/// Requests sent upward by rendered edges instead of mutating state themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SelectEdges { ids: Vec<EdgeId>, additive: bool },
    UnselectAll,
}

impl GraphState {
    #[must_use]
    pub fn edges(&self) -> &IndexMap<EdgeId, Edge> {
        &self.edges
    }

    #[must_use]
    pub fn nodes(&self) -> &IndexMap<NodeId, Node> {
        &self.nodes
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    /// The part of the graph currently shown, in graph coordinates.
    #[must_use]
    pub fn visible_rect(&self) -> Rect {
        self.viewport.visible_rect(self.size())
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), StoreError> {
        if self.edges.contains_key(&edge.id) {
            return Err(StoreError::DuplicateEdge(edge.id));
        }
        Arc::make_mut(&mut self.edges).insert(edge.id.clone(), edge);
        Ok(())
    }

    /// Replace every edge. Fails without touching the current edges if two share an id.
    pub fn set_edges(&mut self, edges: impl IntoIterator<Item = Edge>) -> Result<(), StoreError> {
        let mut map = IndexMap::new();
        for edge in edges {
            if map.contains_key(&edge.id) {
                return Err(StoreError::DuplicateEdge(edge.id));
            }
            map.insert(edge.id.clone(), edge);
        }
        self.edges = Arc::new(map);
        Ok(())
    }

    /// Remove an edge, keeping the order of the remaining ones.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        if !self.edges.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.edges).shift_remove(id)
    }

    pub fn update_edge(
        &mut self,
        id: &EdgeId,
        f: impl FnOnce(&mut Edge),
    ) -> Result<(), StoreError> {
        let edge = Arc::make_mut(&mut self.edges)
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownEdge(id.clone()))?;
        f(edge);
        Ok(())
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.nodes.contains_key(&node.id) {
            return Err(StoreError::DuplicateNode(node.id));
        }
        Arc::make_mut(&mut self.nodes).insert(node.id.clone(), node);
        Ok(())
    }

    pub fn set_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> Result<(), StoreError> {
        let mut map = IndexMap::new();
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(StoreError::DuplicateNode(node.id));
            }
            map.insert(node.id.clone(), node);
        }
        self.nodes = Arc::new(map);
        Ok(())
    }

    /// Remove a node. Edges pointing at it stay; they are dropped by culling and reported
    /// by the edge that fails to find its endpoint.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut self.nodes).shift_remove(id)
    }

    pub fn set_node_position(&mut self, id: &NodeId, position: Pos2) -> Result<(), StoreError> {
        let node = Arc::make_mut(&mut self.nodes)
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownNode(id.clone()))?;
        node.position = position;
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Select the given edges. Unless `additive`, every other edge is unselected.
    pub fn select_edges<'a>(&mut self, ids: impl IntoIterator<Item = &'a EdgeId>, additive: bool) {
        let ids: Vec<&EdgeId> = ids.into_iter().collect();
        let needs_change = self.edges.iter().any(|(id, edge)| {
            let wanted = ids.contains(&id) || (additive && edge.selected);
            edge.selected != wanted
        });
        if !needs_change {
            return;
        }
        for (id, edge) in Arc::make_mut(&mut self.edges).iter_mut() {
            edge.selected = ids.contains(&id) || (additive && edge.selected);
        }
    }

    pub fn unselect_all(&mut self) {
        if self.edges.values().any(|edge| edge.selected) {
            for edge in Arc::make_mut(&mut self.edges).values_mut() {
                edge.selected = false;
            }
        }
        if self.nodes.values().any(|node| node.selected) {
            for node in Arc::make_mut(&mut self.nodes).values_mut() {
                node.selected = false;
            }
        }
    }

    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::SelectEdges { ids, additive } => self.select_edges(ids, *additive),
            Action::UnselectAll => self.unselect_all(),
        }
    }
}

/// One committed version of the store.
#[derive(Clone, Debug)]
pub struct Snapshot {
    version: u64,
    state: Arc<GraphState>,
}

impl Snapshot {
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn state(&self) -> &Arc<GraphState> {
        &self.state
    }

    /// Whether both are the same commit of the same store. Versions alone are only unique
    /// within one store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.version == other.version && Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Deref for Snapshot {
    type Target = GraphState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Snapshot)>;

/// Holds the current snapshot and notifies listeners after each commit.
pub struct Store {
    current: Snapshot,
    listeners: IndexMap<ListenerId, Listener>,
    next_listener: u64,
    batch_depth: usize,
    dirty: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(GraphState::default())
    }
}

impl Store {
    #[must_use]
    pub fn new(state: GraphState) -> Self {
        Self {
            current: Snapshot {
                version: 0,
                state: Arc::new(state),
            },
            listeners: IndexMap::new(),
            next_listener: 0,
            batch_depth: 0,
            dirty: false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.current.version
    }

    /// Apply `f` to a copy of the state and commit the result as a new snapshot.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut GraphState) -> R) -> R {
        let mut next = GraphState::clone(&self.current.state);
        let result = f(&mut next);
        self.commit(next);
        result
    }

    /// Like [`Store::update`], but only commits if `f` succeeds.
    pub fn try_update<R, E>(
        &mut self,
        f: impl FnOnce(&mut GraphState) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut next = GraphState::clone(&self.current.state);
        let result = f(&mut next)?;
        self.commit(next);
        Ok(result)
    }

    /// Run `f`, notifying listeners at most once at the end with the latest snapshot.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.dirty {
            self.notify();
        }
        result
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.shift_remove(&id).is_some()
    }

    fn commit(&mut self, state: GraphState) {
        self.current = Snapshot {
            version: self.current.version + 1,
            state: Arc::new(state),
        };
        tracing::trace!(version = self.current.version, "commit");
        self.dirty = true;
        if self.batch_depth == 0 {
            self.notify();
        }
    }

    fn notify(&mut self) {
        self.dirty = false;
        let snapshot = self.current.clone();
        for listener in self.listeners.values_mut() {
            listener(&snapshot);
        }
    }
}
