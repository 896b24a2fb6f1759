use std::sync::Arc;

use derive_more::{Display, From};
use emath::{Pos2, Rect, Vec2};

/// Identifier of an edge, unique within a store.
#[derive(Clone, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(Arc<str>);

/// Identifier of a node, unique within a store.
#[derive(Clone, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Arc<str>);

macro_rules! string_id {
    ($id:ident) => {
        impl $id {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $id {
            fn from(value: &str) -> Self {
                Self(Arc::from(value))
            }
        }

        impl From<String> for $id {
            fn from(value: String) -> Self {
                Self(Arc::from(value))
            }
        }
    };
}

string_id!(EdgeId);
string_id!(NodeId);

pub const DEFAULT_EDGE_TYPE: &str = "default";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionMode {
    #[default]
    Strict,
    Loose,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    #[display("arrow")]
    Arrow,
    #[display("arrowclosed")]
    ArrowClosed,
}

/// Decoration drawn at one end of an edge.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeMarker {
    pub kind: MarkerKind,
    pub color: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub stroke_width: Option<f32>,
    pub orient: Option<String>,
}

impl EdgeMarker {
    #[must_use]
    pub const fn new(kind: MarkerKind) -> Self {
        Self {
            kind,
            color: None,
            width: None,
            height: None,
            stroke_width: None,
            orient: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Tag looked up in the edge type registry.
    pub kind: String,
    pub selected: bool,
    pub z_index: Option<i32>,
    pub selectable: Option<bool>,
    pub focusable: Option<bool>,
    pub updatable: Option<bool>,
    pub marker_start: Option<EdgeMarker>,
    pub marker_end: Option<EdgeMarker>,
}

impl Edge {
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: DEFAULT_EDGE_TYPE.to_owned(),
            selected: false,
            z_index: None,
            selectable: None,
            focusable: None,
            updatable: None,
            marker_start: None,
            marker_end: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_marker_end(mut self, marker: EdgeMarker) -> Self {
        self.marker_end = Some(marker);
        self
    }

    /// Markers referenced by this edge, start first.
    pub fn markers(&self) -> impl Iterator<Item = &EdgeMarker> {
        self.marker_start.iter().chain(self.marker_end.iter())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Absolute position of the top-left corner in graph coordinates.
    pub position: Pos2,
    /// Measured size; zero until the node has been measured.
    pub size: Vec2,
    pub selected: bool,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<NodeId>, position: Pos2, size: Vec2) -> Self {
        Self {
            id: id.into(),
            position,
            size,
            selected: false,
        }
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }
}

/// Which end of an edge a reconnect gesture grabbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleType {
    Source,
    Target,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
}
