use std::{fmt, sync::Arc};

use egui::{Pos2, pos2};
use flow_core::{
    error::{ErrorCode, ErrorSink},
    model::DEFAULT_EDGE_TYPE,
};
use indexmap::IndexMap;
use thiserror::Error;

use crate::path::EdgePath;

/// A kind of edge the renderer knows how to draw.
pub trait EdgeType {
    /// Path from the source anchor (bottom of the source node) to the target anchor (top of
    /// the target node).
    fn path(&self, source: Pos2, target: Pos2) -> EdgePath;
}

pub struct Bezier {
    pub curvature: f32,
}

impl Default for Bezier {
    fn default() -> Self {
        Self { curvature: 0.25 }
    }
}

impl EdgeType for Bezier {
    fn path(&self, source: Pos2, target: Pos2) -> EdgePath {
        let dy = target.y - source.y;
        // Backwards edges still leave downwards and arrive from above.
        let offset = if dy >= 0.0 {
            0.5 * dy
        } else {
            self.curvature * 25.0 * (-dy).sqrt()
        };
        EdgePath::Cubic([
            source,
            pos2(source.x, source.y + offset),
            pos2(target.x, target.y - offset),
            target,
        ])
    }
}

pub struct Straight;

impl EdgeType for Straight {
    fn path(&self, source: Pos2, target: Pos2) -> EdgePath {
        EdgePath::Line([source, target])
    }
}

/// Orthogonal path with one horizontal run halfway between the endpoints.
pub struct Step;

impl EdgeType for Step {
    fn path(&self, source: Pos2, target: Pos2) -> EdgePath {
        let mid_y = (source.y + target.y) / 2.0;
        EdgePath::Polyline(vec![
            source,
            pos2(source.x, mid_y),
            pos2(target.x, mid_y),
            target,
        ])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum EdgeError {
    #[error("Edge type \"{0}\" not found. Using fallback type \"default\".")]
    TypeNotFound(String),

    #[error("Couldn't create edge \"{edge}\": node \"{node}\" not found.")]
    MissingNode { edge: String, node: String },
}

impl EdgeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TypeNotFound(_) => ErrorCode::EdgeTypeNotFound,
            Self::MissingNode { .. } => ErrorCode::MissingEdgeEndpoint,
        }
    }

    pub fn report(&self, sink: &ErrorSink) {
        sink.report(self.code(), &self.to_string());
    }
}

/// Lookup table from edge type tags to their implementations.
#[derive(Clone)]
pub struct EdgeTypeRegistry {
    types: IndexMap<String, Arc<dyn EdgeType>>,
}

impl Default for EdgeTypeRegistry {
    fn default() -> Self {
        Self::new()
            .with(DEFAULT_EDGE_TYPE, Bezier::default())
            .with("straight", Straight)
            .with("step", Step)
    }
}

impl fmt::Debug for EdgeTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.types.keys()).finish()
    }
}

impl EdgeTypeRegistry {
    /// An empty registry. [`EdgeTypeRegistry::default`] comes with the built-in types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, edge_type: impl EdgeType + 'static) -> Self {
        self.register(name, edge_type);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, edge_type: impl EdgeType + 'static) {
        self.types.insert(name.into(), Arc::new(edge_type));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn EdgeType>> {
        self.types.get(name)
    }

    /// Look up `name`, falling back to the default type. The error tells the caller that a
    /// fallback happened; it still comes with a usable type unless the registry has no
    /// default at all.
    #[allow(clippy::type_complexity)]
    pub fn resolve(
        &self,
        name: &str,
    ) -> Result<Arc<dyn EdgeType>, (EdgeError, Option<Arc<dyn EdgeType>>)> {
        match self.types.get(name) {
            Some(edge_type) => Ok(edge_type.clone()),
            None => Err((
                EdgeError::TypeNotFound(name.to_owned()),
                self.types.get(DEFAULT_EDGE_TYPE).cloned(),
            )),
        }
    }
}
