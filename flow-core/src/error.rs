use std::{fmt, sync::Arc};

use derive_more::Display;
use thiserror::Error;

use crate::model::{EdgeId, NodeId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Edge {0} already exists")]
    DuplicateEdge(EdgeId),

    #[error("Node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("Unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
}

/// Codes reported through the [`ErrorSink`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// An edge refers to a node that is not in the store.
    #[display("008")]
    MissingEdgeEndpoint,
    /// An edge refers to an edge type that is not registered.
    #[display("011")]
    EdgeTypeNotFound,
}

type Report = dyn Fn(ErrorCode, &str);

/// The single error-reporting channel threaded from the store into every rendered edge.
///
/// Two sinks are equal iff they are the same handler, so a slice holding a sink stays equal
/// across snapshots as long as nobody replaces the handler.
#[derive(Clone)]
pub struct ErrorSink(Arc<Report>);

impl ErrorSink {
    pub fn new(report: impl Fn(ErrorCode, &str) + 'static) -> Self {
        Self(Arc::new(report))
    }

    pub fn report(&self, code: ErrorCode, message: &str) {
        (self.0)(code, message);
    }
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new(|code, message| {
            tracing::warn!("[{code}] {message}");
        })
    }
}

impl PartialEq for ErrorSink {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ErrorSink {}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorSink")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}
