#![warn(clippy::all, rust_2018_idioms)]

pub mod capability;
pub mod edge_type;
pub mod marker;
pub mod paint;
pub mod path;
pub mod renderer;
pub mod svg;
pub mod unit;

pub use renderer::{EdgeRenderer, EdgeRendererProps, EdgeUnit, RenderOutcome};
pub use unit::EdgeWrapper;
