#![warn(clippy::all, rust_2018_idioms)]
pub mod error;
pub mod model;
pub mod selector;
pub mod store;
pub mod viewport;
pub mod visibility;

pub use emath;
