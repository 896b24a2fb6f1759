#![warn(clippy::all, rust_2018_idioms)]
mod app;
pub mod demo;

pub use app::App;
pub use demo::DemoConfig;
