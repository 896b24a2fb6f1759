#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::Parser;
use flow_core::{store::Store, viewport::Viewport};
use flow_graphics::{EdgeRenderer, EdgeWrapper};
use flow_gui::DemoConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Args {
    /// Print version of the tool
    #[arg(short, long)]
    version: bool,

    /// Number of nodes in the generated graph
    #[arg(long, default_value_t = 24)]
    nodes: usize,

    /// Number of nodes per row
    #[arg(long, default_value_t = 6)]
    columns: usize,

    /// Only render edges with an endpoint in the viewport
    #[arg(long)]
    only_visible: bool,

    /// Paint selected edges above the others
    #[arg(long)]
    elevate: bool,

    /// Write the rendered edges to an SVG file instead of opening a window
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> DemoConfig {
        DemoConfig {
            nodes: self.nodes,
            columns: self.columns,
            only_render_visible_elements: self.only_visible,
            elevate_edges_on_select: self.elevate,
        }
    }
}

fn export(config: &DemoConfig, path: &Path) -> anyhow::Result<()> {
    let mut state = config.graph()?;
    // Headless: the container frames the whole graph at zoom 1.
    let bounds = state
        .nodes()
        .values()
        .map(|node| node.rect())
        .reduce(|a, b| a.union(b));
    if let Some(bounds) = bounds {
        state.set_viewport(Viewport::fitting(bounds, bounds.width()));
        state.resize(bounds.width(), bounds.height());
    }
    let store = Store::new(state);
    let snapshot = store.snapshot();

    let mut renderer: EdgeRenderer<EdgeWrapper> = EdgeRenderer::new(config.props());
    renderer.render(&snapshot);
    std::fs::write(path, renderer.export_svg(&snapshot).to_string())?;
    tracing::info!(path = %path.display(), edges = renderer.visible_ids().len(), "exported");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Log to stdout (if you run with `RUST_LOG=debug`).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.version {
        println!("flow edge renderer: {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = args.config();
    if let Some(path) = &args.export {
        return export(&config, path);
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Flow Edges",
        native_options,
        Box::new(move |cc| Ok(Box::new(flow_gui::App::new(cc, &config)?))),
    )
    .map_err(|err| anyhow!("{}", err))?;

    Ok(())
}
