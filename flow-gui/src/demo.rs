use egui::{pos2, vec2};
use flow_core::{
    error::StoreError,
    model::{Edge, EdgeMarker, MarkerKind, Node},
    store::GraphState,
};
use flow_graphics::EdgeRendererProps;

pub const NODE_SIZE: egui::Vec2 = vec2(120.0, 40.0);
const SPACING: egui::Vec2 = vec2(220.0, 140.0);

/// What the demo editor starts with.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub nodes: usize,
    pub columns: usize,
    pub only_render_visible_elements: bool,
    pub elevate_edges_on_select: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            nodes: 24,
            columns: 6,
            only_render_visible_elements: false,
            elevate_edges_on_select: false,
        }
    }
}

impl DemoConfig {
    #[must_use]
    pub fn props(&self) -> EdgeRendererProps {
        EdgeRendererProps {
            only_render_visible_elements: self.only_render_visible_elements,
            elevate_edges_on_select: self.elevate_edges_on_select,
            ..EdgeRendererProps::default()
        }
    }

    /// A grid of nodes, each linked to its right neighbour and to the node below it.
    pub fn graph(&self) -> Result<GraphState, StoreError> {
        let columns = self.columns.max(1);
        let mut state = GraphState::default();
        state.set_nodes((0..self.nodes).map(|i| {
            let (row, column) = (i / columns, i % columns);
            Node::new(
                format!("n{i}"),
                pos2(column as f32 * SPACING.x, row as f32 * SPACING.y),
                NODE_SIZE,
            )
        }))?;

        let mut edges = Vec::new();
        for i in 0..self.nodes {
            if (i + 1) % columns != 0 && i + 1 < self.nodes {
                edges.push(
                    Edge::new(format!("n{i}-n{}", i + 1), format!("n{i}"), format!("n{}", i + 1))
                        .with_kind("step")
                        .with_marker_end(EdgeMarker::new(MarkerKind::Arrow)),
                );
            }
            if i + columns < self.nodes {
                let mut edge = Edge::new(
                    format!("n{i}-n{}", i + columns),
                    format!("n{i}"),
                    format!("n{}", i + columns),
                )
                .with_marker_end(EdgeMarker::new(MarkerKind::ArrowClosed));
                if i % 3 == 0 {
                    edge = edge.with_kind("straight");
                    edge.marker_end = Some(
                        EdgeMarker::new(MarkerKind::ArrowClosed).with_color("#ff0072"),
                    );
                }
                edges.push(edge);
            }
        }
        state.set_edges(edges)?;
        Ok(state)
    }
}
