use egui::Rect;
use flow_core::{model::HandleType, store::Snapshot};
use itertools::Itertools;
use svg::{
    Document,
    node::element::{Circle, Group, Path, path::Data},
};

use crate::{
    capability::CapabilityBundle,
    marker::MarkerRegistry,
    path::EdgePath,
    renderer::EdgeRenderer,
    unit::{EdgeGeometry, EdgeWrapper},
};

/// Width of the invisible path that makes thin edges easier to hit.
const INTERACTION_WIDTH: f32 = 20.0;
const MARGIN: f32 = 20.0;

impl EdgePath {
    fn to_data(&self) -> Data {
        match self {
            Self::Line([start, end]) => Data::new()
                .move_to((start.x, start.y))
                .line_to((end.x, end.y)),
            Self::Cubic(points) => Data::new()
                .move_to((points[0].x, points[0].y))
                .cubic_curve_to((
                    points[1].x,
                    points[1].y,
                    points[2].x,
                    points[2].y,
                    points[3].x,
                    points[3].y,
                )),
            Self::Polyline(points) => {
                let mut points = points.iter();
                let data = points
                    .next()
                    .map_or_else(Data::new, |first| Data::new().move_to((first.x, first.y)));
                points.fold(data, |data, point| data.line_to((point.x, point.y)))
            }
        }
    }
}

impl EdgeGeometry<'_> {
    fn class_names(&self, bundle: &CapabilityBundle) -> String {
        let edge = self.edge;
        let mut classes = vec![
            "flow__edge".to_owned(),
            format!("flow__edge-{}", edge.kind),
            bundle.no_pan_class_name.clone(),
        ];
        if edge.selected {
            classes.push("selected".to_owned());
        }
        if bundle.is_selectable(edge) {
            classes.push("selectable".to_owned());
        }
        if !bundle.is_selectable(edge) && !bundle.is_updatable(edge) {
            classes.push("inactive".to_owned());
        }
        classes.join(" ")
    }

    fn to_svg(&self, bundle: &CapabilityBundle, markers: &MarkerRegistry) -> Group {
        let edge = self.edge;
        let data = self.path.to_data();

        let mut path = Path::new()
            .set("id", edge.id.as_str())
            .set("class", "flow__edge-path")
            .set("d", data.clone())
            .set("fill", "none");
        if let Some(marker) = &edge.marker_start {
            path = path.set("marker-start", markers.url(marker));
        }
        if let Some(marker) = &edge.marker_end {
            path = path.set("marker-end", markers.url(marker));
        }

        let mut group = Group::new()
            .set("class", self.class_names(bundle))
            .set("data-id", edge.id.as_str())
            .set(
                "aria-label",
                format!("Edge from {} to {}", edge.source, edge.target),
            )
            .add(path)
            .add(
                Path::new()
                    .set("class", "flow__edge-interaction")
                    .set("d", data)
                    .set("fill", "none")
                    .set("stroke-opacity", 0)
                    .set("stroke-width", INTERACTION_WIDTH),
            );
        if bundle.is_focusable(edge) {
            group = group.set("tabindex", 0).set("role", "button");
        }

        if bundle.is_updatable(edge) {
            for (handle, anchor) in [
                (HandleType::Source, self.path.start()),
                (HandleType::Target, self.path.end()),
            ] {
                let side = match handle {
                    HandleType::Source => "source",
                    HandleType::Target => "target",
                };
                group = group.add(
                    Circle::new()
                        .set(
                            "class",
                            format!(
                                "flow__edgeupdater flow__edgeupdater-{side} {}",
                                bundle.no_pan_class_name
                            ),
                        )
                        .set("cx", anchor.x)
                        .set("cy", anchor.y)
                        .set("r", bundle.reconnect_radius)
                        .set("stroke", "transparent")
                        .set("fill", "transparent"),
                );
            }
        }

        group
    }
}

impl EdgeRenderer<EdgeWrapper> {
    /// The edge layer as SVG: the marker definitions, then one group per rendered edge in
    /// paint order.
    pub fn to_svg(&mut self, snapshot: &Snapshot) -> Group {
        self.to_svg_with(snapshot, std::iter::empty::<Group>())
    }

    /// Like [`Self::to_svg`], with `children` appended after the edges, e.g. the line of a
    /// connection in progress.
    pub fn to_svg_with<T>(
        &mut self,
        snapshot: &Snapshot,
        children: impl IntoIterator<Item = T>,
    ) -> Group
    where
        T: Into<Box<dyn svg::Node>>,
    {
        let mut layer = Group::new()
            .set("class", "flow__edges")
            .add(self.markers().to_svg().set("class", "flow__marker"));

        if let Some(bundle) = self.bundle().cloned() {
            for id in self.paint_order(snapshot) {
                let Some(geometry) = self.unit_mut(&id).and_then(|unit| unit.geometry(snapshot))
                else {
                    continue;
                };
                layer = layer.add(geometry.to_svg(&bundle, self.markers()));
            }
        }
        children.into_iter().fold(layer, Group::add)
    }

    /// A standalone document framing every rendered edge.
    pub fn export_svg(&mut self, snapshot: &Snapshot) -> Document {
        let bounds = self
            .paint_order(snapshot)
            .iter()
            .filter_map(|id| {
                let geometry = self.unit_mut(id)?.geometry(snapshot)?;
                Some(geometry.path.bounding_box())
            })
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO)
            .expand(MARGIN);

        Document::new()
            .set(
                "viewBox",
                [bounds.min.x, bounds.min.y, bounds.width(), bounds.height()]
                    .iter()
                    .join(" "),
            )
            .set("width", bounds.width())
            .set("height", bounds.height())
            .add(self.to_svg(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use egui::{pos2, vec2};
    use flow_core::{
        model::{Edge, EdgeMarker, MarkerKind, Node},
        store::{GraphState, Store},
    };

    use super::*;
    use crate::renderer::EdgeRendererProps;

    fn store() -> anyhow::Result<Store> {
        let mut state = GraphState::default();
        state.set_nodes([
            Node::new("a", pos2(0.0, 0.0), vec2(40.0, 20.0)),
            Node::new("b", pos2(0.0, 100.0), vec2(40.0, 20.0)),
        ])?;
        let mut selected = Edge::new("e1", "a", "b")
            .with_kind("straight")
            .with_marker_end(EdgeMarker::new(MarkerKind::ArrowClosed));
        selected.selected = true;
        let mut locked = Edge::new("e2", "b", "a").with_kind("step");
        locked.selectable = Some(false);
        locked.updatable = Some(false);
        state.set_edges([selected, locked])?;
        state.resize(800.0, 600.0);
        Ok(Store::new(state))
    }

    #[test]
    fn edge_groups() -> anyhow::Result<()> {
        let store = store()?;
        let mut renderer: EdgeRenderer<EdgeWrapper> =
            EdgeRenderer::new(EdgeRendererProps::default());
        renderer.render(&store.snapshot());

        let svg = renderer.to_svg(&store.snapshot()).to_string();
        assert!(svg.contains(r#"class="flow__edge flow__edge-straight nopan selected selectable""#));
        assert!(svg.contains(r#"class="flow__edge flow__edge-step nopan inactive""#));
        assert!(svg.contains("marker-end="));
        assert!(svg.contains("#1__type=arrowclosed"));
        assert!(svg.contains(r#"id="1__type=arrowclosed""#));
        assert!(svg.contains(r#"d="M20,20 L20,100""#));
        assert!(svg.contains(r#"class="flow__edgeupdater flow__edgeupdater-target nopan""#));
        assert_eq!(svg.matches("flow__edgeupdater-source").count(), 1);
        assert_eq!(svg.matches(r#"tabindex="0""#).count(), 2);
        Ok(())
    }

    #[test]
    fn nothing_focusable() -> anyhow::Result<()> {
        let mut store = store()?;
        store.update(|state| state.edges_focusable = false);
        let mut renderer: EdgeRenderer<EdgeWrapper> =
            EdgeRenderer::new(EdgeRendererProps::default());
        renderer.render(&store.snapshot());

        let svg = renderer.to_svg(&store.snapshot()).to_string();
        assert!(!svg.contains("tabindex"));
        Ok(())
    }

    #[test]
    fn children_follow_the_edges() -> anyhow::Result<()> {
        let store = store()?;
        let mut renderer: EdgeRenderer<EdgeWrapper> =
            EdgeRenderer::new(EdgeRendererProps::default());
        renderer.render(&store.snapshot());

        let line = Path::new()
            .set("class", "flow__connection-path")
            .set("d", EdgePath::Line([pos2(0.0, 0.0), pos2(50.0, 50.0)]).to_data());
        let svg = renderer.to_svg_with(&store.snapshot(), [line]).to_string();
        let connection = svg.find("flow__connection-path").unwrap();
        assert!(svg.rfind(r#"data-id="e2""#).unwrap() < connection);
        assert!(svg.rfind(r#"data-id="e1""#).unwrap() < connection);

        let mut empty: EdgeRenderer<EdgeWrapper> = EdgeRenderer::new(EdgeRendererProps::default());
        let svg = empty.to_svg_with(&store.snapshot(), [Group::new().set("class", "overlay")]);
        assert!(svg.to_string().contains(r#"class="overlay""#));
        Ok(())
    }

    #[test]
    fn export_frames_all_edges() -> anyhow::Result<()> {
        let store = store()?;
        let mut renderer: EdgeRenderer<EdgeWrapper> =
            EdgeRenderer::new(EdgeRendererProps::default());
        renderer.render(&store.snapshot());

        let document = renderer.export_svg(&store.snapshot()).to_string();
        assert!(document.contains(r#"viewBox="0 -20 40 160""#));
        Ok(())
    }
}
