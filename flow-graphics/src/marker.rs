use egui::{Pos2, Vec2, vec2};
use flow_core::{
    model::{EdgeMarker, MarkerKind},
    selector::Memo,
    store::GraphState,
};
use itertools::Itertools;
use svg::node::element::{Definitions, Marker, Polyline};

pub const DEFAULT_MARKER_SIZE: f32 = 12.5;
const VIEW_BOX_SIZE: f32 = 20.0;

// Symbol outlines in the marker's -10..10 view box, tip at the origin.
const ARROW: &[(f32, f32)] = &[(-5.0, -4.0), (0.0, 0.0), (-5.0, 4.0)];
const ARROW_CLOSED: &[(f32, f32)] = &[(-5.0, -4.0), (0.0, 0.0), (-5.0, 4.0), (-5.0, -4.0)];

/// Document-wide id of a marker, namespaced by the renderer instance.
///
/// Only the fields that are set take part, in alphabetical order, so equal markers on
/// different edges share one definition.
#[must_use]
pub fn marker_id(marker: &EdgeMarker, renderer_id: &str) -> String {
    let mut fields = Vec::new();
    if let Some(color) = &marker.color {
        fields.push(format!("color={color}"));
    }
    if let Some(height) = marker.height {
        fields.push(format!("height={height}"));
    }
    if let Some(orient) = &marker.orient {
        fields.push(format!("orient={orient}"));
    }
    if let Some(stroke_width) = marker.stroke_width {
        fields.push(format!("strokeWidth={stroke_width}"));
    }
    fields.push(format!("type={}", marker.kind));
    if let Some(width) = marker.width {
        fields.push(format!("width={width}"));
    }

    let key = fields.join("&");
    if renderer_id.is_empty() {
        key
    } else {
        format!("{renderer_id}__{key}")
    }
}

/// A marker as it is emitted: every field resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDefinition {
    pub id: String,
    pub kind: MarkerKind,
    pub color: String,
    pub width: f32,
    pub height: f32,
    pub stroke_width: f32,
    pub orient: String,
}

impl MarkerDefinition {
    fn new(id: String, marker: &EdgeMarker, default_color: &str) -> Self {
        Self {
            id,
            kind: marker.kind,
            color: marker
                .color
                .clone()
                .unwrap_or_else(|| default_color.to_owned()),
            width: marker.width.unwrap_or(DEFAULT_MARKER_SIZE),
            height: marker.height.unwrap_or(DEFAULT_MARKER_SIZE),
            stroke_width: marker.stroke_width.unwrap_or(1.0),
            orient: marker
                .orient
                .clone()
                .unwrap_or_else(|| "auto-start-reverse".to_owned()),
        }
    }

    fn symbol_points(&self) -> &'static [(f32, f32)] {
        match self.kind {
            MarkerKind::Arrow => ARROW,
            MarkerKind::ArrowClosed => ARROW_CLOSED,
        }
    }

    /// Outline of the symbol with its tip at `tip`, pointing along `direction`, for an edge
    /// drawn with stroke width `edge_stroke_width`.
    #[must_use]
    pub fn outline(&self, tip: Pos2, direction: Vec2, edge_stroke_width: f32) -> Vec<Pos2> {
        let scale = vec2(
            self.width / VIEW_BOX_SIZE * edge_stroke_width,
            self.height / VIEW_BOX_SIZE * edge_stroke_width,
        );
        let normal = vec2(-direction.y, direction.x);
        self.symbol_points()
            .iter()
            .map(|&(x, y)| tip + direction * (x * scale.x) + normal * (y * scale.y))
            .collect()
    }

    #[must_use]
    pub fn to_svg(&self) -> Marker {
        let points = self
            .symbol_points()
            .iter()
            .map(|(x, y)| format!("{x},{y}"))
            .join(" ");
        let fill = match self.kind {
            MarkerKind::Arrow => "none",
            MarkerKind::ArrowClosed => self.color.as_str(),
        };
        Marker::new()
            .set("id", self.id.as_str())
            .set("class", "flow__arrowhead")
            .set("markerWidth", self.width)
            .set("markerHeight", self.height)
            .set("viewBox", "-10 -10 20 20")
            .set("markerUnits", "strokeWidth")
            .set("orient", self.orient.as_str())
            .set("refX", 0)
            .set("refY", 0)
            .add(
                Polyline::new()
                    .set("points", points)
                    .set("stroke", self.color.as_str())
                    .set("stroke-width", self.stroke_width)
                    .set("stroke-linecap", "round")
                    .set("stroke-linejoin", "round")
                    .set("fill", fill),
            )
    }
}

/// The marker definitions shared by the edges of one renderer instance.
#[derive(Clone, Debug)]
pub struct MarkerRegistry {
    renderer_id: String,
    default_color: String,
    definitions: Memo<Vec<MarkerDefinition>>,
}

impl MarkerRegistry {
    #[must_use]
    pub fn new(renderer_id: impl Into<String>, default_color: impl Into<String>) -> Self {
        Self {
            renderer_id: renderer_id.into(),
            default_color: default_color.into(),
            definitions: Memo::default(),
        }
    }

    #[must_use]
    pub fn renderer_id(&self) -> &str {
        &self.renderer_id
    }

    #[must_use]
    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    /// Collect the markers the edges of `state` refer to. Returns whether the set of
    /// definitions changed since the last call.
    pub fn sync(&mut self, state: &GraphState) -> bool {
        let definitions = state
            .edges()
            .values()
            .flat_map(|edge| edge.markers())
            .map(|marker| (marker_id(marker, &self.renderer_id), marker))
            .unique_by(|(id, _)| id.clone())
            .map(|(id, marker)| MarkerDefinition::new(id, marker, &self.default_color))
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .collect_vec();
        let changed = self.definitions.update(definitions);
        if changed {
            tracing::debug!(
                renderer_id = %self.renderer_id,
                count = self.definitions().len(),
                "marker definitions changed"
            );
        }
        changed
    }

    #[must_use]
    pub fn definitions(&self) -> &[MarkerDefinition] {
        self.definitions.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Definition an edge's marker resolves to, if it has been synced.
    #[must_use]
    pub fn get(&self, marker: &EdgeMarker) -> Option<&MarkerDefinition> {
        let id = marker_id(marker, &self.renderer_id);
        let definitions = self.definitions();
        definitions
            .binary_search_by(|definition| definition.id.cmp(&id))
            .ok()
            .map(|index| &definitions[index])
    }

    /// Value for a `marker-start` / `marker-end` attribute.
    #[must_use]
    pub fn url(&self, marker: &EdgeMarker) -> String {
        format!("url('#{}')", marker_id(marker, &self.renderer_id))
    }

    #[must_use]
    pub fn to_svg(&self) -> Definitions {
        self.definitions()
            .iter()
            .fold(Definitions::new(), |defs, definition| {
                defs.add(definition.to_svg())
            })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use flow_core::model::Edge;
    use insta::assert_debug_snapshot;
    use rstest::rstest;

    use super::*;

    fn state() -> Result<GraphState> {
        let mut state = GraphState::default();
        state.set_edges([
            Edge::new("e1", "a", "b").with_marker_end(EdgeMarker::new(MarkerKind::ArrowClosed)),
            Edge::new("e2", "b", "c").with_marker_end(EdgeMarker::new(MarkerKind::ArrowClosed)),
            Edge::new("e3", "c", "a")
                .with_marker_end(EdgeMarker::new(MarkerKind::Arrow).with_color("#ff0072")),
            Edge::new("e4", "a", "c"),
        ])?;
        Ok(state)
    }

    #[rstest]
    #[case(EdgeMarker::new(MarkerKind::Arrow), "1", "1__type=arrow")]
    #[case(EdgeMarker::new(MarkerKind::ArrowClosed).with_color("red"), "1", "1__color=red&type=arrowclosed")]
    #[case(EdgeMarker { width: Some(20.0), stroke_width: Some(2.5), ..EdgeMarker::new(MarkerKind::Arrow) }, "flow-a", "flow-a__strokeWidth=2.5&type=arrow&width=20")]
    #[case(EdgeMarker::new(MarkerKind::Arrow), "", "type=arrow")]
    fn marker_ids(#[case] marker: EdgeMarker, #[case] renderer_id: &str, #[case] expected: &str) {
        assert_eq!(marker_id(&marker, renderer_id), expected);
    }

    #[test]
    fn definitions_are_unique_and_sorted() -> Result<()> {
        let state = state()?;
        let mut registry = MarkerRegistry::new("1", "#b1b1b7");
        assert!(registry.sync(&state));
        assert!(!registry.sync(&state));

        let summary = registry
            .definitions()
            .iter()
            .map(|definition| format!("{} {}", definition.id, definition.color))
            .collect_vec();
        assert_debug_snapshot!(summary, @r###"
        [
            "1__color=#ff0072&type=arrow #ff0072",
            "1__type=arrowclosed #b1b1b7",
        ]
        "###);

        let closed = EdgeMarker::new(MarkerKind::ArrowClosed);
        assert_eq!(registry.get(&closed).map(|d| d.width), Some(DEFAULT_MARKER_SIZE));
        assert_eq!(registry.url(&closed), "url('#1__type=arrowclosed')");
        assert!(registry.get(&EdgeMarker::new(MarkerKind::Arrow)).is_none());
        Ok(())
    }

    #[test]
    fn renderer_instances_do_not_collide() -> Result<()> {
        let state = state()?;
        let mut a = MarkerRegistry::new("a", "#b1b1b7");
        let mut b = MarkerRegistry::new("b", "#b1b1b7");
        a.sync(&state);
        b.sync(&state);

        assert_eq!(a.definitions().len(), b.definitions().len());
        for (x, y) in a.definitions().iter().zip(b.definitions()) {
            assert_ne!(x.id, y.id);
            assert_eq!(x.color, y.color);
        }

        let a_svg = a.to_svg().to_string();
        let b_svg = b.to_svg().to_string();
        assert!(a_svg.contains("id=\"a__type=arrowclosed\""));
        assert!(b_svg.contains("id=\"b__type=arrowclosed\""));
        assert!(!a_svg.contains("b__"));
        Ok(())
    }

    #[test]
    fn removing_the_last_reference_drops_the_definition() -> Result<()> {
        let mut state = state()?;
        let mut registry = MarkerRegistry::new("1", "#b1b1b7");
        registry.sync(&state);

        state.remove_edge(&"e3".into());
        assert!(registry.sync(&state));
        assert_eq!(registry.definitions().len(), 1);
        Ok(())
    }

    #[test]
    fn outline_points_along_direction() {
        let definition = MarkerDefinition::new(
            "x".to_owned(),
            &EdgeMarker {
                width: Some(20.0),
                height: Some(20.0),
                ..EdgeMarker::new(MarkerKind::Arrow)
            },
            "#000000",
        );
        let outline = definition.outline(Pos2::new(10.0, 10.0), vec2(0.0, 1.0), 1.0);
        assert_eq!(
            outline,
            vec![Pos2::new(14.0, 5.0), Pos2::new(10.0, 10.0), Pos2::new(6.0, 5.0)]
        );
    }
}
