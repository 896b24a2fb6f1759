//! Which edges have to be drawn, and in which order.

use std::collections::BTreeMap;

use emath::Rect;
use itertools::Itertools;

use crate::{
    model::{Edge, EdgeId, NodeId},
    store::GraphState,
};

/// Z offset added to selected edges when edges are elevated on selection.
pub const SELECTED_EDGE_ELEVATION: i32 = 1000;

/// Ids of the edges to render, in store order.
///
/// Without culling this is every edge. With culling an edge is kept iff the bounding box of
/// at least one of its endpoint nodes touches the visible rectangle (boundary included).
/// This is a per-edge constant-time approximation: a curve may leave the viewport between
/// two kept endpoints, and a long edge crossing the viewport with both ends outside it is
/// dropped.
#[must_use]
pub fn visible_edge_ids(state: &GraphState, only_render_visible_elements: bool) -> Vec<EdgeId> {
    if !only_render_visible_elements {
        return state.edges().keys().cloned().collect();
    }

    if state.width <= 0.0 || state.height <= 0.0 {
        return Vec::new();
    }

    let visible = state.visible_rect();
    state
        .edges()
        .values()
        .filter(|edge| is_edge_visible(state, edge, visible))
        .map(|edge| edge.id.clone())
        .collect()
}

fn is_edge_visible(state: &GraphState, edge: &Edge, visible: Rect) -> bool {
    let touches = |id: &NodeId| {
        state
            .node(id)
            .is_some_and(|node| overlaps(node.rect(), visible))
    };
    touches(&edge.source) || touches(&edge.target)
}

/// Axis-aligned overlap test that counts shared borders as overlapping.
fn overlaps(a: Rect, b: Rect) -> bool {
    a.min.x <= b.max.x && b.min.x <= a.max.x && a.min.y <= b.max.y && b.min.y <= a.max.y
}

/// The z level an edge is painted at.
#[must_use]
pub fn z_level(state: &GraphState, edge: &Edge, elevate_on_select: bool) -> i32 {
    let base = edge.z_index.unwrap_or(0);
    if !elevate_on_select {
        return base;
    }

    let endpoint_selected =
        |id: &NodeId| state.node(id).is_some_and(|node| node.selected);
    if edge.selected || endpoint_selected(&edge.source) || endpoint_selected(&edge.target) {
        base + SELECTED_EDGE_ELEVATION
    } else {
        base
    }
}

/// Group `ids` by z level, lowest level first, keeping the given order inside a level.
/// Ids that are not in the store are dropped.
#[must_use]
pub fn group_edges_by_z_level<'a>(
    state: &GraphState,
    ids: impl IntoIterator<Item = &'a EdgeId>,
    elevate_on_select: bool,
) -> Vec<(i32, Vec<EdgeId>)> {
    let mut levels: BTreeMap<i32, Vec<EdgeId>> = BTreeMap::new();
    for edge in ids.into_iter().filter_map(|id| state.edge(id)) {
        levels
            .entry(z_level(state, edge, elevate_on_select))
            .or_default()
            .push(edge.id.clone());
    }
    levels.into_iter().collect_vec()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use anyhow::Result;
    use emath::{pos2, vec2};
    use insta::assert_debug_snapshot;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{model::Node, viewport::Viewport};

    fn ids(ids: &[EdgeId]) -> Vec<&str> {
        ids.iter().map(EdgeId::as_str).collect()
    }

    /// n1, n2 near the origin; n3, n4 far to the right.
    #[fixture]
    fn state() -> GraphState {
        let mut state = GraphState::default();
        state
            .set_nodes([
                Node::new("n1", pos2(0.0, 0.0), vec2(50.0, 20.0)),
                Node::new("n2", pos2(100.0, 100.0), vec2(50.0, 20.0)),
                Node::new("n3", pos2(2000.0, 0.0), vec2(50.0, 20.0)),
                Node::new("n4", pos2(2100.0, 100.0), vec2(50.0, 20.0)),
            ])
            .unwrap();
        state
            .set_edges([Edge::new("e1", "n1", "n2"), Edge::new("e2", "n3", "n4")])
            .unwrap();
        state.resize(800.0, 600.0);
        state
    }

    #[rstest]
    #[case(Viewport::default())]
    #[case(Viewport { x: -5000.0, y: -5000.0, zoom: 1.0 })]
    #[case(Viewport { x: 0.0, y: 0.0, zoom: 100.0 })]
    fn without_culling_every_edge_is_rendered(state: GraphState, #[case] viewport: Viewport) {
        let mut state = state;
        state.set_viewport(viewport);
        assert_eq!(ids(&visible_edge_ids(&state, false)), vec!["e1", "e2"]);
    }

    #[rstest]
    fn culling_drops_edges_outside_the_viewport(state: GraphState) {
        assert_debug_snapshot!(ids(&visible_edge_ids(&state, true)), @r###"
        [
            "e1",
        ]
        "###);
    }

    #[rstest]
    #[case(Viewport { x: -1900.0, y: 0.0, zoom: 1.0 }, vec!["e2"])]
    #[case(Viewport { x: -150.0, y: -120.0, zoom: 1.0 }, vec!["e1"])]
    #[case(Viewport { x: -151.0, y: -121.0, zoom: 1.0 }, vec![])]
    #[case(Viewport { x: 0.0, y: 0.0, zoom: 0.25 }, vec!["e1", "e2"])]
    fn culling_follows_the_viewport(
        state: GraphState,
        #[case] viewport: Viewport,
        #[case] expected: Vec<&str>,
    ) {
        let mut state = state;
        state.set_viewport(viewport);
        assert_eq!(ids(&visible_edge_ids(&state, true)), expected);
    }

    #[rstest]
    fn one_endpoint_inside_is_enough(state: GraphState) -> Result<()> {
        let mut state = state;
        state.add_edge(Edge::new("e3", "n3", "n1"))?;
        assert_eq!(ids(&visible_edge_ids(&state, true)), vec!["e1", "e3"]);
        Ok(())
    }

    #[rstest]
    fn missing_endpoints(state: GraphState) -> Result<()> {
        let mut state = state;
        state.add_edge(Edge::new("dangling", "n1", "gone"))?;
        state.add_edge(Edge::new("orphan", "gone", "also-gone"))?;

        assert_eq!(ids(&visible_edge_ids(&state, true)), vec!["e1", "dangling"]);
        assert_eq!(
            ids(&visible_edge_ids(&state, false)),
            vec!["e1", "e2", "dangling", "orphan"]
        );
        Ok(())
    }

    #[rstest]
    fn empty_container_shows_nothing(state: GraphState) {
        let mut state = state;
        state.resize(0.0, 600.0);
        assert!(visible_edge_ids(&state, true).is_empty());
        assert_eq!(visible_edge_ids(&state, false).len(), 2);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn visible_ids_are_a_duplicate_free_subset(
        state: GraphState,
        #[case] only_render_visible_elements: bool,
    ) -> Result<()> {
        let mut state = state;
        for i in 0..20 {
            let x = (i * 150) as f32;
            state.add_node(Node::new(format!("m{i}"), pos2(x, x / 2.0), vec2(40.0, 40.0)))?;
        }
        for i in 0..19 {
            state.add_edge(Edge::new(format!("f{i}"), format!("m{i}"), format!("m{}", i + 1)))?;
        }
        state.set_viewport(Viewport { x: -300.0, y: -100.0, zoom: 0.8 });

        let visible = visible_edge_ids(&state, only_render_visible_elements);
        let unique: HashSet<_> = visible.iter().collect();
        assert_eq!(unique.len(), visible.len());
        assert!(visible.iter().all(|id| state.edge(id).is_some()));

        let order: Vec<_> = state.edges().keys().filter(|id| unique.contains(id)).collect();
        assert_eq!(order, visible.iter().collect_vec());
        Ok(())
    }

    #[rstest]
    fn z_levels(state: GraphState) -> Result<()> {
        let mut state = state;
        state.add_edge(Edge::new("e3", "n1", "n4"))?;
        state.update_edge(&"e1".into(), |edge| edge.selected = true)?;
        state.update_edge(&"e2".into(), |edge| edge.z_index = Some(5))?;
        let all = visible_edge_ids(&state, false);

        let flat = |levels: Vec<(i32, Vec<EdgeId>)>| {
            levels
                .into_iter()
                .map(|(z, ids)| (z, ids.iter().map(ToString::to_string).collect_vec()))
                .collect_vec()
        };

        assert_eq!(
            flat(group_edges_by_z_level(&state, &all, false)),
            vec![(0, vec!["e1".to_owned(), "e3".to_owned()]), (5, vec!["e2".to_owned()])]
        );
        assert_eq!(
            flat(group_edges_by_z_level(&state, &all, true)),
            vec![
                (0, vec!["e3".to_owned()]),
                (5, vec!["e2".to_owned()]),
                (1000, vec!["e1".to_owned()])
            ]
        );
        Ok(())
    }

    #[rstest]
    fn selected_endpoint_elevates(state: GraphState) -> Result<()> {
        let mut state = state;
        let mut n4 = state.node(&"n4".into()).cloned().unwrap();
        n4.selected = true;
        state.remove_node(&"n4".into());
        state.add_node(n4)?;

        let e2 = state.edge(&"e2".into()).unwrap();
        assert_eq!(z_level(&state, e2, true), SELECTED_EDGE_ELEVATION);
        assert_eq!(z_level(&state, e2, false), 0);
        Ok(())
    }
}
