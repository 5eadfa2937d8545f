//! Drawing properties of the edit engine: marker parity, buffer head,
//! de-duplicated joins, tail truncation, finishing and the fallback path.

mod fixtures;

use proptest::prelude::*;

use route_sketch::buffer::{RouteKind, RouteState};
use route_sketch::editor::{EditWarning, EditorConfig, RouteEditor};
use route_sketch::error::EditError;
use route_sketch::geo::GeoPoint;
use route_sketch::surface::MemorySurface;
use route_sketch::traits::LayerKind;

use fixtures::{failing_router, fixed_router, varying_router, BARA, BREE_STREET, SOWETO_CLICKS};

fn soweto_route() -> RouteEditor {
    RouteEditor::new(
        "Soweto",
        RouteKind::Straight {
            origin: BREE_STREET.point(),
            destination: BARA.point(),
        },
        EditorConfig::default(),
    )
}

fn loop_route() -> RouteEditor {
    RouteEditor::new("Loop", RouteKind::Loop, EditorConfig::default())
}

fn clicks() -> Vec<GeoPoint> {
    SOWETO_CLICKS.iter().copied().map(GeoPoint::from).collect()
}

fn assert_no_duplicate_joins(editor: &RouteEditor) {
    let points = editor.dense().points();
    for anchor in editor.anchors() {
        let index = anchor.buffer_index();
        if index > 0 {
            assert_ne!(points[index - 1], points[index], "join at {} duplicated", index);
        }
        if index + 1 < points.len() {
            assert_ne!(points[index + 1], points[index], "join at {} duplicated", index);
        }
    }
}

#[test]
fn straight_route_draws_through_clicks() {
    let mut surface = MemorySurface::new();
    let router = fixed_router(3);
    let mut editor = soweto_route();
    editor.start(&mut surface).unwrap();

    for click in clicks() {
        editor.append(click, &router, &mut surface).unwrap();
        assert_eq!(editor.anchors().len(), surface.markers_for("Soweto").len());
        assert_eq!(editor.dense().first(), Some(&BREE_STREET.point()));
        assert_no_duplicate_joins(&editor);
    }

    // origin + 4 clicks, four segments of 3 interior samples each
    assert_eq!(editor.anchors().len(), 5);
    assert_eq!(editor.dense().len(), 1 + 4 * 4);
    let indices: Vec<_> = editor.anchors().iter().map(|a| a.buffer_index()).collect();
    assert_eq!(indices, vec![0, 4, 8, 12, 16]);
    for anchor in editor.anchors() {
        assert_eq!(editor.dense().points()[anchor.buffer_index()], anchor.position());
    }

    let line = surface.line("Soweto", LayerKind::Committed).unwrap();
    assert_eq!(line.points, editor.dense().points());
}

#[test]
fn anchor_order_indices_increase() {
    let mut surface = MemorySurface::new();
    let router = varying_router();
    let mut editor = soweto_route();
    editor.start(&mut surface).unwrap();
    for click in clicks() {
        editor.append(click, &router, &mut surface).unwrap();
    }
    let ids: Vec<_> = editor.anchors().iter().map(|a| a.id().0).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let third = editor.anchors()[3].id();
    editor.remove_from(third, &mut surface).unwrap();
    editor.append(GeoPoint::new(27.97, -26.245), &router, &mut surface).unwrap();
    assert_eq!(editor.anchors().last().map(|a| a.id().0), Some(5));
}

#[test]
fn finish_closes_straight_route_at_destination() {
    let mut surface = MemorySurface::new();
    let router = fixed_router(2);
    let mut editor = soweto_route();
    editor.start(&mut surface).unwrap();
    assert_eq!(
        editor.begin_finish().unwrap_err(),
        EditError::InsufficientWaypoints { required: 2, found: 1 }
    );
    assert_eq!(editor.state(), RouteState::Drawing);

    for click in clicks() {
        editor.append(click, &router, &mut surface).unwrap();
    }
    let before = editor.dense().len();
    editor.finish(&router, &mut surface).unwrap();

    assert_eq!(editor.state(), RouteState::Finished);
    assert_eq!(editor.dense().len(), before + 3);
    assert_eq!(editor.dense().last(), Some(&BARA.point()));
    // the destination is not an anchor
    assert_eq!(editor.anchors().len(), 5);
    assert!(editor.check_invariants().is_ok());
}

#[test]
fn loop_route_with_single_anchor_closes_to_origin() {
    let mut surface = MemorySurface::new();
    let router = fixed_router(2);
    let mut editor = loop_route();
    editor.start(&mut surface).unwrap();
    assert_eq!(
        editor.begin_finish().unwrap_err(),
        EditError::InsufficientWaypoints { required: 1, found: 0 }
    );

    let a0 = GeoPoint::new(28.0412, -26.1987);
    editor.append(a0, &router, &mut surface).unwrap();
    assert_eq!(editor.dense().points(), &[a0]);
    editor.finish(&router, &mut surface).unwrap();

    let last = editor.dense().last().copied().unwrap();
    assert!(last.within(&a0, 1.0));
    assert_eq!(editor.state(), RouteState::Finished);
}

#[test]
fn loop_route_closes_back_to_first_point() {
    let mut surface = MemorySurface::new();
    let router = fixed_router(1);
    let mut editor = loop_route();
    editor.start(&mut surface).unwrap();

    let points = [
        GeoPoint::new(28.0412, -26.1987),
        GeoPoint::new(28.0501, -26.1902),
        GeoPoint::new(28.0603, -26.2011),
    ];
    for point in points {
        editor.append(point, &router, &mut surface).unwrap();
    }
    editor.finish(&router, &mut surface).unwrap();

    assert_eq!(editor.dense().first(), Some(&points[0]));
    assert_eq!(editor.dense().last(), Some(&points[0]));
    // three legs with one interior sample each, plus the first point
    assert_eq!(editor.dense().len(), 7);
}

#[test]
fn failing_provider_yields_exact_straight_line() {
    let mut surface = MemorySurface::new();
    let router = failing_router();
    let a = GeoPoint::new(28.0, -26.2);
    let b = GeoPoint::new(28.1, -26.3);

    let mut editor = loop_route();
    editor.start(&mut surface).unwrap();
    editor.append(a, &router, &mut surface).unwrap();
    let outcome = editor.append(b, &router, &mut surface).unwrap();

    assert_eq!(editor.dense().points(), &[a, b]);
    assert_eq!(outcome.warnings, vec![EditWarning::ApproximateSegment { from: a, to: b }]);

    let mut editor = RouteEditor::new(
        "Straight",
        RouteKind::Straight {
            origin: a,
            destination: GeoPoint::new(28.2, -26.4),
        },
        EditorConfig::default(),
    );
    editor.start(&mut surface).unwrap();
    editor.append(b, &router, &mut surface).unwrap();
    assert_eq!(editor.dense().points(), &[a, b]);
}

#[test]
fn removing_interior_waypoint_truncates_tail() {
    let mut surface = MemorySurface::new();
    let router = varying_router();
    let mut editor = soweto_route();
    editor.start(&mut surface).unwrap();
    for click in clicks() {
        editor.append(click, &router, &mut surface).unwrap();
    }

    let target = editor.anchors()[2].id();
    let removed = editor.remove_from(target, &mut surface).unwrap();

    assert_eq!(removed.len(), 3);
    assert_eq!(editor.anchors().len(), 2);
    assert_eq!(editor.dense().len(), editor.anchors()[1].buffer_index() + 1);
    assert_eq!(surface.markers_for("Soweto").len(), 2);
    assert!(editor.check_invariants().is_ok());
}

#[test]
fn drawing_input_requires_started_route() {
    let mut editor = soweto_route();
    assert_eq!(
        editor.begin_append(GeoPoint::new(28.0, -26.2)).unwrap_err(),
        EditError::NotDrawing(RouteState::Idle)
    );
    assert_eq!(
        editor.begin_append(GeoPoint::new(f64::NAN, -26.2)).unwrap_err(),
        EditError::NotDrawing(RouteState::Idle)
    );
}

fn click_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((27.95f64..28.10, -26.30f64..-26.15), 1..12)
}

proptest! {
    #[test]
    fn appends_keep_buffer_consistent(clicks in click_strategy()) {
        let mut surface = MemorySurface::new();
        let router = varying_router();
        let mut editor = soweto_route();
        editor.start(&mut surface).unwrap();

        for (lng, lat) in clicks {
            match editor.append(GeoPoint::new(lng, lat), &router, &mut surface) {
                Ok(_) | Err(EditError::DuplicateWaypoint) => {}
                Err(err) => return Err(TestCaseError::fail(err.to_string())),
            }
            prop_assert_eq!(editor.anchors().len(), surface.markers_for("Soweto").len());
            prop_assert_eq!(editor.dense().first(), Some(&BREE_STREET.point()));
            let points = editor.dense().points();
            for anchor in editor.anchors() {
                let index = anchor.buffer_index();
                prop_assert_eq!(points[index], anchor.position());
                if index > 0 {
                    prop_assert_ne!(points[index - 1], points[index]);
                }
            }
            prop_assert!(editor.check_invariants().is_ok());
        }
    }

    #[test]
    fn truncation_cuts_to_predecessor(clicks in click_strategy(), pick in any::<prop::sample::Index>()) {
        let mut surface = MemorySurface::new();
        let router = varying_router();
        let mut editor = soweto_route();
        editor.start(&mut surface).unwrap();
        for (lng, lat) in clicks {
            let _ = editor.append(GeoPoint::new(lng, lat), &router, &mut surface);
        }
        prop_assume!(editor.anchors().len() > 1);

        let i = 1 + pick.index(editor.anchors().len() - 1);
        let expected_len = editor.anchors()[i - 1].buffer_index() + 1;
        let target = editor.anchors()[i].id();
        editor.remove_from(target, &mut surface).unwrap();

        prop_assert_eq!(editor.anchors().len(), i);
        prop_assert_eq!(editor.dense().len(), expected_len);
        prop_assert_eq!(surface.markers_for("Soweto").len(), i);
        prop_assert_eq!(editor.dense().first(), Some(&BREE_STREET.point()));
    }
}
