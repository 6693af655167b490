//! The dispatch adapter driven against the simulated engine in several
//! dialects.

use std::time::Duration;

use fs_core::{Point2, Rect};
use fs_host::geometry::{self, VertexHandle};
use fs_host::sim::{EntityMove, LabeledLookup, SimDialect, SimEngine, SimFaults, SimModel};
use fs_host::{
    FieldHost, HostError, MoveMethod, Session, SessionOptions, SolvePolicy, extract, fields,
};
use proptest::prelude::*;

fn plunger() -> SimModel {
    SimModel::new()
        .with_rect_block("air", Rect::new(-20.0, -20.0, 20.0, 20.0))
        .with_rect_block("steel mover", Rect::new(0.0, 0.0, 2.0, 1.0))
        .with_rect_block("steel mover", Rect::new(2.0, 0.0, 4.0, 1.0))
        .with_rect_block("bobine", Rect::new(0.0, 3.0, 4.0, 4.0))
        .with_label("bobine", Some(Point2::new(2.0, 3.5)), &[("Loading", 100.0)])
        .with_label("steel mover", Some(Point2::new(1.0, 0.5)), &[])
        .with_label("air", None, &[])
}

fn options() -> SessionOptions {
    SessionOptions {
        solve: SolvePolicy {
            poll_interval: Duration::ZERO,
            max_polls: 10,
        },
        ..SessionOptions::default()
    }
}

fn open(engine: &SimEngine) -> Session {
    Session::open(engine.app(), None, None, options()).unwrap()
}

fn mover() -> Vec<String> {
    vec!["steel mover".to_string()]
}

#[test]
fn group_move_uses_one_atomic_selection_move() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);

    let rect = session.union_bounds(&mover()).unwrap();
    assert_eq!(rect, Rect::new(0.0, 0.0, 4.0, 1.0));

    let report = session.move_group(&mover(), rect, 1.5, 0.0).unwrap();
    assert_eq!(report.method, MoveMethod::Selection("Move(0, vector)"));
    assert_eq!(report.moved, 2);

    let stats = engine.stats();
    assert_eq!(stats.move_calls, 1);
    assert_eq!(stats.vertex_translations, 6);
    assert_eq!(engine.label_bounds("steel mover"), Some(Rect::new(1.5, 0.0, 5.5, 1.0)));
    assert_eq!(engine.label_bounds("bobine"), Some(Rect::new(0.0, 3.0, 4.0, 4.0)));
}

#[test]
fn legacy_dialect_falls_back_to_deduplicated_vertices() {
    let engine = SimEngine::new(plunger(), SimDialect::legacy());
    let mut session = open(&engine);

    // Bounds come from vertex extents
    let rect = session.union_bounds(&mover()).unwrap();
    assert_eq!(rect, Rect::new(0.0, 0.0, 4.0, 1.0));

    let report = session.move_group(&mover(), rect, 0.0, -0.5).unwrap();
    assert_eq!(report.method, MoveMethod::Vertices);
    // Two blocks share an edge: 8 ring vertices, 6 distinct
    assert_eq!((report.moved, report.total), (6, 6));
    assert_eq!(engine.label_bounds("steel mover"), Some(Rect::new(0.0, -0.5, 4.0, 0.5)));
    assert_eq!(engine.stats().move_calls, 6);
}

#[test]
fn entity_move_settles_on_each_dialect_shape() {
    let cases = [
        (EntityMove::Vector, "Move(vector)"),
        (EntityMove::Scalars, "Move(dx, dy)"),
        (EntityMove::Interactive, "Move()"),
        (EntityMove::PointAssign, "Point = PointXY"),
        (EntityMove::PointFields, "Point.X/Y"),
    ];
    for (style, expected) in cases {
        let dialect = SimDialect {
            entity_move: style,
            ..SimDialect::default()
        };
        let engine = SimEngine::new(plunger(), dialect);
        let session = open(&engine);
        let vertices = geometry::collect_vertices(&session, &["bobine".to_string()]).unwrap();
        let VertexHandle::Entity(vertex) = &vertices[0] else {
            panic!("expected a vertex entity");
        };
        let shape = geometry::move_entity(&session, vertex, 0.25, 0.0).unwrap();
        assert_eq!(shape, expected, "dialect {style:?}");
    }
}

#[test]
fn region_lookup_uses_three_argument_form_or_scan() {
    for lookup in [LabeledLookup::OneArg, LabeledLookup::ThreeArgs, LabeledLookup::Unsupported] {
        let dialect = SimDialect {
            labeled_lookup: lookup,
            ..SimDialect::default()
        };
        let engine = SimEngine::new(plunger(), dialect);
        let session = open(&engine);
        assert_eq!(geometry::find_regions(&session, "STEEL MOVER").unwrap().len(), 2);
        let err = geometry::find_region(&session, "armature").err().expect("expected lookup to fail");
        assert!(matches!(err, HostError::NotFound { what: "region", .. }));
    }
}

#[test]
fn region_labels_are_unique_and_ordered() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let session = open(&engine);
    assert_eq!(
        geometry::list_region_labels(&session).unwrap(),
        vec!["air", "steel mover", "bobine"]
    );
}

#[test]
fn transient_solve_failure_is_retried_once() {
    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        transient_solve_failures: 1,
        ..SimFaults::default()
    });
    let mut session = open(&engine);
    let outcome = session.solve().unwrap();
    assert!(outcome.retried);
    assert!(outcome.warning.is_none());
    assert!(outcome.analyzed);
    assert_eq!(engine.stats().solve_calls, 2);
    assert_eq!(engine.stats().mesh_builds, 1);
}

#[test]
fn repeated_transient_failure_becomes_a_warning() {
    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        transient_solve_failures: 2,
        ..SimFaults::default()
    });
    let mut session = open(&engine);
    let outcome = session.solve().unwrap();
    assert!(outcome.retried);
    assert!(outcome.warning.as_deref().is_some_and(|w| w.contains("has no mesh")));
}

#[test]
fn other_solve_failures_are_fatal() {
    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        solve_error: Some("matrix is singular".to_string()),
        ..SimFaults::default()
    });
    let mut session = open(&engine);
    let err = session.solve().unwrap_err();
    assert!(matches!(err, HostError::Solve { ref detail } if detail.contains("singular")));
    assert_eq!(engine.stats().solve_calls, 1);
}

#[test]
fn legacy_solve_polls_busy_flag() {
    let engine = SimEngine::new(plunger(), SimDialect::legacy());
    let mut session = open(&engine);
    let outcome = session.solve().unwrap();
    assert_eq!(outcome.polls, 2);
    assert!(!outcome.retried);
}

#[test]
fn vector_integral_decomposes_into_axes() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);
    session.solve().unwrap();
    let components = session.evaluate_integral(&mover(), 15).unwrap();
    let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["X", "Y"]);
    // Centroid (2, 0.5) of the six mover vertices, total Loading 100
    assert!((components[0].value - 200.0).abs() < 1e-9);
    assert!((components[1].value - 50.0).abs() < 1e-9);
    assert_eq!(engine.contour(), vec!["steel mover"]);
}

#[test]
fn scalar_integral_has_unnamed_component() {
    let engine = SimEngine::new(plunger(), SimDialect::legacy());
    let mut session = open(&engine);
    session.solve().unwrap();
    let components = session.evaluate_integral(&mover(), 13).unwrap();
    assert_eq!(components.len(), 1);
    assert!(components[0].name.is_empty());
    assert!((components[0].value - 200.0).abs() < 1e-9);
}

#[test]
fn integral_without_contour_blocks_is_an_extraction_failure() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);
    session.solve().unwrap();
    let err = session.evaluate_integral(&["armature".to_string()], 15).unwrap_err();
    assert!(matches!(err, HostError::Extraction { .. }));
}

#[test]
fn integral_before_solve_is_an_extraction_failure() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);
    assert!(matches!(
        session.evaluate_integral(&mover(), 15),
        Err(HostError::Extraction { .. })
    ));
}

#[test]
fn lenient_result_lookup_matches_substrings() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);
    session.solve().unwrap();
    assert!(extract::find_result_region(&session, "mover", false).unwrap().is_none());
    assert!(extract::find_result_region(&session, "mover", true).unwrap().is_some());
    assert_eq!(extract::list_result_labels(&session, 2).unwrap().len(), 2);
}

#[test]
fn field_assignment_handles_property_and_method_binding() {
    for dialect in [SimDialect::default(), SimDialect::legacy()] {
        let engine = SimEngine::new(plunger(), dialect);
        let mut session = open(&engine);
        session.set_field_value("Bobine", "Loading", 250.0).unwrap();
        assert_eq!(engine.label_field("bobine", "Loading"), Some(250.0));
        assert_eq!(fields::read_label_field(&session, "bobine", "Loading").unwrap(), 250.0);

        let err = session.set_field_value("coil", "Loading", 1.0).unwrap_err();
        assert!(matches!(err, HostError::Field { .. }));
    }
}

#[test]
fn loading_assignment_sets_total_current_and_saves() {
    // (dialect, data document saves per assignment)
    for (dialect, doc_saves) in [(SimDialect::default(), 1), (SimDialect::legacy(), 0)] {
        let engine = SimEngine::new(plunger(), dialect);
        let mut session = open(&engine);
        session.set_field_value("bobine", "Loading", 300.0).unwrap();
        assert_eq!(engine.label_field("bobine", "LoadingEx"), Some(300.0));
        assert_eq!(engine.label_field("bobine", "TotalCurrent"), Some(1.0));
        let stats = engine.stats();
        assert_eq!(stats.data_doc_saves, doc_saves);
        assert_eq!(stats.problem_saves, 1);
    }
}

#[test]
fn other_fields_are_not_mirrored() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let mut session = open(&engine);
    session.set_field_value("bobine", "Turns", 40.0).unwrap();
    assert_eq!(engine.label_field("bobine", "Turns"), Some(40.0));
    assert_eq!(engine.label_field("bobine", "LoadingEx"), None);
    assert_eq!(engine.stats().problem_saves, 1);
}

#[test]
fn failed_save_does_not_fail_the_assignment() {
    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        save_error: Some("file is read-only".to_string()),
        ..SimFaults::default()
    });
    let mut session = open(&engine);
    session.set_field_value("bobine", "Loading", 50.0).unwrap();
    assert_eq!(engine.label_field("bobine", "Loading"), Some(50.0));
    let stats = engine.stats();
    assert_eq!((stats.data_doc_saves, stats.problem_saves), (0, 0));
}

#[test]
fn label_markers_move_by_point_assignment() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let session = open(&engine);
    let moved = geometry::move_block_labels(&session, &["BOBINE".to_string()], 1.0, -1.0).unwrap();
    assert_eq!(moved, 1);
    let marker = engine.model().labels[0].marker;
    assert_eq!(marker, Some(Point2::new(3.0, 2.5)));
}

#[test]
fn drawn_rectangle_becomes_a_labelled_block() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let session = open(&engine);
    let outline = Rect::new(6.0, 6.0, 8.0, 8.0);
    let drawn = geometry::add_rect_with_block_label(&session, outline, 0.5, "probe").unwrap();
    assert_eq!(drawn, Rect::new(6.5, 6.5, 7.5, 7.5));
    assert_eq!(engine.label_bounds("probe"), Some(drawn));
    let model = engine.model();
    let centre = Some(Point2::new(7.0, 7.0));
    assert!(model.labels.iter().any(|l| l.name == "probe" && l.marker == centre));

    let too_small = Rect::new(0.0, 0.0, 1.0, 1.0);
    let err = geometry::add_rect_with_block_label(&session, too_small, 0.5, "x").unwrap_err();
    assert!(matches!(err, HostError::Move { .. }));
}

#[test]
fn vertices_in_rectangle_move_once() {
    let engine = SimEngine::new(plunger(), SimDialect::default());
    let session = open(&engine);
    let rect = Rect::new(0.0, 0.0, 4.0, 1.0);
    let (moved, total) = geometry::move_vertices_in_rect(&session, rect, 0.0, 2.0, 1e-6).unwrap();
    assert_eq!((moved, total), (6, 6));
    assert_eq!(engine.label_bounds("steel mover"), Some(Rect::new(0.0, 2.0, 4.0, 3.0)));
}

#[test]
fn session_reports_connection_and_model_failures() {
    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        no_active_problem: true,
        ..SimFaults::default()
    });
    assert!(matches!(
        Session::open(engine.app(), None, None, options()),
        Err(HostError::Connection { .. })
    ));

    let engine = SimEngine::new(plunger(), SimDialect::default()).with_faults(SimFaults {
        model_missing: true,
        ..SimFaults::default()
    });
    assert!(matches!(
        Session::open(engine.app(), None, None, options()),
        Err(HostError::ModelLoad { .. })
    ));
}

#[test]
fn mesh_lifecycle_follows_dialect_target() {
    for dialect in [SimDialect::default(), SimDialect::legacy()] {
        let engine = SimEngine::new(plunger(), dialect);
        let mut session = open(&engine);
        session.build_mesh().unwrap();
        assert!(engine.mesh_built());
        session.remove_mesh().unwrap();
        assert!(!engine.mesh_built());
    }
}

proptest! {
    #[test]
    fn vertex_fallback_translates_group_bounds(
        dx in -5.0..5.0f64,
        dy in -5.0..5.0f64,
    ) {
        let engine = SimEngine::new(plunger(), SimDialect::legacy());
        let mut session = open(&engine);
        let baseline = session.union_bounds(&mover()).unwrap();
        let report = session.move_group(&mover(), baseline, dx, dy).unwrap();
        prop_assert_eq!(report.method, MoveMethod::Vertices);
        prop_assert_eq!((report.moved, report.total), (6, 6));
        let moved = engine.label_bounds("steel mover").unwrap();
        prop_assert!(moved.approx_eq(&baseline.translated(dx, dy), 1e-9));
        prop_assert_eq!(engine.label_bounds("bobine"), Some(Rect::new(0.0, 3.0, 4.0, 4.0)));
    }
}
