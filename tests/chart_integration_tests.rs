//! Integration tests for chart creation and persistence through the
//! synchronous handoff
//!
//! These tests verify that:
//! - A handle returned by chart creation always refers to a constructed,
//!   visible window
//! - Saving blocks until the file exists on storage with non-zero size
//! - Operations on released or never-allocated handles are reported errors
//! - Fire-and-forget updates land on the right window

mod common;

use benchlab::models::ChartSpec;
use benchlab::tasks::TaskKind;
use common::TestApp;

fn line_spec(title: &str) -> ChartSpec {
    ChartSpec::line(title, "t", "V", 10.0, 5.0, 600, false)
}

#[test]
fn test_handle_refers_to_visible_window_upon_return() {
    let app = TestApp::new();

    // The worker role: create through the handoff, then check window state
    // immediately, before the main loop gets any further input.
    let spec = line_spec("Sweep");
    let handle = app
        .ui
        .call(move |state| state.create_chart(spec))
        .unwrap()
        .unwrap();

    let window = app.chart_log.last().expect("window constructed");
    assert!(window.lock().unwrap().visible);
    assert!(app.snapshot(move |state| state.charts.is_live(handle)));
}

#[test]
fn test_plot_and_set_value_reach_window() {
    let app = TestApp::new();

    let spec = line_spec("Sweep");
    let handle = app
        .ui
        .call(move |state| state.create_chart(spec))
        .unwrap()
        .unwrap();

    app.ui.post(move |state| {
        state.charts.plot(handle, 1.0, 2.0).unwrap();
        state.charts.plot(handle, 3.0, 4.0).unwrap();
    });
    app.barrier();

    let window = app.chart_log.last().unwrap();
    assert_eq!(window.lock().unwrap().points, vec![(1.0, 2.0), (3.0, 4.0)]);
}

#[test]
fn test_save_csv_file_exists_with_content_when_script_returns() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sweep.csv");
    let png_path = dir.path().join("sweep.png");

    let script = format!(
        r#"
let chart = chart_new("line", "Sweep", "t", "V", 10.0, 5.0, 600, false);
chart_plot(chart, 1.0, 2.0);
chart_plot(chart, 2.0, 4.0);
chart_save_csv(chart, "{csv}");
chart_save_png(chart, "{png}");
"#,
        csv = csv_path.display(),
        png = png_path.display(),
    );

    app.controller.run_script(script, "save.rhai").unwrap();
    app.wait_for(TaskKind::Script);

    let csv = std::fs::metadata(&csv_path).expect("csv exists");
    let png = std::fs::metadata(&png_path).expect("png exists");
    assert!(csv.len() > 0);
    assert!(png.len() > 0);

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert!(contents.contains("1,2"));
    assert!(contents.contains("2,4"));
}

#[test]
fn test_save_csv_on_gauge_is_reported_error() {
    let app = TestApp::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gauge.csv");

    let script = format!(
        r#"
let gauge = chart_new("linear-gauge", "Load", "%", 0.0, 100.0, 400);
chart_save_csv(gauge, "{path}");
"#,
        path = path.display(),
    );

    app.controller.run_script(script, "gauge.rhai").unwrap();
    app.wait_for(TaskKind::Script);

    assert!(!path.exists());
    let log = app.script_log();
    assert!(
        log.iter().any(|line| line.contains("no CSV data")),
        "expected a NoCsvData report, got {log:?}"
    );
}

#[test]
fn test_operation_on_closed_handle_is_reported() {
    let app = TestApp::new();

    let script = r#"
let chart = chart_new("number", "Reading", "V", 300);
chart_set_value(chart, 42.0);
chart_close(chart);
chart_set_value(chart, 43.0);
"#;

    app.controller.run_script(script, "closed.rhai").unwrap();
    app.wait_for(TaskKind::Script);

    let window = app.chart_log.last().unwrap();
    assert!(!window.lock().unwrap().visible);
    // The write before close landed; the one after was refused and logged.
    assert_eq!(window.lock().unwrap().value, Some(42.0));
    let log = app.script_log();
    assert!(
        log.iter()
            .any(|line| line.contains("chart_set_value") && line.contains("live")),
        "expected a stale-handle report, got {log:?}"
    );
}

#[test]
fn test_stale_handle_does_not_alias_reused_slot() {
    let app = TestApp::new();

    // Close the first chart, open a second (which may reuse the slot), then
    // write through the stale handle.
    let script = r#"
let old = chart_new("number", "One", "V", 300);
chart_close(old);
let fresh = chart_new("number", "Two", "A", 300);
chart_set_value(old, 7.0);
chart_set_value(fresh, 9.0);
"#;

    app.controller.run_script(script, "stale.rhai").unwrap();
    app.wait_for(TaskKind::Script);

    assert_eq!(app.chart_log.window_count(), 2);
    let fresh_window = app.chart_log.window(1).unwrap();
    // The stale write never reached the new occupant.
    assert_eq!(fresh_window.lock().unwrap().value, Some(9.0));
    let log = app.script_log();
    assert!(log.iter().any(|line| line.contains("chart_set_value")));
}

#[test]
fn test_unknown_kind_reported_and_nothing_opened() {
    let app = TestApp::new();

    app.controller
        .run_script(
            r#"let c = chart_new("pie", "Nope", "x", 300);"#,
            "unknown.rhai",
        )
        .unwrap();
    app.wait_for(TaskKind::Script);

    assert_eq!(app.chart_log.window_count(), 0);
    let log = app.script_log();
    assert!(
        log.iter().any(|line| line.contains("unknown chart kind")),
        "expected unknown-kind report, got {log:?}"
    );
}
