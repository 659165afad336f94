//! Integration tests for edit-triggered re-runs
//!
//! A parameter edit queues an event; `process_events` re-runs the pipeline
//! from the edited stage, starting from the payload that stage originally
//! received, and appends to the log without rewriting it.

mod common;

use common::builders::{add, failing, first, scalar, TableBuilder};
use common::{assert_float_eq, RecordingSink};
use nodeflow::library::{normalize, rfft, splice};
use nodeflow::pipeline::{EntryOutcome, PipelineStatus, RunId};
use nodeflow::{args, Container, RecordingBinder, SessionConfig};
use std::cell::RefCell;
use std::rc::Rc;

fn headless(value: f64) -> Container {
    Container::with_config(scalar(value), SessionConfig::headless())
}

#[test]
fn test_edit_queued_node_before_running() {
    let node = add().node(args![1.0]);
    let mut container = headless(0.0) >> &node;

    node.set_param("amount", 4.0);
    assert_eq!(container.queued_events(), 1);

    let report = container.process_events().unwrap();
    assert!(report.is_success());
    assert_eq!(first(container.payload()), 4.0);
    assert_eq!(container.log().entries()[0].params.get("amount").and_then(|v| v.as_float()), Some(4.0));
}

#[test]
fn test_edit_after_run_restarts_from_that_stage() {
    let a = add().node(args![1.0]);
    let b = add().node(args![10.0]);
    let mut container = headless(0.0) >> &a >> &b;

    container.execute_pipeline(false);
    assert_eq!(first(container.payload()), 11.0);

    b.set_param("amount", 20.0);
    let report = container.process_events().unwrap();

    assert_eq!(report.start, 1);
    assert_eq!(report.executed, 1);
    assert_eq!(first(container.payload()), 21.0);
}

#[test]
fn test_rerun_appends_to_history() {
    let a = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a >> add().node(args![2.0]);
    container.execute_pipeline(false);
    let before: Vec<_> = container.log().entries().to_vec();

    a.set_param("amount", 3.0);
    container.process_events();

    let log = container.log().entries();
    assert_eq!(log.len(), 4);
    assert_eq!(&log[..2], &before[..]);
    assert_eq!(log[2].run, RunId(before[0].run.0 + 1));
    assert!(log.iter().all(|e| e.outcome == EntryOutcome::Completed));
    assert_eq!(first(container.payload()), 5.0);
}

#[test]
fn test_multiple_edits_coalesce_into_one_run() {
    let a = add().node(args![1.0]);
    let b = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a >> &b;
    container.execute_pipeline(false);

    b.set_param("amount", 5.0);
    a.set_param("amount", 2.0);
    b.set_param("amount", 6.0);
    assert_eq!(container.queued_events(), 3);

    let report = container.process_events().unwrap();
    assert_eq!(report.start, 0);
    assert_eq!(container.queued_events(), 0);
    assert_eq!(container.log().len(), 4);
    assert_eq!(first(container.payload()), 8.0);

    assert!(container.process_events().is_none());
}

#[test]
fn test_edit_that_now_fails_keeps_last_good_payload() {
    let sink = RecordingSink::new();
    let a = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a >> add().node(args![10.0]);
    container.attach_status_sink(Box::new(sink.clone()));
    container.execute_pipeline(false);

    a.set_param("amount", "oops");
    let report = container.process_events().unwrap();

    assert!(!report.is_success());
    assert!(container.status().is_failure());
    assert_eq!(first(container.payload()), 0.0);
    assert!(matches!(sink.statuses().first(), Some(PipelineStatus::Processing { .. })));

    a.set_param("amount", 2.0);
    let report = container.process_events().unwrap();
    assert!(report.is_success());
    assert_eq!(first(container.payload()), 12.0);
}

#[test]
fn test_edits_after_clearing_run_are_ignored() {
    let a = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a;
    container.execute_pipeline(true);

    a.set_param("amount", 9.0);
    assert!(container.process_events().is_none());
    assert_eq!(first(container.payload()), 1.0);
    assert_eq!(container.log().len(), 1);
}

#[test]
fn test_rechaining_after_clearing_run_registers_one_trigger() {
    let a = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a;
    container.execute_pipeline(true);
    assert_eq!(a.subscriber_count(), 0);

    container.chain(&a);
    container.execute_pipeline(false);
    assert_eq!(a.subscriber_count(), 1);

    a.set_param("amount", 2.0);
    assert_eq!(container.queued_events(), 1);
    let report = container.process_events().unwrap();
    assert_eq!(report.executed, 1);
    assert_eq!(first(container.payload()), 3.0);

    drop(container);
    assert_eq!(a.subscriber_count(), 0);
}

#[test]
fn test_one_node_chained_into_two_containers() {
    let shared = add().node(args![1.0]);
    let mut left = headless(0.0) >> &shared;
    let mut right = headless(100.0) >> &shared;
    left.execute_pipeline(false);
    right.execute_pipeline(false);

    shared.set_param("amount", 2.0);
    left.process_events();
    right.process_events();

    assert_eq!(first(left.payload()), 2.0);
    assert_eq!(first(right.payload()), 102.0);
}

#[test]
fn test_binder_edit_drives_library_pipeline() {
    let binder = Rc::new(RefCell::new(RecordingBinder::new()));
    let table = TableBuilder::new().ramps(2, 16).build();
    let mut container = Container::with_config(table, SessionConfig::default());
    container.set_binder(binder.clone());

    container
        .chain(&splice().node(args!["trace", 0, 16]))
        .chain(&normalize().node(args!["spliced"]))
        .chain(&rfft().node(args!["normalize"]));
    assert!(container.execute_pipeline(false).is_success());
    assert_eq!(container.payload().table().unwrap().series("fft").unwrap()[0].len(), 9);

    let splice_id = binder.borrow().specs()[0].node_id;
    assert!(binder.borrow().edit(splice_id, "stop", 8));
    let report = container.process_events().unwrap();

    assert!(report.is_success());
    let table = container.payload().table().unwrap();
    assert_eq!(table.series("spliced").unwrap()[1].len(), 8);
    assert_eq!(table.series("fft").unwrap()[0].len(), 5);
    let normalized = table.series("normalize").unwrap();
    assert_float_eq(normalized[1][7], 1.0, 1e-12);
    assert_eq!(container.log().len(), 6);
}

#[test]
fn test_rerun_node_and_failure_then_run_pending() {
    let a = add().node(args![1.0]);
    let mut container = headless(0.0) >> &a >> failing("later").node(args![]);

    container.execute_pipeline(false);
    assert_eq!(container.pending().len(), 1);

    let report = container.rerun_node(&a).unwrap();
    assert_eq!(report.start, 0);
    assert!(!report.is_success());

    let stranger = add().node(args![1.0]);
    assert!(container.rerun_node(&stranger).is_err());
}
