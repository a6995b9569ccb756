//! Offset-mode extraction against a simulated server

mod common;

use common::{client, job, output_ids, read_output, state_path, SimServer};
use featdump_core::extract;
use featdump_core::models::RetrievalMode;
use featdump_core::state::{Identity, State};
use featdump_core::ExtractError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_pages_until_short_page() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let server = SimServer::line(5);
    let job = job(&output, RetrievalMode::Offset, 2);

    let summary = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap();

    assert_eq!(summary.written, 5);
    assert!(!summary.resumed);
    assert_eq!(output_ids(&output), vec![0, 1, 2, 3, 4]);

    let starts: Vec<String> = server
        .log
        .borrow()
        .iter()
        .map(|q| SimServer::param(q, "startIndex").unwrap())
        .collect();
    assert_eq!(starts, vec!["0", "2", "4"]);
    assert!(server
        .log
        .borrow()
        .iter()
        .all(|q| SimServer::param(q, "sortBy").as_deref() == Some("n")));
}

#[test]
fn test_state_file_removed_on_completion() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let server = SimServer::line(8);
    let job = job(&output, RetrievalMode::Offset, 3);

    let summary = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap();

    assert_eq!(summary.written, 8);
    assert_eq!(server.requests(), 3);
    assert!(output.exists());
    assert!(!state_path(&output).exists());
}

#[test]
fn test_exact_multiple_needs_one_empty_page() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let server = SimServer::line(6);
    let job = job(&output, RetrievalMode::Offset, 3);

    extract::run(&job, &mut client(&server, &job), |_| {}).unwrap();

    assert_eq!(server.requests(), 3);
    assert_eq!(read_output(&output).len(), 6);
}

#[test]
fn test_interrupted_run_resumes_where_it_stopped() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 2);

    let flaky = SimServer::line(7).fail_on(3);
    let err = extract::run(&job, &mut client(&flaky, &job), |_| {}).unwrap_err();
    assert!(matches!(err, ExtractError::Network(_)));
    assert_eq!(output_ids(&output), vec![0, 1, 2, 3]);

    let state = State::load_file(&state_path(&output)).unwrap();
    let progress = state.offset().unwrap();
    assert_eq!(progress.index_done_till, 4);
    assert_eq!(progress.downloaded_count, 4);

    let healthy = SimServer::line(7);
    let summary = extract::run(&job, &mut client(&healthy, &job), |_| {}).unwrap();
    assert!(summary.resumed);
    assert_eq!(summary.written, 3);
    assert_eq!(output_ids(&output), vec![0, 1, 2, 3, 4, 5, 6]);

    let first = &healthy.log.borrow()[0];
    assert_eq!(SimServer::param(first, "startIndex").as_deref(), Some("4"));
    assert!(!state_path(&output).exists());
}

#[test]
fn test_count_mismatch_is_refused() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 2);

    fs::write(&output, "{\"a\":1}\n{\"a\":2}\n").unwrap();
    let mut state = State::create(job.identity(), job.sort_key.clone());
    state.attach(&state_path(&output)).unwrap();
    state.update_offset(3, 3).unwrap();

    let server = SimServer::line(5);
    let err = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap_err();

    assert!(matches!(err, ExtractError::StateMismatch(_)));
    assert_eq!(server.requests(), 0);
    assert_eq!(read_output(&output).len(), 2);
}

#[test]
fn test_identity_mismatch_is_refused() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 2);

    fs::write(&output, "").unwrap();
    let other = Identity {
        layername: "lines".to_string(),
        ..job.identity()
    };
    let mut state = State::create(other, job.sort_key.clone());
    state.attach(&state_path(&output)).unwrap();

    let server = SimServer::line(5);
    let err = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap_err();
    assert!(matches!(err, ExtractError::StateMismatch(ref m) if m.contains("layername")));
    assert_eq!(server.requests(), 0);
}

#[test]
fn test_refused_resume_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 2);

    let contents = "{\"a\":1}\n{\"partial";
    fs::write(&output, contents).unwrap();
    let other = Identity {
        layername: "lines".to_string(),
        ..job.identity()
    };
    let mut state = State::create(other, job.sort_key.clone());
    state.attach(&state_path(&output)).unwrap();
    let saved_state = fs::read_to_string(state_path(&output)).unwrap();

    let server = SimServer::line(5);
    let err = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap_err();

    assert!(matches!(err, ExtractError::StateMismatch(_)));
    assert_eq!(fs::read_to_string(&output).unwrap(), contents);
    assert_eq!(fs::read_to_string(state_path(&output)).unwrap(), saved_state);
}

#[test]
fn test_count_mismatch_leaves_partial_line() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 2);

    let contents = "{\"a\":1}\n{\"b\":2}\n{\"partial";
    fs::write(&output, contents).unwrap();
    let mut state = State::create(job.identity(), job.sort_key.clone());
    state.attach(&state_path(&output)).unwrap();
    state.update_offset(2, 1).unwrap();

    let server = SimServer::line(5);
    let err = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap_err();

    assert!(matches!(err, ExtractError::StateMismatch(ref m) if m.contains("(1)") && m.contains("(2)")));
    assert_eq!(fs::read_to_string(&output).unwrap(), contents);
    assert_eq!(server.requests(), 0);
}

#[test]
fn test_lone_output_file_is_refused() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    fs::write(&output, "{}\n").unwrap();
    let job = job(&output, RetrievalMode::Offset, 2);

    let server = SimServer::line(5);
    let err = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap_err();

    assert!(matches!(err, ExtractError::InconsistentFiles { .. }));
    assert_eq!(fs::read_to_string(&output).unwrap(), "{}\n");
    assert!(!state_path(&output).exists());
}

#[test]
fn test_skip_index_advances_start() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let mut job = job(&output, RetrievalMode::Offset, 10);
    job.skip_index = 2;

    let server = SimServer::line(5);
    let summary = extract::run(&job, &mut client(&server, &job), |_| {}).unwrap();

    assert_eq!(summary.written, 3);
    assert_eq!(output_ids(&output), vec![2, 3, 4]);
}

#[test]
fn test_progress_callback_counts_writes() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("points.geojsonl");
    let job = job(&output, RetrievalMode::Offset, 4);

    let server = SimServer::line(6);
    let mut seen = Vec::new();
    extract::run(&job, &mut client(&server, &job), |n| seen.push(n)).unwrap();
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
}
