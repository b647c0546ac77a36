//! Agent startup, ticking and shutdown on a paused clock

mod common;

use common::{RecordingEngine, THREE_SETS, config_from, write_config};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vd_agent::{Agent, Config, Error};

#[tokio::test(start_paused = true)]
async fn first_tick_one_second_after_start_then_every_interval() {
    let engine = RecordingEngine::new();
    let agent = Agent::new(
        config_from("interval: 30\nsets:\n  - name: a\n    url: https://example.com/a\n"),
        engine.clone(),
    );
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(agent.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(engine.downloaded_sets().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.downloaded_sets().len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(engine.downloaded_sets().len(), 3);

    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn slow_ticks_never_overlap() {
    // each of the three sets takes 5s, so a tick lasts 15s against a 10s interval
    let engine = RecordingEngine::slow(Duration::from_secs(5));
    let mut config = config_from(THREE_SETS);
    config.interval = Duration::from_secs(10);
    let agent = Agent::new(config, engine.clone());
    let handle = agent.start().unwrap();

    // ticks at 1s (ends 16s) and 21s (ends 36s)
    tokio::time::sleep(Duration::from_secs(40)).await;

    assert_eq!(
        engine.downloaded_sets(),
        vec!["one", "two", "three", "one", "two", "three"]
    );
    assert_eq!(handle.jobs()[0].skipped_runs, 2);
    handle.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_further_ticks() {
    let engine = RecordingEngine::new();
    let agent = Agent::new(config_from(THREE_SETS), engine.clone());
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(agent.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_secs(2)).await;
    shutdown.cancel();
    task.await.unwrap().unwrap();
    let downloads = engine.downloaded_sets().len();

    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;

    assert_eq!(downloads, 3);
    assert_eq!(engine.downloaded_sets().len(), downloads);
}

#[tokio::test(start_paused = true)]
async fn failing_ticks_keep_the_agent_running() {
    let engine = RecordingEngine::failing(&["one"]);
    let mut config = config_from(THREE_SETS);
    config.interval = Duration::from_secs(5);
    let handle = Agent::new(config, engine.clone()).start().unwrap();

    tokio::time::sleep(Duration::from_millis(11_500)).await;

    assert_eq!(engine.downloaded_sets(), vec!["one", "one", "one"]);
    let info = &handle.jobs()[0];
    assert_eq!(info.failed_runs, 3);
    assert!(handle.is_running());
    handle.shutdown();
}

#[test]
fn config_file_round_trip_through_load() {
    let file = write_config(THREE_SETS);

    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.interval, Duration::from_secs(3600));
    assert_eq!(config.sets.len(), 3);
    assert_eq!(config.sets[1].name, "two");
}

#[test]
fn malformed_config_files_are_fatal() {
    let cases = [
        "interval: 60\n",
        "interval: 0\nsets: []\n",
        "interval: [unclosed\n",
        "sets:\n  - name: a\n    url: u\n",
    ];

    for contents in cases {
        let file = write_config(contents);
        match Config::load(file.path()) {
            Err(e @ Error::Config { .. }) => assert!(e.is_fatal()),
            other => panic!("Expected Config error for {:?}, got: {:?}", contents, other),
        }
    }
}

#[test]
fn missing_config_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = Config::load(&dir.path().join("config.yaml")).unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("config.yaml"));
}
