//! Unit tests for the Engine context
//!
//! Tests that swap the process-wide logger are #[serial]; their assertions only
//! look at entries from their own sources since unrelated tests log concurrently.

use crate::nova3d::{Engine, Error, FailurePolicy};
use crate::nova3d::log::{LogEntry, LogSeverity, Logger};
use crate::gpu::Config;
use crate::graphics_device::mock_graphics_device::{MockAdapterProvider, MockCall};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn config() -> Config {
    Config {
        gpu_memory_budget: 4 * 1024 * 1024,
        failure_policy: FailurePolicy::Propagate,
        ..Config::default()
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

#[test]
fn test_engine_owns_gpu() {
    let provider = MockAdapterProvider::new();
    let mut engine = Engine::new(&provider, 1280, 720, config()).unwrap();

    engine.gpu_mut().start_frame().unwrap();
    engine.gpu_mut().end_frame().unwrap();

    assert_eq!(engine.gpu().stats().frame_number, 1);
    assert_eq!(engine.gpu().size(), Some((1280, 720)));
}

#[test]
fn test_engine_shutdown_releases_gpu() {
    let provider = MockAdapterProvider::new();
    let state = provider.state();
    let mut engine = Engine::new(&provider, 640, 480, config()).unwrap();

    engine.shutdown().unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.live_heap_count(), 0);
    assert_eq!(state.live_resource_count(), 0);
    assert!(state.calls.iter().any(|c| matches!(c, MockCall::DestroyFence { .. })));
}

#[test]
fn test_two_engines_are_independent() {
    let first_provider = MockAdapterProvider::new();
    let second_provider = MockAdapterProvider::new();
    let mut first = Engine::new(&first_provider, 800, 600, config()).unwrap();
    let second = Engine::new(&second_provider, 800, 600, config()).unwrap();

    first.gpu_mut().start_frame().unwrap();

    assert!(first.gpu().is_recording());
    assert!(!second.gpu().is_recording());
}

#[test]
fn test_engine_new_propagates_bootstrap_failure() {
    let provider = MockAdapterProvider::with_adapters(Vec::new());

    assert!(matches!(
        Engine::new(&provider, 800, 600, config()),
        Err(Error::InitializationFailed(_))
    ));
}

// ============================================================================
// LOGGING
// ============================================================================

#[test]
#[serial]
fn test_log_and_log_detailed_reach_custom_logger() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: Arc::clone(&entries) });

    Engine::log(LogSeverity::Info, "nova3d::test::engine", "plain".to_string());
    Engine::log_detailed(LogSeverity::Error, "nova3d::test::engine", "located".to_string(), "gpu.rs", 42);
    Engine::reset_logger();

    let entries: Vec<LogEntry> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == "nova3d::test::engine")
        .cloned()
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "plain");
    assert_eq!(entries[0].line, None);
    assert_eq!(entries[1].file, Some("gpu.rs"));
    assert_eq!(entries[1].line, Some(42));
}

#[test]
#[serial]
fn test_bootstrap_logs_adapter_selection() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: Arc::clone(&entries) });

    let provider = MockAdapterProvider::new();
    let engine = Engine::new(&provider, 800, 600, config());
    Engine::reset_logger();
    drop(engine);

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|e| {
        e.source == "nova3d::gpu"
            && e.severity == LogSeverity::Info
            && e.message.contains("Mock Discrete GPU")
            && e.message.contains("D3D_FEATURE_LEVEL_12_1")
    }));
}
