/// D3D12 debug layer - enables the layer and routes its messages to the engine logger
///
/// Messages are counted per severity in process-wide atomic counters so an
/// application can print a summary at shutdown. Identical messages are only
/// logged the first time and counted afterwards.

use nova_3d_engine::nova3d::log::LogSeverity;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use rustc_hash::FxHashMap;

/// Global validation statistics
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Repeat counts of every message text seen so far
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Counts of debug layer messages, per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub messages: u32,
}

impl ValidationStats {
    /// Total number of messages of every severity
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.messages
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    messages: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            messages: AtomicU32::new(0),
        }
    }

    fn record(&self, severity: LogSeverity) {
        let counter = match severity {
            LogSeverity::Error => &self.errors,
            LogSeverity::Warn => &self.warnings,
            LogSeverity::Info => &self.info,
            LogSeverity::Debug | LogSeverity::Trace => &self.messages,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.messages.store(0, Ordering::Relaxed);
    }
}

/// Current message counts
pub fn validation_stats() -> ValidationStats {
    VALIDATION_STATS.snapshot()
}

/// Clear the counters and the repeat tracker
pub fn reset_validation_stats() {
    VALIDATION_STATS.reset();
    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = None;
    }
}

/// Log a one-line summary of the counters under "nova3d::d3d12::debug"
pub fn log_validation_stats() {
    let stats = validation_stats();
    let severity = if stats.errors > 0 {
        LogSeverity::Warn
    } else {
        LogSeverity::Info
    };
    nova_3d_engine::nova3d::Engine::log(
        severity,
        "nova3d::d3d12::debug",
        format!(
            "Debug layer: {} errors, {} warnings, {} info, {} messages",
            stats.errors, stats.warnings, stats.info, stats.messages
        ),
    );
}

/// Count a message and log it unless the same text was already logged
///
/// Returns how many times the text has been seen, this one included.
pub(crate) fn report_message(severity: LogSeverity, message: &str) -> u32 {
    VALIDATION_STATS.record(severity);

    let seen = match MESSAGE_TRACKER.lock() {
        Ok(mut tracker) => {
            let count = tracker
                .get_or_insert_with(FxHashMap::default)
                .entry(message.to_string())
                .or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 1,
    };

    if seen == 1 {
        nova_3d_engine::nova3d::Engine::log(severity, "nova3d::d3d12::debug", message.to_string());
    }
    seen
}

// ============================================================================
// Native hooks (Windows only)
// ============================================================================

#[cfg(windows)]
pub(crate) use native::*;

#[cfg(windows)]
mod native {
    use nova_3d_engine::nova3d::Error;
    use nova_3d_engine::nova3d::log::LogSeverity;
    use windows::Win32::Graphics::Direct3D12::*;

    /// Turn the debug layer on; must run before any device is created
    pub(crate) fn enable_debug_layer() -> Result<(), Error> {
        let mut debug: Option<ID3D12Debug> = None;
        unsafe { D3D12GetDebugInterface(&mut debug) }.map_err(|e| {
            nova_3d_engine::engine_warn_err!("nova3d::d3d12::debug", "D3D12GetDebugInterface failed: {}", e)
        })?;
        match debug {
            Some(debug) => {
                unsafe { debug.EnableDebugLayer() };
                nova_3d_engine::engine_debug!("nova3d::d3d12::debug", "D3D12 debug layer enabled");
                Ok(())
            }
            None => Err(nova_3d_engine::engine_warn_err!(
                "nova3d::d3d12::debug",
                "D3D12GetDebugInterface returned no interface"
            )),
        }
    }

    /// Map an info-queue severity onto the engine's severities
    pub(crate) fn message_severity(severity: D3D12_MESSAGE_SEVERITY) -> LogSeverity {
        match severity {
            D3D12_MESSAGE_SEVERITY_CORRUPTION | D3D12_MESSAGE_SEVERITY_ERROR => LogSeverity::Error,
            D3D12_MESSAGE_SEVERITY_WARNING => LogSeverity::Warn,
            D3D12_MESSAGE_SEVERITY_INFO => LogSeverity::Info,
            _ => LogSeverity::Debug,
        }
    }

    #[cfg(feature = "d3d12-debug-layer")]
    unsafe extern "system" fn message_callback(
        _category: D3D12_MESSAGE_CATEGORY,
        severity: D3D12_MESSAGE_SEVERITY,
        _id: D3D12_MESSAGE_ID,
        description: windows::core::PCSTR,
        _context: *mut core::ffi::c_void,
    ) {
        if description.is_null() {
            return;
        }
        let message = unsafe { std::ffi::CStr::from_ptr(description.0 as *const _) }.to_string_lossy();
        super::report_message(message_severity(severity), &message);
    }

    /// Register the info-queue callback on `device`
    ///
    /// Returns the callback cookie. Requires a runtime with `ID3D12InfoQueue1`.
    #[cfg(feature = "d3d12-debug-layer")]
    pub(crate) fn install_message_callback(device: &ID3D12Device) -> Option<u32> {
        use windows::core::Interface;

        let info_queue = match device.cast::<ID3D12InfoQueue1>() {
            Ok(queue) => queue,
            Err(e) => {
                nova_3d_engine::engine_warn!(
                    "nova3d::d3d12::debug",
                    "ID3D12InfoQueue1 unavailable, debug messages stay in the debugger output: {}",
                    e
                );
                return None;
            }
        };

        let mut cookie = 0u32;
        let registered = unsafe {
            info_queue.RegisterMessageCallback(
                Some(message_callback),
                D3D12_MESSAGE_CALLBACK_FLAG_NONE,
                std::ptr::null_mut(),
                &mut cookie,
            )
        };
        match registered {
            Ok(()) => {
                nova_3d_engine::engine_debug!("nova3d::d3d12::debug", "Debug message callback registered");
                Some(cookie)
            }
            Err(e) => {
                nova_3d_engine::engine_warn!("nova3d::d3d12::debug", "RegisterMessageCallback failed: {}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "d3d12-debug-layer"))]
    pub(crate) fn install_message_callback(_device: &ID3D12Device) -> Option<u32> {
        None
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
