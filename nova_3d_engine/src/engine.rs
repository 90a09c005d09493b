/// Nova3D Engine - application context and the process-wide log sink
///
/// `Engine` is an explicit context owned by the application entry point: it
/// holds the GPU manager and is passed by reference to whatever needs it.
/// Only the logger is process-wide, so every subsystem (and the backend)
/// can emit through the `engine_*!` macros.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Result;
use crate::gpu::{Config, GpuManager};
use crate::graphics_device::AdapterProvider;
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Application context
///
/// # Example
///
/// ```no_run
/// use nova_3d_engine::nova3d::{Config, Engine};
/// # fn provider() -> Box<dyn nova_3d_engine::nova3d::AdapterProvider> { unimplemented!() }
///
/// let mut engine = Engine::new(provider().as_ref(), 1280, 720, Config::default())?;
/// engine.gpu_mut().start_frame()?;
/// engine.gpu_mut().end_frame()?;
/// engine.shutdown()?;
/// # Ok::<(), nova_3d_engine::nova3d::Error>(())
/// ```
pub struct Engine {
    gpu: GpuManager,
}

impl Engine {
    /// Bootstrap the GPU for a window of `width` x `height`
    pub fn new(provider: &dyn AdapterProvider, width: u32, height: u32, config: Config) -> Result<Self> {
        let gpu = GpuManager::new(provider, width, height, config)?;
        crate::engine_info!("nova3d::Engine", "Engine initialized ({}x{})", width, height);
        Ok(Self { gpu })
    }

    /// The GPU manager
    pub fn gpu(&self) -> &GpuManager {
        &self.gpu
    }

    /// The GPU manager, mutably
    pub fn gpu_mut(&mut self) -> &mut GpuManager {
        &mut self.gpu
    }

    /// Flush the GPU and release every GPU object
    pub fn shutdown(&mut self) -> Result<()> {
        self.gpu.shutdown()?;
        crate::engine_info!("nova3d::Engine", "Engine shut down");
        Ok(())
    }

    // ===== LOGGING =====

    /// Replace the process-wide logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nova_3d_engine::nova3d::Engine;
    /// use nova_3d_engine::nova3d::log::LogFacadeLogger;
    ///
    /// Engine::set_logger(LogFacadeLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Emit a log entry without location (used by the engine_* macros)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Emit a log entry with file:line (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
