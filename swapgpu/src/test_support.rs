/// Shared helpers for unit tests

use std::sync::{Arc, Mutex, PoisonError};
use crate::config::Config;
use crate::context::GpuContext;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::log::{self, LogEntry, Logger};

/// Logger that keeps every entry in memory
#[derive(Clone, Default)]
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    /// Install a fresh capture as the global logger and return a handle on it
    pub fn install() -> Self {
        let capture = Self::default();
        log::set_logger(capture.clone());
        capture
    }

    /// Captured entries whose source starts with `source`
    pub fn entries_from(&self, source: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.source.starts_with(source))
            .cloned()
            .collect()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }
}

/// Context over a mock device, plus the typed mock for inspection
pub fn mock_context_with(device: MockGraphicsDevice) -> (GpuContext, Arc<Mutex<MockGraphicsDevice>>) {
    let mock = Arc::new(Mutex::new(device));
    let config = Config {
        enable_validation: true,
        ..Config::labeled("test")
    };
    let ctx = GpuContext::new(mock.clone(), config);
    (ctx, mock)
}

/// Context over a fully featured mock device
pub fn mock_context() -> (GpuContext, Arc<Mutex<MockGraphicsDevice>>) {
    mock_context_with(MockGraphicsDevice::new())
}

pub const PASSTHROUGH_VERTEX: &str = "attribute vec3 position;\nattribute vec2 uv;\nvarying vec2 vUv;\nvoid main() {\n    vUv = uv;\n    gl_Position = projectionMatrix * viewMatrix * modelMatrix * vec4(position, 1.0);\n}\n";

pub const PASSTHROUGH_FRAGMENT: &str = "varying vec2 vUv;\nuniform sampler2D A;\nuniform float time;\nvoid main() {\n    gl_FragColor = texture2D(A, vUv) + vec4(time);\n}\n";
