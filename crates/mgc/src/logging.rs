//! GC Logging - Collection Event Reporting
//!
//! Centralized logging for heap operations, useful for:
//! - Tuning generation sizes
//! - Debugging lifetime problems in the embedding runtime
//! - Production monitoring
//!
//! Log Levels:
//! - ERROR: allocation failures
//! - INFO: collection start/end
//! - DEBUG: scavenge/tenure decisions, finalizer batches
//! - TRACE: unused today, reserved for per-object reporting

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for GC events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// GC event types
#[derive(Debug, Clone)]
pub enum GcEvent {
    /// A collection was requested on a space
    CollectionStart {
        space: &'static str,
        required: usize,
    },

    /// A collection completed
    CollectionEnd {
        space: &'static str,
        duration_ms: f64,
        objects_evacuated: u64,
        bytes_evacuated: u64,
    },

    /// Live objects scavenged between the semi-spaces
    Scavenge {
        source: &'static str,
        target: &'static str,
    },

    /// Live objects promoted to an older generation
    Tenure {
        source: &'static str,
        target: &'static str,
    },

    /// Finalizers ran for objects that did not survive
    FinalizersRun {
        space: &'static str,
        count: usize,
    },

    /// An allocation could not be satisfied
    AllocationFailure { size: usize, free: usize },
}

/// GC Logger configuration
#[derive(Debug, Clone)]
pub struct GcLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,
}

impl Default for GcLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            json: false,
            timestamps: true,
        }
    }
}

/// GC Logger - centralized logging for heap events
pub struct GcLogger {
    config: GcLoggerConfig,
    events: Mutex<Vec<(Instant, GcEvent)>>,
    enabled: AtomicBool,
}

impl GcLogger {
    /// Create new GC logger
    pub fn new(config: GcLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a GC event
    pub fn log(&self, event: GcEvent) {
        if !self.is_enabled() {
            return;
        }

        if Self::event_level(&event) > self.config.level {
            return;
        }

        self.events.lock().push((Instant::now(), event.clone()));

        if self.config.console {
            self.output_console(&event);
        }
    }

    /// Get log level for event
    fn event_level(event: &GcEvent) -> LogLevel {
        match event {
            GcEvent::AllocationFailure { .. } => LogLevel::Error,
            GcEvent::CollectionStart { .. } | GcEvent::CollectionEnd { .. } => LogLevel::Info,
            GcEvent::Scavenge { .. } | GcEvent::Tenure { .. } | GcEvent::FinalizersRun { .. } => {
                LogLevel::Debug
            },
        }
    }

    /// Output to console
    fn output_console(&self, event: &GcEvent) {
        if self.config.timestamps {
            let now = chrono::Local::now();
            print!("[{}] ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        }

        if self.config.json {
            self.output_json(event);
        } else {
            self.output_human(event);
        }
    }

    /// Output in human-readable format
    fn output_human(&self, event: &GcEvent) {
        match event {
            GcEvent::CollectionStart { space, required } => {
                println!("[GC] Collecting '{}' (need {} bytes)", space, required);
            },
            GcEvent::CollectionEnd {
                space,
                duration_ms,
                objects_evacuated,
                bytes_evacuated,
            } => {
                println!(
                    "[GC] '{}' collected ({:.2}ms, {} objects / {} bytes evacuated)",
                    space, duration_ms, objects_evacuated, bytes_evacuated
                );
            },
            GcEvent::Scavenge { source, target } => {
                println!("[GC] Scavenge '{}' -> '{}'", source, target);
            },
            GcEvent::Tenure { source, target } => {
                println!("[GC] Tenure '{}' -> '{}'", source, target);
            },
            GcEvent::FinalizersRun { space, count } => {
                println!("[GC] Ran {} finalizers in '{}'", count, space);
            },
            GcEvent::AllocationFailure { size, free } => {
                eprintln!(
                    "[GC] Allocation failure: {} bytes requested, {} free",
                    size, free
                );
            },
        }
    }

    /// Output in JSON format
    fn output_json(&self, event: &GcEvent) {
        let json = match event {
            GcEvent::CollectionStart { space, required } => serde_json::json!({
                "type": "collection_start",
                "space": space,
                "required": required
            }),
            GcEvent::CollectionEnd {
                space,
                duration_ms,
                objects_evacuated,
                bytes_evacuated,
            } => serde_json::json!({
                "type": "collection_end",
                "space": space,
                "duration_ms": duration_ms,
                "objects_evacuated": objects_evacuated,
                "bytes_evacuated": bytes_evacuated
            }),
            GcEvent::Scavenge { source, target } => serde_json::json!({
                "type": "scavenge",
                "source": source,
                "target": target
            }),
            GcEvent::Tenure { source, target } => serde_json::json!({
                "type": "tenure",
                "source": source,
                "target": target
            }),
            GcEvent::FinalizersRun { space, count } => serde_json::json!({
                "type": "finalizers_run",
                "space": space,
                "count": count
            }),
            GcEvent::AllocationFailure { size, free } => serde_json::json!({
                "type": "allocation_failure",
                "size": size,
                "free": free
            }),
        };

        if let Ok(json_str) = serde_json::to_string(&json) {
            println!("{}", json_str);
        }
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for GcLogger {
    fn default() -> Self {
        Self::new(GcLoggerConfig::default())
    }
}

/// Global GC logger
lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<GcLogger> = Mutex::new(GcLogger::default());
}

/// Log a GC event to the global logger
pub fn log_event(event: GcEvent) {
    GLOBAL_LOGGER.lock().log(event);
}
