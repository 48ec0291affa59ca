//! Structured logging.
//!
//! Everything in the crate logs through `tracing`. The subscriber is
//! installed at most once per process, from [`LoggingPlugin`], the CLI or
//! the C bridge, whichever comes first. `RUST_LOG` overrides the configured
//! filter when set.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

pub struct LoggingPlugin;

impl Plugin for LoggingPlugin {
    fn build(&self, _app: &mut App) {
        init_tracing_default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Numeric level used across the C ABI; unknown ids map to `Info`.
    pub fn from_id(id: u32) -> Self {
        match id {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Subscriber settings. The generator's own modules get their own
/// directives so a host can quieten the bridge while tracing generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub level: LogLevel,
    pub generation: LogLevel,
    pub builder: LogLevel,
    pub engine: LogLevel,
    pub bridge: LogLevel,
    pub show_targets: bool,
    pub show_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            generation: LogLevel::Info,
            builder: LogLevel::Info,
            engine: LogLevel::Info,
            bridge: LogLevel::Warn,
            show_targets: true,
            show_thread_ids: false,
        }
    }
}

impl TracingConfig {
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// `EnvFilter` directives, global level first.
    pub fn filter_directives(&self) -> String {
        format!(
            "{},dungeon_core::generation={},dungeon_core::builder={},dungeon_core::engine={},dungeon_core::bridge={}",
            self.level.directive(),
            self.generation.directive(),
            self.builder.directive(),
            self.engine.directive(),
            self.bridge.directive(),
        )
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static ACTIVE: OnceLock<TracingConfig> = OnceLock::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Installs the global subscriber. Later calls keep the first config.
pub fn init_tracing(config: &TracingConfig) {
    ACTIVE.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .compact();
        // the host may already own the global subscriber
        let _ = subscriber.try_init();
        config.clone()
    });
}

/// Routes a host-side message into the crate's subscriber under `system`.
pub fn log_host_message(level: LogLevel, system: &str, message: &str) {
    match level {
        LogLevel::Trace | LogLevel::Debug => {
            tracing::debug!(target: "dungeon_core::host", system, "{}", message)
        }
        LogLevel::Info => tracing::info!(target: "dungeon_core::host", system, "{}", message),
        LogLevel::Warn => tracing::warn!(target: "dungeon_core::host", system, "{}", message),
        LogLevel::Error => tracing::error!(target: "dungeon_core::host", system, "{}", message),
    }
}

/// Entered `operation` span; closes when dropped.
pub struct TimingSpan {
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        let span = tracing::info_span!("operation", name = name);
        Self {
            _span: span.entered(),
        }
    }
}

/// What the process is logging with right now
#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingSnapshot {
    pub installed: bool,
    pub filter: String,
    pub config: TracingConfig,
}

impl LoggingSnapshot {
    pub fn capture() -> Self {
        let config = ACTIVE.get().cloned();
        let installed = config.is_some();
        let config = config.unwrap_or_default();
        Self {
            installed,
            filter: config.filter_directives(),
            config,
        }
    }
}
