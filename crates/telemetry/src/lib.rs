use std::io;

use tracing::{info_span, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter, MakeWriter},
    prelude::*,
    EnvFilter,
};

/// Where logs go. Both writers are optional; with neither set only the error layer is installed.
pub struct TelemetryConfig {
    console_writer: Option<BoxMakeWriter>,
    file_writer: Option<Box<dyn io::Write + Send + Sync>>,
    default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            console_writer: None,
            file_writer: None,
            default_filter: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn with_console_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        self.console_writer = Some(BoxMakeWriter::new(writer));
        self
    }

    pub fn with_file_writer<W>(mut self, writer: W) -> Self
    where
        W: io::Write + Send + Sync + 'static,
    {
        self.file_writer = Some(Box::new(writer));
        self
    }

    /// Filter used when `RUST_LOG` isn't set.
    pub fn with_default_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Keeps the non-blocking file writer alive. Logs still buffered are flushed on drop.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn install_error_handler() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install();
}

pub fn install(config: TelemetryConfig) -> TelemetryGuard {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_writer, file_guard) = match config.file_writer {
        Some(writer) => {
            let (writer, guard) = tracing_appender::non_blocking(writer);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(filter_layer)
        .with(file_writer.map(|file_writer| {
            fmt::layer()
                .pretty()
                .with_ansi(false)
                .without_time()
                .with_writer(file_writer)
        }))
        .with(config.console_writer.map(|writer| {
            fmt::layer()
                .compact()
                .with_ansi(true)
                .without_time()
                .with_writer(writer)
        }))
        .try_init();

    TelemetryGuard {
        _file_guard: file_guard,
    }
}

/// Runs `cb` inside a root span, logging the error chain if it fails.
pub fn with_root_span<T, F>(name: &str, description: &str, cb: F) -> color_eyre::Result<T>
where
    F: FnOnce() -> color_eyre::Result<T>,
{
    let span = info_span!("root", command = name, description);
    let result = span.in_scope(cb);

    if let Err(error) = &result {
        tracing::event!(parent: &span, Level::ERROR, "{error:?}");
    }

    result
}
