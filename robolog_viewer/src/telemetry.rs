//! Tracing setup: events go to the console view and optionally to a file.

use crate::console::{ConsoleLevel, SharedConsole};
use anyhow::Context as _;
use robolog_env::ViewerContext;
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Forwards tracing events to the console view.
pub struct ConsoleLayer {
    console: SharedConsole,
    clock: Arc<dyn ViewerContext>,
}

impl ConsoleLayer {
    pub fn new(console: SharedConsole, clock: Arc<dyn ViewerContext>) -> Self {
        Self { console, clock }
    }
}

/// Collects the `message` field and appends the others as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.console.push(
            self.clock.now(),
            ConsoleLevel::from(*event.metadata().level()),
            visitor.finish(),
        );
    }
}

/// Default filter directive: `RUST_LOG` wins when set.
pub fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber.
pub fn init(
    console: SharedConsole,
    clock: Arc<dyn ViewerContext>,
    verbose: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file '{}'", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(ConsoleLayer::new(console, clock))
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(())
}
