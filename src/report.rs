//! Textual progress reporting
//!
//! Core components narrate their steps through a `Reporter`. The front end
//! attaches a sink to render them; without one, messages only reach tracing.

use std::fmt;
use std::sync::Arc;
use tracing::info;

type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional progress callback with a quiet switch
#[derive(Clone, Default)]
pub struct Reporter {
    sink: Option<Sink>,
    quiet: bool,
}

impl Reporter {
    /// Reporter forwarding every message to `sink`
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(sink)),
            quiet: false,
        }
    }

    /// Reporter that only logs
    pub fn silent() -> Self {
        Self::default()
    }

    /// Suppress narration; errors still propagate through return values
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Narrate one step
    pub fn step(&self, message: &str) {
        info!("{}", message);
        if self.quiet {
            return;
        }
        if let Some(ref sink) = self.sink {
            sink(message);
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("sink", &self.sink.is_some())
            .field("quiet", &self.quiet)
            .finish()
    }
}
