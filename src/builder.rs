//! Fluent builder for opening PCM handles.

use crate::registry::{default_registry, Registry};
use ostinato_core::{Mode, Pcm, Result, Stream};
use std::sync::Arc;

/// Builder for a PCM handle.
///
/// # Example
/// ```ignore
/// let pcm = PcmBuilder::playback("null")
///     .nonblock(true)
///     .open()?;
/// ```
pub struct PcmBuilder {
    name: String,
    stream: Stream,
    mode: Mode,
    registry: Option<Arc<Registry>>,
}

impl PcmBuilder {
    /// Open `name` for playback.
    pub fn playback(name: impl Into<String>) -> PcmBuilder {
        PcmBuilder {
            name: name.into(),
            stream: Stream::Playback,
            mode: Mode::BLOCK,
            registry: None,
        }
    }

    /// Open `name` for capture.
    pub fn capture(name: impl Into<String>) -> PcmBuilder {
        PcmBuilder {
            name: name.into(),
            stream: Stream::Capture,
            mode: Mode::BLOCK,
            registry: None,
        }
    }

    /// Transfers never block; they return `WouldBlock` instead.
    pub fn nonblock(mut self, nonblock: bool) -> Self {
        self.mode.nonblock = nonblock;
        self
    }

    /// Publish period-expiry events for
    /// [`dispatch_events`](ostinato_core::pcm::Pcm::dispatch_events).
    pub fn events(mut self, events: bool) -> Self {
        self.mode.events = events;
        self
    }

    /// Resolve through a specific registry instead of the process-wide
    /// default.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn open(self) -> Result<Pcm> {
        match &self.registry {
            Some(registry) => registry.open(&self.name, self.stream, self.mode),
            None => default_registry().open(&self.name, self.stream, self.mode),
        }
    }
}
