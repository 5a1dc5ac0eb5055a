//! Stream enumerations and the PCM state machine.

use crate::error::{Error, Result};
use crate::Frames;
use std::fmt;
use std::time::Duration;

/// Stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Playback,
    Capture,
}

impl Stream {
    pub fn name(self) -> &'static str {
        match self {
            Stream::Playback => "PLAYBACK",
            Stream::Capture => "CAPTURE",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// PCM stream state.
///
/// State transitions:
/// ```text
/// OPEN → SETUP → PREPARED → RUNNING ↔ PAUSED
///                    ↑          ↓
///                    └── XRUN / DRAINING → SETUP
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Open,
    Setup,
    Prepared,
    Running,
    Xrun,
    Draining,
    Paused,
    Suspended,
}

impl State {
    pub fn name(self) -> &'static str {
        match self {
            State::Open => "OPEN",
            State::Setup => "SETUP",
            State::Prepared => "PREPARED",
            State::Running => "RUNNING",
            State::Xrun => "XRUN",
            State::Draining => "DRAINING",
            State::Paused => "PAUSED",
            State::Suspended => "SUSPENDED",
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, State::Running | State::Draining)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOp {
    Prepare,
    Start,
    Stop,
    Drain,
    PauseOn,
    PauseOff,
    Reset,
}

impl StreamOp {
    pub fn name(self) -> &'static str {
        match self {
            StreamOp::Prepare => "prepare",
            StreamOp::Start => "start",
            StreamOp::Stop => "stop",
            StreamOp::Drain => "drain",
            StreamOp::PauseOn => "pause",
            StreamOp::PauseOff => "resume",
            StreamOp::Reset => "reset",
        }
    }
}

/// Compute the state an operation leads to, or reject it.
///
/// This is the single source of truth for transition legality; back-ends
/// consult it before mutating their runtime state. `Drain` from `Running`
/// is the only direction-dependent edge: playback enters `Draining` and
/// waits for the hardware pointer, capture stops retrieval immediately.
/// `Reset` adjusts the application pointer without leaving the current
/// state.
pub fn transition(from: State, op: StreamOp, stream: Stream) -> Result<State> {
    use State::*;
    use StreamOp::*;

    let to = match (from, op) {
        (Setup, Prepare) | (Prepared, Prepare) | (Xrun, Prepare) => Prepared,

        (Prepared, Start) => Running,

        (Prepared, Stop)
        | (Running, Stop)
        | (Draining, Stop)
        | (Paused, Stop)
        | (Xrun, Stop) => Setup,

        (Prepared, Drain) => Setup,
        (Running, Drain) => match stream {
            Stream::Playback => Draining,
            Stream::Capture => Setup,
        },
        // Already draining: the operation keeps waiting.
        (Draining, Drain) => Draining,

        (Running, PauseOn) | (Draining, PauseOn) => Paused,
        (Paused, PauseOff) => Running,

        (Prepared, Reset) | (Running, Reset) | (Draining, Reset) | (Paused, Reset)
        | (Xrun, Reset) => from,

        _ => {
            return Err(Error::BadState {
                op: op.name(),
                state: from,
            })
        }
    };
    Ok(to)
}

/// Open-mode flags for a PCM handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    /// Transfers and drain never block; they return `WouldBlock` instead.
    pub nonblock: bool,
    /// The back-end publishes period-expiry events for the dispatcher.
    pub events: bool,
}

impl Mode {
    pub const BLOCK: Mode = Mode {
        nonblock: false,
        events: false,
    };
    pub const NONBLOCK: Mode = Mode {
        nonblock: true,
        events: false,
    };
}

/// Timestamp mode for status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TstampMode {
    #[default]
    None,
    Mmap,
}

impl TstampMode {
    pub fn name(self) -> &'static str {
        match self {
            TstampMode::None => "none",
            TstampMode::Mmap => "mmap",
        }
    }
}

/// Deprecated start-mode alias; maps onto `start_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// `start_threshold = boundary`: only an explicit `start` triggers.
    Explicit,
    /// `start_threshold = 1`: the first queued frame triggers.
    #[default]
    Data,
}

impl StartMode {
    pub fn name(self) -> &'static str {
        match self {
            StartMode::Explicit => "explicit",
            StartMode::Data => "data",
        }
    }
}

/// Deprecated xrun-mode alias; maps onto `stop_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrunMode {
    /// `stop_threshold = boundary`: xruns are ignored.
    None,
    /// `stop_threshold = buffer_size`: an xrun stops the stream.
    #[default]
    Stop,
}

impl XrunMode {
    pub fn name(self) -> &'static str {
        match self {
            XrunMode::None => "none",
            XrunMode::Stop => "stop",
        }
    }
}

/// Immutable runtime snapshot of a PCM stream.
#[derive(Debug, Clone)]
pub struct Status {
    pub state: State,
    /// Time of the last start/stop trigger, relative to the stream epoch.
    pub trigger_tstamp: Duration,
    /// Time the snapshot was taken, relative to the stream epoch.
    pub tstamp: Duration,
    /// Frames queued to (playback) or held by (capture) the hardware.
    pub delay: i64,
    /// Frames the application may transfer next.
    pub avail: Frames,
    /// Maximum `avail` observed since the last status query.
    pub avail_max: Frames,
}

impl Status {
    /// Write the snapshot in the conventional key/value text layout.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "state       : {}", self.state.name())?;
        writeln!(
            out,
            "trigger_time: {}.{:06}",
            self.trigger_tstamp.as_secs(),
            self.trigger_tstamp.subsec_micros()
        )?;
        writeln!(
            out,
            "tstamp      : {}.{:06}",
            self.tstamp.as_secs(),
            self.tstamp.subsec_micros()
        )?;
        writeln!(out, "delay       : {}", self.delay)?;
        writeln!(out, "avail       : {}", self.avail)?;
        writeln!(out, "avail_max   : {}", self.avail_max)
    }
}
