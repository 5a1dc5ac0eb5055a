//! The back-end dispatch surface.
//!
//! A back-end implements one trait covering the slow configuration ops
//! and the hot transfer ops. The engine stays back-end agnostic: it owns
//! the blocking loop, alignment, and auto-start policy, and asks the
//! back-end only to refine constraints, publish pointers, move frames at
//! the current application position, and drive its own state machine.

use crate::area::ChannelArea;
use crate::error::Result;
use crate::event::PeriodReceiver;
use crate::format::{Access, Format, Subformat};
use crate::hw::HwParams;
use crate::link::LinkHandle;
use crate::poll::{FrameCell, PollDesc};
use crate::state::{State, Status, Stream};
use crate::sw::SwParams;
use crate::Frames;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Introspectable back-end type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Discards playback, synthesises silence on capture.
    Null,
    /// User-space ring with an externally driven clock.
    Loop,
    /// Forwards every op to a cached slave handle.
    Route,
    /// Out-of-tree back-end.
    Other(&'static str),
}

impl BackendType {
    pub fn name(self) -> &'static str {
        match self {
            BackendType::Null => "null",
            BackendType::Loop => "loop",
            BackendType::Route => "route",
            BackendType::Other(name) => name,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable identity of a PCM stream.
#[derive(Debug, Clone)]
pub struct PcmInfo {
    pub backend: BackendType,
    /// Back-end specific identifier.
    pub id: String,
    pub stream: Stream,
}

/// The single configuration point committed by `hw_params`.
#[derive(Debug, Clone)]
pub struct HwConfig {
    pub access: Access,
    pub format: Format,
    pub subformat: Subformat,
    pub channels: u32,
    pub rate: u32,
    pub period_size: Frames,
    pub periods: u32,
    pub buffer_size: Frames,
    pub period_time: u32,
    pub tick_time: u32,
    pub sample_bits: u32,
    pub frame_bits: u32,
}

impl HwConfig {
    /// Extract the committed point from a fully collapsed space.
    pub fn from_space(space: &HwParams) -> Result<HwConfig> {
        use crate::hw::HwParam;
        Ok(HwConfig {
            access: space.get_access()?,
            format: space.get_format()?,
            subformat: space.get_subformat()?,
            channels: space.get(HwParam::Channels)?,
            rate: space.get(HwParam::Rate)?,
            period_size: space.get(HwParam::PeriodSize)? as Frames,
            periods: space.get(HwParam::Periods)?,
            buffer_size: space.get(HwParam::BufferSize)? as Frames,
            period_time: space.get(HwParam::PeriodTime)?,
            tick_time: space.get(HwParam::TickTime)?,
            sample_bits: space.get(HwParam::SampleBits)?,
            frame_bits: space.get(HwParam::FrameBits)?,
        })
    }
}

/// The ring the back-end exports once a configuration is committed.
#[derive(Clone)]
pub struct RingView {
    /// Application pointer cell (written by the engine via the
    /// back-end's commit ops).
    pub appl: Arc<FrameCell>,
    /// Hardware pointer cell (advanced by the back-end).
    pub hw: Arc<FrameCell>,
    /// Channel areas of the running ring.
    pub running: Vec<ChannelArea>,
    /// Areas valid while the stream is stopped, for back-ends that
    /// double-buffer. `None` means the running areas are always valid.
    pub stopped: Option<Vec<ChannelArea>>,
    /// The handle's poll descriptor.
    pub poll: PollDesc,
    /// Period-expiry events, when the handle was opened with event mode.
    pub events: Option<PeriodReceiver>,
    /// Keeps the ring memory the areas point into alive.
    pub mem: Option<Arc<dyn Any + Send + Sync>>,
}

/// Everything the back-end reports from a successful `hw_params`.
pub struct BackendSetup {
    pub ring: RingView,
    /// Exact rate as a fraction; `rate_num / rate_den` frames per second.
    pub rate_num: u32,
    pub rate_den: u32,
    /// Significant bits per sample actually produced.
    pub msbits: u32,
    /// Hardware transfer granule; `xfer_align` must be a multiple.
    pub min_align: Frames,
}

/// Operation table a concrete back-end implements.
///
/// Slow ops may allocate and block; fast ops are hot-path and must not
/// block beyond brief internal locking. `avail_update` is idempotent.
pub trait Backend: Send + Any {
    // --- slow ops ---------------------------------------------------

    fn backend_type(&self) -> BackendType;

    fn info(&self) -> Result<PcmInfo>;

    /// Non-blocking mode changed; back-ends forwarding to a slave
    /// propagate it.
    fn set_nonblock(&mut self, nonblock: bool) -> Result<()> {
        let _ = nonblock;
        Ok(())
    }

    /// Intersect the space with this back-end's constraints. The engine
    /// runs the derived-parameter propagation afterwards.
    fn hw_refine(&self, space: &mut HwParams) -> Result<()>;

    /// Commit a single configuration point and export the ring.
    fn hw_params(&mut self, config: &HwConfig) -> Result<BackendSetup>;

    /// Release the committed configuration and its ring.
    fn hw_free(&mut self) -> Result<()>;

    /// Adopt validated software parameters (wake-up scheduling inputs).
    fn sw_params(&mut self, sw: &SwParams) -> Result<()>;

    /// Back-end specific identification for `dump`.
    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    fn close(&mut self) -> Result<()>;

    // --- fast ops ---------------------------------------------------

    fn state(&self) -> State;

    fn status(&self) -> Result<Status>;

    /// Frames queued to (playback) or held by (capture) the hardware.
    fn delay(&self) -> Result<i64>;

    fn prepare(&mut self) -> Result<()>;

    /// Move the application pointer so `avail` becomes 0 (playback) or
    /// `buffer_size` (capture) without changing state.
    fn reset(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    /// Stop immediately, discarding queued frames.
    fn drop_stream(&mut self) -> Result<()>;

    /// Stop after queued frames have played (playback) or permit
    /// retrieval of the residue (capture). Never blocks; the engine
    /// waits on the poll descriptor when blocking semantics are wanted.
    fn drain(&mut self) -> Result<()>;

    fn pause(&mut self, enable: bool) -> Result<()>;

    /// Move the application pointer back by up to `frames`, clipped to
    /// what the hardware has not consumed. Returns the displacement.
    fn rewind(&mut self, frames: Frames) -> Result<Frames>;

    /// Republish pointers, run pending silencing, and return `avail`.
    fn avail_update(&self) -> Result<Frames>;

    /// Copy `frames` interleaved frames at the application position and
    /// advance it. The caller guarantees `frames <= avail`.
    fn writei(&mut self, buf: &[u8], frames: Frames) -> Result<Frames>;

    fn writen(&mut self, bufs: &[&[u8]], offset: Frames, frames: Frames) -> Result<Frames>;

    fn readi(&mut self, buf: &mut [u8], frames: Frames) -> Result<Frames>;

    fn readn(&mut self, bufs: &mut [&mut [u8]], offset: Frames, frames: Frames) -> Result<Frames>;

    /// Advance the application pointer after a direct window access.
    fn mmap_commit(&mut self, offset: Frames, frames: Frames) -> Result<Frames>;

    /// Tear down the exported ring mapping.
    fn munmap(&mut self) -> Result<()> {
        Ok(())
    }

    /// The stream's link descriptor, when the back-end can join a
    /// trigger group.
    fn link_descriptor(&self) -> Option<LinkHandle> {
        None
    }

    /// Downcast support for back-end specific accessories.
    fn as_any(&self) -> &dyn Any;
}
