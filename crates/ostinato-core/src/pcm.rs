//! The PCM handle: lifecycle, configuration commit, and dispatch to the
//! back-end operation table.
//!
//! A handle is single-threaded cooperative: it is not safe for
//! simultaneous use from multiple threads, while distinct handles are
//! independent. The only blocking points are the poll descriptor during
//! blocking transfers and `drain`.

use crate::backend::{Backend, BackendSetup, BackendType, HwConfig, PcmInfo};
use crate::error::{Error, Result};
use crate::event::PeriodEvent;
use crate::format::{Access, Format, Subformat};
use crate::hw::{HwParam, HwParams};
use crate::poll::PollDesc;
use crate::state::{State, Status, Stream, Mode};
use crate::sw::{boundary_for, SwParams};
use crate::Frames;
use std::fmt;

/// Geometry latched between a successful `hw_params` and `hw_free`.
pub struct Setup {
    pub access: Access,
    pub format: Format,
    pub subformat: Subformat,
    pub channels: u32,
    pub rate: u32,
    pub rate_num: u32,
    pub rate_den: u32,
    pub msbits: u32,
    pub sample_bits: u32,
    pub frame_bits: u32,
    pub buffer_size: Frames,
    pub period_size: Frames,
    pub period_time: u32,
    pub tick_time: u32,
    pub min_align: Frames,
    pub boundary: Frames,
    pub(crate) sw: SwParams,
    pub(crate) backend_setup: BackendSetup,
}

impl Setup {
    /// A clone of the ring the back-end exported, for back-ends that
    /// re-export a slave's ring.
    pub fn ring_view(&self) -> crate::backend::RingView {
        self.backend_setup.ring.clone()
    }
}

/// A PCM stream handle bound to one back-end.
pub struct Pcm {
    pub(crate) name: String,
    pub(crate) stream: Stream,
    pub(crate) mode: Mode,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) setup: Option<Setup>,
    pub(crate) pending_mmap: Option<(Frames, Frames)>,
    handlers: Vec<Box<dyn FnMut(&PeriodEvent) + Send>>,
    closed: bool,
}

impl Pcm {
    /// Bind a handle to an opened back-end. The stream starts in `OPEN`.
    pub fn new(
        name: impl Into<String>,
        stream: Stream,
        mode: Mode,
        backend: Box<dyn Backend>,
    ) -> Pcm {
        let name = name.into();
        tracing::debug!(name = %name, stream = %stream, "opened PCM handle");
        Pcm {
            name,
            stream,
            mode,
            backend,
            setup: None,
            pending_mmap: None,
            handlers: Vec::new(),
            closed: false,
        }
    }

    // --- identity ---------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend.backend_type()
    }

    pub fn info(&self) -> Result<PcmInfo> {
        self.backend.info()
    }

    /// Toggle non-blocking transfers.
    pub fn set_nonblock(&mut self, nonblock: bool) -> Result<()> {
        self.backend.set_nonblock(nonblock)?;
        self.mode.nonblock = nonblock;
        Ok(())
    }

    /// Access the back-end for downcasts to concrete accessories.
    pub fn backend_any(&self) -> &dyn std::any::Any {
        self.backend.as_any()
    }

    /// Direct access to the back-end operation table, for back-ends
    /// that forward to a cached slave handle without re-validation.
    #[doc(hidden)]
    pub fn backend_ref(&self) -> &dyn Backend {
        &*self.backend
    }

    #[doc(hidden)]
    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        &mut *self.backend
    }

    // --- state & accounting ----------------------------------------

    pub fn state(&self) -> State {
        self.backend.state()
    }

    pub fn status(&self) -> Result<Status> {
        self.backend.status()
    }

    pub fn delay(&self) -> Result<i64> {
        self.setup_ref("delay")?;
        self.backend.delay()
    }

    /// Republish pointers (running pending silencing) and return the
    /// frames available for transfer.
    pub fn avail_update(&self) -> Result<Frames> {
        self.backend.avail_update()
    }

    /// Current application pointer (free-running, modulo boundary).
    pub fn appl_ptr(&self) -> Result<Frames> {
        Ok(self.setup_ref("appl_ptr")?.backend_setup.ring.appl.get())
    }

    /// Current hardware pointer (free-running, modulo boundary).
    pub fn hw_ptr(&self) -> Result<Frames> {
        Ok(self.setup_ref("hw_ptr")?.backend_setup.ring.hw.get())
    }

    pub(crate) fn setup_ref(&self, op: &'static str) -> Result<&Setup> {
        self.setup.as_ref().ok_or(Error::BadState {
            op,
            state: State::Open,
        })
    }

    /// The latched geometry, available between `hw_params` and `hw_free`.
    pub fn setup(&self) -> Option<&Setup> {
        self.setup.as_ref()
    }

    // --- hardware parameter negotiation -----------------------------

    /// The universal space refined by this handle's back-end.
    pub fn hw_params_any(&self) -> Result<HwParams> {
        let mut space = HwParams::any();
        self.hw_refine(&mut space)?;
        Ok(space)
    }

    /// Intersect `space` with the back-end's constraints and tighten the
    /// derived intervals to a fixed point.
    pub fn hw_refine(&self, space: &mut HwParams) -> Result<()> {
        self.backend.hw_refine(space)?;
        space.refine_derived()?;
        Ok(())
    }

    /// `set_near` against this back-end's constraints: collapse `param`
    /// to the admissible value closest to `value`.
    pub fn hw_params_set_near(
        &self,
        space: &mut HwParams,
        param: HwParam,
        value: u32,
        dir: i32,
    ) -> Result<u32> {
        space.set_near_with(param, value, dir, |p| self.hw_refine(p))
    }

    /// Refine, choose a single point, commit it to the back-end, latch
    /// the geometry, and prepare the stream.
    ///
    /// The point is chosen deterministically: access, format, subformat,
    /// then channels, rate, and period time at their minima, buffer size
    /// at its maximum, and tick time at its minimum, re-refining after
    /// each fix.
    pub fn hw_params(&mut self, space: &mut HwParams) -> Result<()> {
        match self.state() {
            State::Open | State::Setup | State::Prepared => {}
            state => return Err(Error::BadState {
                op: "hw_params",
                state,
            }),
        }
        self.hw_refine(space)?;
        self.hw_params_choose(space)?;
        space.collapse_remaining()?;
        let config = HwConfig::from_space(space)?;

        if config.frame_bits != config.channels * config.sample_bits {
            return Err(Error::Invalid("frame_bits != channels * sample_bits"));
        }
        if config.buffer_size % config.period_size != 0 {
            return Err(Error::Invalid("buffer size not a multiple of period size"));
        }

        if self.setup.is_some() {
            self.hw_free()?;
        }

        let backend_setup = self.backend.hw_params(&config)?;
        let sw = SwParams::default_for(config.buffer_size, config.period_size);
        self.backend.sw_params(&sw)?;

        tracing::debug!(
            name = %self.name,
            format = %config.format,
            channels = config.channels,
            rate = config.rate,
            period_size = config.period_size,
            buffer_size = config.buffer_size,
            "hw_params committed"
        );

        self.setup = Some(Setup {
            access: config.access,
            format: config.format,
            subformat: config.subformat,
            channels: config.channels,
            rate: config.rate,
            rate_num: backend_setup.rate_num,
            rate_den: backend_setup.rate_den,
            msbits: backend_setup.msbits,
            sample_bits: config.sample_bits,
            frame_bits: config.frame_bits,
            buffer_size: config.buffer_size,
            period_size: config.period_size,
            period_time: config.period_time,
            tick_time: config.tick_time,
            min_align: backend_setup.min_align,
            boundary: boundary_for(config.buffer_size),
            sw,
            backend_setup,
        });
        self.prepare()
    }

    fn hw_params_choose(&self, space: &mut HwParams) -> Result<()> {
        if !space.mask(HwParam::Access).single() {
            space.mask_mut(HwParam::Access).refine_first()?;
            self.hw_refine(space)?;
        }
        if !space.mask(HwParam::Format).single() {
            space.mask_mut(HwParam::Format).refine_first()?;
            self.hw_refine(space)?;
        }
        if !space.mask(HwParam::Subformat).single() {
            space.mask_mut(HwParam::Subformat).refine_first()?;
            self.hw_refine(space)?;
        }
        for (param, last) in [
            (HwParam::Channels, false),
            (HwParam::Rate, false),
            (HwParam::PeriodTime, false),
            (HwParam::BufferSize, true),
            (HwParam::TickTime, false),
        ] {
            if !space.interval(param).single() {
                if last {
                    space.interval_mut(param).refine_last()?;
                } else {
                    space.interval_mut(param).refine_first()?;
                }
                self.hw_refine(space)?;
            }
        }
        Ok(())
    }

    /// Release the committed configuration. Requires the stream stopped
    /// (state at most `PREPARED`).
    pub fn hw_free(&mut self) -> Result<()> {
        self.setup_ref("hw_free")?;
        let state = self.state();
        if state > State::Prepared {
            return Err(Error::BadState {
                op: "hw_free",
                state,
            });
        }
        self.backend.munmap()?;
        self.backend.hw_free()?;
        self.setup = None;
        self.pending_mmap = None;
        Ok(())
    }

    /// A single-point space reflecting the latched configuration.
    pub fn hw_params_current(&self) -> Result<HwParams> {
        let setup = self.setup_ref("hw_params_current")?;
        let mut space = HwParams::any();
        space.set_access(setup.access)?;
        space.set_format(setup.format)?;
        space.set_subformat(setup.subformat)?;
        space.set(HwParam::Channels, setup.channels)?;
        space.set(HwParam::Rate, setup.rate)?;
        space.set(HwParam::PeriodSize, setup.period_size as u32)?;
        space.set(HwParam::BufferSize, setup.buffer_size as u32)?;
        space.refine_derived()?;
        Ok(space)
    }

    // --- software parameters ---------------------------------------

    /// The currently latched software parameters.
    pub fn sw_params_current(&self) -> Result<SwParams> {
        Ok(self.setup_ref("sw_params_current")?.sw.clone())
    }

    /// Validate and atomically adopt `params`; the back-end is notified
    /// so it can re-schedule wake-ups.
    pub fn sw_params(&mut self, params: &SwParams) -> Result<()> {
        let setup = self.setup_ref("sw_params")?;
        if params.boundary() != setup.boundary {
            return Err(Error::Invalid("sw_params built for another geometry"));
        }
        params.validate(setup.buffer_size, setup.min_align)?;
        self.backend.sw_params(params)?;
        self.setup.as_mut().unwrap().sw = params.clone();
        Ok(())
    }

    // --- lifecycle ops ----------------------------------------------

    pub fn prepare(&mut self) -> Result<()> {
        self.setup_ref("prepare")?;
        self.backend.prepare()
    }

    pub fn start(&mut self) -> Result<()> {
        self.setup_ref("start")?;
        self.backend.start()
    }

    /// Stop immediately, discarding queued frames.
    pub fn drop_frames(&mut self) -> Result<()> {
        self.setup_ref("drop")?;
        self.backend.drop_stream()
    }

    /// Stop preserving queued frames. Playback blocks until the hardware
    /// pointer reaches the application pointer or an xrun occurs; in
    /// non-blocking mode an unfinished drain reports `WouldBlock`.
    pub fn drain(&mut self) -> Result<()> {
        self.setup_ref("drain")?;
        self.backend.drain()?;
        if self.backend.state() != State::Draining {
            return Ok(());
        }
        if self.mode.nonblock {
            return Err(Error::WouldBlock);
        }
        let poll = self.poll_clone("drain")?;
        loop {
            match self.backend.state() {
                State::Draining => {
                    poll.clear();
                    if self.backend.state() != State::Draining {
                        break;
                    }
                    poll.wait(None);
                }
                _ => break,
            }
        }
        Ok(())
    }

    pub fn pause(&mut self, enable: bool) -> Result<()> {
        self.setup_ref("pause")?;
        self.backend.pause(enable)
    }

    /// Move the application pointer so `avail` becomes 0 (playback) or
    /// the whole buffer (capture), without changing state.
    pub fn reset(&mut self) -> Result<()> {
        self.setup_ref("reset")?;
        self.backend.reset()
    }

    /// Move the application pointer back by up to `frames`, clipped to
    /// frames the hardware has not consumed. Returns the displacement.
    pub fn rewind(&mut self, frames: Frames) -> Result<Frames> {
        if frames == 0 {
            return Err(Error::Invalid("rewind of zero frames"));
        }
        self.setup_ref("rewind")?;
        self.backend.rewind(frames)
    }

    // --- linking ----------------------------------------------------

    /// Join this handle's trigger group with `other`'s: linked handles
    /// start, stop, and prepare together.
    pub fn link(&mut self, other: &mut Pcm) -> Result<()> {
        let mine = self
            .backend
            .link_descriptor()
            .ok_or(Error::NotSupported("link"))?;
        let theirs = other
            .backend
            .link_descriptor()
            .ok_or(Error::NotSupported("link"))?;
        mine.join(&theirs)
    }

    /// Leave the linked group.
    pub fn unlink(&mut self) -> Result<()> {
        let mine = self
            .backend
            .link_descriptor()
            .ok_or(Error::NotSupported("link"))?;
        mine.unlink();
        Ok(())
    }

    // --- poll surface ----------------------------------------------

    /// Always exactly one descriptor per handle.
    pub fn poll_descriptors_count(&self) -> usize {
        1
    }

    /// The handle's readiness cell: `POLLOUT`-like for playback,
    /// `POLLIN`-like for capture.
    pub fn poll_handle(&self) -> Result<PollDesc> {
        self.poll_clone("poll_handle")
    }

    pub(crate) fn poll_clone(&self, op: &'static str) -> Result<PollDesc> {
        Ok(self.setup_ref(op)?.backend_setup.ring.poll.clone())
    }

    /// Bounded wait for readiness. Negative `timeout_ms` waits
    /// indefinitely. Returns whether the descriptor fired.
    pub fn wait(&mut self, timeout_ms: i32) -> Result<bool> {
        let poll = self.poll_clone("wait")?;
        let timeout = if timeout_ms < 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(timeout_ms as u64))
        };
        Ok(poll.wait(timeout))
    }

    // --- period events ----------------------------------------------

    /// Register a callback run per elapsed period from
    /// [`dispatch_events`](Self::dispatch_events). Requires the handle
    /// to have been opened with event mode.
    pub fn subscribe_periods(
        &mut self,
        handler: impl FnMut(&PeriodEvent) + Send + 'static,
    ) -> Result<()> {
        if !self.mode.events {
            return Err(Error::Invalid("handle not opened with event mode"));
        }
        self.handlers.push(Box::new(handler));
        Ok(())
    }

    /// Drain pending period events, invoking every subscribed handler
    /// for each. Returns the number of events dispatched.
    pub fn dispatch_events(&mut self) -> usize {
        let Some(setup) = self.setup.as_ref() else {
            return 0;
        };
        let Some(rx) = setup.backend_setup.ring.events.clone() else {
            return 0;
        };
        let mut count = 0;
        for event in rx.try_iter() {
            for handler in self.handlers.iter_mut() {
                handler(&event);
            }
            count += 1;
        }
        count
    }

    // --- area helpers -----------------------------------------------

    /// Areas describing `buf` as an interleaved frame buffer of this
    /// stream's geometry.
    pub fn areas_from_buf(&self, buf: *mut u8) -> Result<Vec<crate::area::ChannelArea>> {
        let setup = self.setup_ref("areas_from_buf")?;
        Ok(crate::area::areas_from_buf(
            buf,
            setup.channels,
            setup.sample_bits,
            setup.frame_bits,
        ))
    }

    /// Areas describing one buffer per channel.
    pub fn areas_from_bufs(&self, bufs: &[*mut u8]) -> Result<Vec<crate::area::ChannelArea>> {
        let setup = self.setup_ref("areas_from_bufs")?;
        if bufs.len() != setup.channels as usize {
            return Err(Error::Invalid("channel buffer count mismatch"));
        }
        Ok(crate::area::areas_from_bufs(bufs, setup.sample_bits))
    }

    // --- unit conversions -------------------------------------------

    pub fn bytes_to_frames(&self, bytes: u64) -> Result<Frames> {
        let setup = self.setup_ref("bytes_to_frames")?;
        let bits = bytes * 8;
        if bits % setup.frame_bits as u64 != 0 {
            return Err(Error::Invalid("byte count not frame aligned"));
        }
        Ok(bits / setup.frame_bits as u64)
    }

    pub fn frames_to_bytes(&self, frames: Frames) -> Result<u64> {
        let setup = self.setup_ref("frames_to_bytes")?;
        let bits = frames * setup.frame_bits as u64;
        if bits % 8 != 0 {
            return Err(Error::Invalid("frame count not byte aligned"));
        }
        Ok(bits / 8)
    }

    pub fn bytes_to_samples(&self, bytes: u64) -> Result<u64> {
        let setup = self.setup_ref("bytes_to_samples")?;
        let bits = bytes * 8;
        if bits % setup.sample_bits as u64 != 0 {
            return Err(Error::Invalid("byte count not sample aligned"));
        }
        Ok(bits / setup.sample_bits as u64)
    }

    pub fn samples_to_bytes(&self, samples: u64) -> Result<u64> {
        let setup = self.setup_ref("samples_to_bytes")?;
        let bits = samples * setup.sample_bits as u64;
        if bits % 8 != 0 {
            return Err(Error::Invalid("sample count not byte aligned"));
        }
        Ok(bits / 8)
    }

    // --- dump -------------------------------------------------------

    /// Write the latched hardware setup in key/value text form.
    pub fn dump_hw_setup(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let Some(setup) = self.setup.as_ref() else {
            return writeln!(out, "(not set up)");
        };
        writeln!(out, "stream       : {}", self.stream.name())?;
        writeln!(out, "access       : {}", setup.access.name())?;
        writeln!(out, "format       : {}", setup.format.name())?;
        writeln!(out, "subformat    : {}", setup.subformat.name())?;
        writeln!(out, "channels     : {}", setup.channels)?;
        writeln!(out, "rate         : {}", setup.rate)?;
        writeln!(
            out,
            "exact rate   : {} ({}/{})",
            setup.rate_num as f64 / setup.rate_den as f64,
            setup.rate_num,
            setup.rate_den
        )?;
        writeln!(out, "msbits       : {}", setup.msbits)?;
        writeln!(out, "buffer_size  : {}", setup.buffer_size)?;
        writeln!(out, "period_size  : {}", setup.period_size)?;
        writeln!(out, "period_time  : {}", setup.period_time)?;
        writeln!(out, "tick_time    : {}", setup.tick_time)
    }

    /// Write the latched software setup.
    pub fn dump_sw_setup(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.setup.as_ref() {
            Some(setup) => setup.sw.dump(out),
            None => writeln!(out, "(not set up)"),
        }
    }

    pub fn dump_setup(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.dump_hw_setup(out)?;
        self.dump_sw_setup(out)
    }

    /// Back-end identification followed by the setup, when present.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.backend.dump(out)?;
        if self.setup.is_some() {
            self.dump_setup(out)?;
        }
        Ok(())
    }

    // --- close ------------------------------------------------------

    /// Close the handle: drain (blocking playback) or drop queued
    /// frames, free the hardware configuration, detach event handlers,
    /// and close the back-end. The first error is reported, but teardown
    /// runs to completion regardless.
    pub fn close(&mut self) -> Result<()> {
        self.close_impl(true)
    }

    fn close_impl(&mut self, drain_queued: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let mut first_err = None;
        if self.setup.is_some() {
            let r = if !drain_queued || self.mode.nonblock || self.stream == Stream::Capture {
                self.drop_frames()
            } else {
                // A stream the drain cannot leave (xrun, already
                // stopped) is dropped instead.
                match self.drain() {
                    Err(Error::BadState { .. }) => self.drop_frames(),
                    other => other,
                }
            };
            if let Err(e) = r {
                if !matches!(e, Error::BadState { .. }) {
                    first_err.get_or_insert(e);
                }
            }
            if let Err(e) = self.hw_free() {
                first_err.get_or_insert(e);
            }
        }
        self.handlers.clear();
        if let Err(e) = self.backend.close() {
            first_err.get_or_insert(e);
        }
        self.closed = true;
        tracing::debug!(name = %self.name, "closed PCM handle");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Pcm {
    fn drop(&mut self) {
        // A drop without an explicit close discards queued frames
        // rather than blocking on a drain nobody can complete.
        if !self.closed {
            if let Err(e) = self.close_impl(false) {
                tracing::warn!(name = %self.name, error = %e, "close failed in drop");
            }
        }
    }
}

impl fmt::Debug for Pcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcm")
            .field("name", &self.name)
            .field("stream", &self.stream)
            .field("backend", &self.backend.backend_type())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bare-bones back-end: stays OPEN, refuses every runtime op, and
    /// surfaces no link descriptor.
    struct StubBackend;

    impl Backend for StubBackend {
        fn backend_type(&self) -> BackendType {
            BackendType::Other("stub")
        }
        fn info(&self) -> Result<PcmInfo> {
            Ok(PcmInfo {
                backend: self.backend_type(),
                id: "stub".into(),
                stream: Stream::Playback,
            })
        }
        fn hw_refine(&self, _space: &mut HwParams) -> Result<()> {
            Ok(())
        }
        fn hw_params(&mut self, _config: &HwConfig) -> Result<BackendSetup> {
            Err(Error::NotSupported("hw_params"))
        }
        fn hw_free(&mut self) -> Result<()> {
            Ok(())
        }
        fn sw_params(&mut self, _sw: &SwParams) -> Result<()> {
            Ok(())
        }
        fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
            writeln!(out, "stub PCM")
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn state(&self) -> State {
            State::Open
        }
        fn status(&self) -> Result<Status> {
            Err(Error::BadState {
                op: "status",
                state: State::Open,
            })
        }
        fn delay(&self) -> Result<i64> {
            Err(Error::BadState {
                op: "delay",
                state: State::Open,
            })
        }
        fn prepare(&mut self) -> Result<()> {
            Err(Error::BadState {
                op: "prepare",
                state: State::Open,
            })
        }
        fn reset(&mut self) -> Result<()> {
            Err(Error::BadState {
                op: "reset",
                state: State::Open,
            })
        }
        fn start(&mut self) -> Result<()> {
            Err(Error::BadState {
                op: "start",
                state: State::Open,
            })
        }
        fn drop_stream(&mut self) -> Result<()> {
            Err(Error::BadState {
                op: "drop",
                state: State::Open,
            })
        }
        fn drain(&mut self) -> Result<()> {
            Err(Error::BadState {
                op: "drain",
                state: State::Open,
            })
        }
        fn pause(&mut self, _enable: bool) -> Result<()> {
            Err(Error::BadState {
                op: "pause",
                state: State::Open,
            })
        }
        fn rewind(&mut self, _frames: Frames) -> Result<Frames> {
            Err(Error::BadState {
                op: "rewind",
                state: State::Open,
            })
        }
        fn avail_update(&self) -> Result<Frames> {
            Err(Error::BadState {
                op: "avail_update",
                state: State::Open,
            })
        }
        fn writei(&mut self, _buf: &[u8], _frames: Frames) -> Result<Frames> {
            Err(Error::NotSupported("writei"))
        }
        fn writen(&mut self, _bufs: &[&[u8]], _offset: Frames, _frames: Frames) -> Result<Frames> {
            Err(Error::NotSupported("writen"))
        }
        fn readi(&mut self, _buf: &mut [u8], _frames: Frames) -> Result<Frames> {
            Err(Error::NotSupported("readi"))
        }
        fn readn(
            &mut self,
            _bufs: &mut [&mut [u8]],
            _offset: Frames,
            _frames: Frames,
        ) -> Result<Frames> {
            Err(Error::NotSupported("readn"))
        }
        fn mmap_commit(&mut self, _offset: Frames, _frames: Frames) -> Result<Frames> {
            Err(Error::NotSupported("mmap_commit"))
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn stub() -> Pcm {
        Pcm::new("stub", Stream::Playback, Mode::BLOCK, Box::new(StubBackend))
    }

    #[test]
    fn test_identity_accessors() {
        let pcm = stub();
        assert_eq!(pcm.name(), "stub");
        assert_eq!(pcm.stream(), Stream::Playback);
        assert_eq!(pcm.state(), State::Open);
        assert_eq!(pcm.backend_type().name(), "stub");
        assert_eq!(pcm.poll_descriptors_count(), 1);
    }

    #[test]
    fn test_link_unsupported_is_enosys() {
        let mut a = stub();
        let mut b = stub();
        let err = a.link(&mut b).unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert_eq!(err.errno(), -38);
        assert!(matches!(a.unlink(), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_ops_before_setup_are_badfd() {
        let mut pcm = stub();
        assert!(matches!(pcm.prepare(), Err(Error::BadState { .. })));
        assert!(matches!(pcm.delay(), Err(Error::BadState { .. })));
        assert!(matches!(pcm.rewind(1), Err(Error::BadState { .. })));
        assert!(matches!(
            pcm.frames_to_bytes(1),
            Err(Error::BadState { .. })
        ));
        assert!(matches!(pcm.wait(0), Err(Error::BadState { .. })));
        let buf = [0u8; 16];
        assert!(matches!(pcm.writei(&buf, 4), Err(Error::BadState { .. })));
    }

    #[test]
    fn test_rewind_zero_is_invalid() {
        let mut pcm = stub();
        assert!(matches!(pcm.rewind(0), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_dump_without_setup() {
        let pcm = stub();
        let mut out = String::new();
        pcm.dump(&mut out).unwrap();
        assert!(out.contains("stub PCM"));
        assert!(!out.contains("buffer_size"));
    }
}
