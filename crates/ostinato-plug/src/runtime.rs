//! Shared stream runtime for the in-process back-ends.
//!
//! Owns the ring memory, the state machine, the free-running pointers,
//! xrun detection, playback silencing, period events, poll readiness,
//! and linked-group membership. The `null` and `loop` back-ends are the
//! same runtime with different hardware clocks: `null` snaps the
//! hardware pointer to the application pointer, `loop` advances it only
//! when the embedder ticks the clock.

use ostinato_core::area::{areas_copy, areas_from_buf, areas_from_bufs, areas_silence};
use ostinato_core::backend::{Backend, BackendSetup, BackendType, HwConfig, PcmInfo, RingView};
use ostinato_core::error::{Error, Result};
use ostinato_core::event::{period_channel, PeriodSender};
use ostinato_core::link::{LinkGroup, LinkHandle, Linkable};
use ostinato_core::poll::{FrameCell, PollDesc, PollEvent};
use ostinato_core::state::{transition, State, Status, Stream, StreamOp};
use ostinato_core::sw::SwParams;
use ostinato_core::{Access, ChannelArea, Format, Frames, HwParams};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

const PERIOD_EVENT_QUEUE: usize = 64;

/// Backing store of a ring. Shared with the engine through raw channel
/// areas; all mutation goes through the area primitives.
pub(crate) struct RingMem {
    data: Box<[UnsafeCell<u8>]>,
}

// The runtime serialises all area access under the stream lock; the
// engine side owns its window exclusively between begin and commit.
unsafe impl Send for RingMem {}
unsafe impl Sync for RingMem {}

impl RingMem {
    fn new(bytes: usize) -> Arc<RingMem> {
        Arc::new(RingMem {
            data: (0..bytes).map(|_| UnsafeCell::new(0)).collect(),
        })
    }

    fn ptr(&self) -> *mut u8 {
        self.data.as_ptr() as *mut u8
    }
}

/// Geometry owned by the back-end between hw_params and hw_free. The
/// ring memory is kept here so the areas stay valid for the clock even
/// if the engine drops its view first.
struct Geom {
    format: Format,
    channels: u32,
    sample_bits: u32,
    frame_bits: u32,
    buffer_size: Frames,
    period_size: Frames,
    boundary: Frames,
    #[allow(dead_code)]
    mem: Arc<RingMem>,
    areas: Vec<ChannelArea>,
}

struct Rt {
    st: State,
    geom: Option<Geom>,
    sw: Option<SwParams>,
    trigger_at: Duration,
    avail_max: Frames,
    /// Frames ahead of the application pointer already silenced.
    silenced_ahead: Frames,
    /// Frames accumulated toward the next period event.
    period_acc: Frames,
    events_tx: Option<PeriodSender>,
}

/// State shared between a back-end, its clock, and its link group.
pub(crate) struct StreamShared {
    stream: Stream,
    /// Hardware pointer snaps to the application pointer (null sink).
    instant_hw: bool,
    appl: Arc<FrameCell>,
    hw: Arc<FrameCell>,
    poll: PollDesc,
    rt: Mutex<Rt>,
    link: Mutex<Option<Arc<LinkGroup>>>,
    epoch: Instant,
}

fn fdist(a: Frames, b: Frames, boundary: Frames) -> Frames {
    (a + boundary - b % boundary) % boundary
}

impl StreamShared {
    pub(crate) fn new(stream: Stream, instant_hw: bool) -> Arc<StreamShared> {
        let event = match stream {
            Stream::Playback => PollEvent::Out,
            Stream::Capture => PollEvent::In,
        };
        let shared = Arc::new_cyclic(|weak: &Weak<StreamShared>| {
            let as_linkable: Weak<dyn Linkable> = weak.clone();
            StreamShared {
                stream,
                instant_hw,
                appl: Arc::new(FrameCell::new(0)),
                hw: Arc::new(FrameCell::new(0)),
                poll: PollDesc::new(event),
                rt: Mutex::new(Rt {
                    st: State::Open,
                    geom: None,
                    sw: None,
                    trigger_at: Duration::ZERO,
                    avail_max: 0,
                    silenced_ahead: 0,
                    period_acc: 0,
                    events_tx: None,
                }),
                link: Mutex::new(Some(LinkGroup::singleton(as_linkable))),
                epoch: Instant::now(),
            }
        });
        shared
    }

    // --- configuration ----------------------------------------------

    pub(crate) fn configure(&self, config: &HwConfig, events: bool) -> Result<BackendSetup> {
        let noninterleaved = matches!(
            config.access,
            Access::MmapNoninterleaved | Access::RwNoninterleaved
        );
        let (mem, areas) = if noninterleaved {
            let chan_bits = config.buffer_size * config.sample_bits as u64;
            let chan_bytes = chan_bits.div_ceil(8) as usize;
            let mem = RingMem::new(chan_bytes * config.channels as usize);
            let bufs: Vec<*mut u8> = (0..config.channels as usize)
                .map(|c| unsafe { mem.ptr().add(c * chan_bytes) })
                .collect();
            let areas = areas_from_bufs(&bufs, config.sample_bits);
            (mem, areas)
        } else {
            let bits = config.buffer_size * config.frame_bits as u64;
            let mem = RingMem::new(bits.div_ceil(8) as usize);
            let areas = areas_from_buf(
                mem.ptr(),
                config.channels,
                config.sample_bits,
                config.frame_bits,
            );
            (mem, areas)
        };
        areas_silence(&areas, 0, config.buffer_size, config.format)?;

        let boundary = ostinato_core::boundary_for(config.buffer_size);
        let (events_tx, events_rx) = if events {
            let (tx, rx) = period_channel(PERIOD_EVENT_QUEUE);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let mut rt = self.rt.lock();
        rt.geom = Some(Geom {
            format: config.format,
            channels: config.channels,
            sample_bits: config.sample_bits,
            frame_bits: config.frame_bits,
            buffer_size: config.buffer_size,
            period_size: config.period_size,
            boundary,
            mem: mem.clone(),
            areas: areas.clone(),
        });
        rt.st = State::Setup;
        rt.events_tx = events_tx;
        rt.avail_max = 0;
        rt.silenced_ahead = 0;
        rt.period_acc = 0;
        self.appl.set(0);
        self.hw.set(0);
        self.update_ready(&rt);

        Ok(BackendSetup {
            ring: RingView {
                appl: self.appl.clone(),
                hw: self.hw.clone(),
                running: areas,
                stopped: None,
                poll: self.poll.clone(),
                events: events_rx,
                mem: Some(mem as Arc<dyn std::any::Any + Send + Sync>),
            },
            rate_num: config.rate,
            rate_den: 1,
            msbits: config.format.width().unwrap_or(config.sample_bits),
            min_align: 1,
        })
    }

    pub(crate) fn release(&self) {
        let mut rt = self.rt.lock();
        rt.geom = None;
        rt.sw = None;
        rt.events_tx = None;
        rt.st = State::Open;
        self.poll.set_ready();
    }

    pub(crate) fn set_sw(&self, sw: &SwParams) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.sw = Some(sw.clone());
        self.update_ready(&rt);
        Ok(())
    }

    // --- accounting -------------------------------------------------

    fn avail_of(&self, rt: &Rt) -> Frames {
        let Some(geom) = rt.geom.as_ref() else {
            return 0;
        };
        let appl = self.appl.get();
        let hw = self.hw.get();
        match self.stream {
            Stream::Playback => fdist(hw + geom.buffer_size, appl, geom.boundary),
            Stream::Capture => fdist(hw, appl, geom.boundary),
        }
    }

    fn delay_of(&self, rt: &Rt) -> i64 {
        let Some(geom) = rt.geom.as_ref() else {
            return 0;
        };
        let appl = self.appl.get();
        let hw = self.hw.get();
        let d = match self.stream {
            Stream::Playback => fdist(appl, hw, geom.boundary),
            Stream::Capture => fdist(hw, appl, geom.boundary),
        };
        // A distance past the half-boundary is a wrapped negative.
        if d > geom.boundary / 2 {
            d as i64 - geom.boundary as i64
        } else {
            d as i64
        }
    }

    fn avail_min_of(rt: &Rt) -> Frames {
        rt.sw.as_ref().map(|s| s.avail_min).unwrap_or(1)
    }

    fn stop_threshold_of(rt: &Rt) -> Frames {
        match (rt.sw.as_ref(), rt.geom.as_ref()) {
            (Some(sw), _) => sw.stop_threshold,
            (None, Some(geom)) => geom.buffer_size,
            (None, None) => Frames::MAX,
        }
    }

    fn update_ready(&self, rt: &Rt) {
        let ready = match rt.st {
            // Wake waiters so they observe the terminal state.
            State::Xrun | State::Setup => true,
            State::Prepared | State::Running | State::Draining => {
                self.avail_of(rt) >= Self::avail_min_of(rt)
            }
            _ => false,
        };
        if ready {
            self.poll.set_ready();
        } else {
            self.poll.clear();
        }
    }

    pub(crate) fn state(&self) -> State {
        self.rt.lock().st
    }

    pub(crate) fn status(&self) -> Result<Status> {
        let mut rt = self.rt.lock();
        let avail = self.avail_of(&rt);
        let status = Status {
            state: rt.st,
            trigger_tstamp: rt.trigger_at,
            tstamp: self.epoch.elapsed(),
            delay: self.delay_of(&rt),
            avail,
            avail_max: rt.avail_max.max(avail),
        };
        rt.avail_max = 0;
        Ok(status)
    }

    pub(crate) fn delay(&self) -> Result<i64> {
        let rt = self.rt.lock();
        if rt.geom.is_none() {
            return Err(Error::BadState {
                op: "delay",
                state: rt.st,
            });
        }
        Ok(self.delay_of(&rt))
    }

    pub(crate) fn avail_update(&self) -> Result<Frames> {
        let mut rt = self.rt.lock();
        if rt.geom.is_none() {
            return Err(Error::BadState {
                op: "avail_update",
                state: rt.st,
            });
        }
        if rt.st == State::Xrun {
            return Err(Error::xrun(self.stream));
        }
        if self.instant_hw {
            self.snap_hw(&rt);
        }
        self.silence_update(&mut rt)?;
        let avail = self.avail_of(&rt);
        rt.avail_max = rt.avail_max.max(avail);
        self.update_ready(&rt);
        Ok(avail)
    }

    /// Null-clock semantics: the hardware consumes (or produces)
    /// instantly, so a full buffer is always available.
    fn snap_hw(&self, rt: &Rt) {
        let Some(geom) = rt.geom.as_ref() else { return };
        let appl = self.appl.get();
        match self.stream {
            Stream::Playback => self.hw.set(appl),
            Stream::Capture => self.hw.set((appl + geom.buffer_size) % geom.boundary),
        }
    }

    // --- state machine ----------------------------------------------

    fn group(&self) -> Arc<LinkGroup> {
        self.link.lock().clone().expect("link group initialised")
    }

    pub(crate) fn link_handle(self: &Arc<Self>) -> LinkHandle {
        LinkHandle::new(self.clone() as Arc<dyn Linkable>)
    }

    pub(crate) fn prepare(&self) -> Result<()> {
        self.group().trigger(|m| m.local_prepare())
    }

    pub(crate) fn start(&self) -> Result<()> {
        self.group().trigger(|m| m.local_start())
    }

    pub(crate) fn stop(&self) -> Result<()> {
        self.group().trigger(|m| m.local_stop())
    }

    fn do_prepare(&self) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.st = transition(rt.st, StreamOp::Prepare, self.stream)?;
        let Some(geom) = rt.geom.as_ref() else {
            return Err(Error::BadState {
                op: "prepare",
                state: rt.st,
            });
        };
        areas_silence(&geom.areas, 0, geom.buffer_size, geom.format)?;
        self.appl.set(0);
        self.hw.set(0);
        rt.silenced_ahead = 0;
        rt.period_acc = 0;
        rt.avail_max = 0;
        if self.instant_hw {
            self.snap_hw(&rt);
        }
        self.update_ready(&rt);
        Ok(())
    }

    fn do_start(&self) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.st = transition(rt.st, StreamOp::Start, self.stream)?;
        rt.trigger_at = self.epoch.elapsed();
        self.update_ready(&rt);
        Ok(())
    }

    fn do_stop(&self) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.st = transition(rt.st, StreamOp::Stop, self.stream)?;
        rt.trigger_at = self.epoch.elapsed();
        self.update_ready(&rt);
        Ok(())
    }

    pub(crate) fn drain(&self) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.st = transition(rt.st, StreamOp::Drain, self.stream)?;
        if rt.st == State::Draining {
            // Nothing queued: the drain is already complete.
            let queued = fdist(
                self.appl.get(),
                self.hw.get(),
                rt.geom.as_ref().map(|g| g.boundary).unwrap_or(1),
            );
            if queued == 0 || self.instant_hw {
                rt.st = State::Setup;
            }
        }
        rt.trigger_at = self.epoch.elapsed();
        self.update_ready(&rt);
        Ok(())
    }

    pub(crate) fn pause(&self, enable: bool) -> Result<()> {
        let mut rt = self.rt.lock();
        let op = if enable {
            StreamOp::PauseOn
        } else {
            StreamOp::PauseOff
        };
        rt.st = transition(rt.st, op, self.stream)?;
        rt.trigger_at = self.epoch.elapsed();
        self.update_ready(&rt);
        Ok(())
    }

    pub(crate) fn reset(&self) -> Result<()> {
        let mut rt = self.rt.lock();
        rt.st = transition(rt.st, StreamOp::Reset, self.stream)?;
        // Drop the queue (playback) or the backlog (capture).
        self.appl.set(self.hw.get());
        rt.silenced_ahead = 0;
        self.update_ready(&rt);
        Ok(())
    }

    pub(crate) fn rewind(&self, frames: Frames) -> Result<Frames> {
        let mut rt = self.rt.lock();
        let Some(geom) = rt.geom.as_ref() else {
            return Err(Error::BadState {
                op: "rewind",
                state: rt.st,
            });
        };
        let (boundary, buffer_size) = (geom.boundary, geom.buffer_size);
        let avail = self.avail_of(&rt);
        let rewindable = buffer_size.saturating_sub(avail);
        let clipped = frames.min(rewindable);
        if clipped > 0 {
            let appl = self.appl.get();
            self.appl.set((appl + boundary - clipped) % boundary);
            // The silenced run keeps its ring position; it now lies
            // further ahead of the pointer.
            rt.silenced_ahead = (rt.silenced_ahead + clipped).min(buffer_size);
            self.update_ready(&rt);
        }
        Ok(clipped)
    }

    // --- clock ------------------------------------------------------

    /// Advance the simulated hardware by `frames`. Returns the frames
    /// actually consumed/produced (draining clamps to the queue).
    pub(crate) fn clock_advance(&self, frames: Frames) -> Frames {
        let mut rt = self.rt.lock();
        if !matches!(rt.st, State::Running | State::Draining) {
            return 0;
        }
        let Some(geom) = rt.geom.as_ref() else { return 0 };
        let boundary = geom.boundary;
        let buffer_size = geom.buffer_size;
        let period_size = geom.period_size;
        let format = geom.format;
        let areas = geom.areas.clone();

        let appl = self.appl.get();
        let hw = self.hw.get();
        let advanced;
        match self.stream {
            Stream::Playback => {
                let queued = fdist(appl, hw, boundary);
                if rt.st == State::Draining {
                    advanced = frames.min(queued);
                    self.hw.set((hw + advanced) % boundary);
                    if advanced == queued {
                        rt.st = State::Setup;
                        rt.trigger_at = self.epoch.elapsed();
                    }
                } else {
                    advanced = frames;
                    self.hw.set((hw + advanced) % boundary);
                }
            }
            Stream::Capture => {
                advanced = frames;
                // New frames materialise in the ring as silence.
                let fill = advanced.min(buffer_size);
                let from = (hw + advanced - fill) % boundary;
                let off = from % buffer_size;
                let cont = (buffer_size - off).min(fill);
                let _ = areas_silence(&areas, off, cont, format);
                if fill > cont {
                    let _ = areas_silence(&areas, 0, fill - cont, format);
                }
                self.hw.set((hw + advanced) % boundary);
            }
        }

        // Consumed silence is no longer ahead of the write position.
        rt.silenced_ahead = rt.silenced_ahead.saturating_sub(advanced);

        let avail = self.avail_of(&rt);
        rt.avail_max = rt.avail_max.max(avail);
        if matches!(rt.st, State::Running | State::Draining) && avail >= Self::stop_threshold_of(&rt)
        {
            rt.st = State::Xrun;
            rt.trigger_at = self.epoch.elapsed();
            tracing::debug!(stream = %self.stream, "xrun detected");
        }

        if matches!(rt.st, State::Running | State::Draining) {
            rt.period_acc += advanced;
            while rt.period_acc >= period_size {
                rt.period_acc -= period_size;
                if let Some(tx) = rt.events_tx.as_ref() {
                    let _ = tx.try_send(ostinato_core::PeriodEvent {
                        hw_ptr: self.hw.get(),
                    });
                }
            }
        }

        self.update_ready(&rt);
        advanced
    }

    // --- transfers --------------------------------------------------

    /// Advance the application pointer by `frames` and run silencing.
    pub(crate) fn commit_appl(&self, frames: Frames) -> Result<Frames> {
        let mut rt = self.rt.lock();
        let Some(geom) = rt.geom.as_ref() else {
            return Err(Error::BadState {
                op: "mmap_commit",
                state: rt.st,
            });
        };
        let boundary = geom.boundary;
        self.appl.set((self.appl.get() + frames) % boundary);
        rt.silenced_ahead = rt.silenced_ahead.saturating_sub(frames);
        if self.instant_hw {
            self.snap_hw(&rt);
        }
        self.silence_update(&mut rt)?;
        self.update_ready(&rt);
        Ok(frames)
    }

    /// Pre-zero up to `silence_size` frames ahead of the application
    /// pointer once the queue is at or below `silence_threshold`,
    /// remembering what is already silenced.
    fn silence_update(&self, rt: &mut Rt) -> Result<()> {
        if self.stream != Stream::Playback {
            return Ok(());
        }
        let Some(sw) = rt.sw.as_ref() else {
            return Ok(());
        };
        if sw.silence_size == 0 {
            return Ok(());
        }
        let (silence_threshold, silence_size) = (sw.silence_threshold, sw.silence_size);
        let Some(geom) = rt.geom.as_ref() else {
            return Ok(());
        };
        let appl = self.appl.get();
        let hw = self.hw.get();
        let queued = fdist(appl, hw, geom.boundary);
        if queued > silence_threshold {
            return Ok(());
        }
        let free = geom.buffer_size.saturating_sub(queued);
        let want = silence_size.min(free);
        if want <= rt.silenced_ahead {
            return Ok(());
        }
        let n = want - rt.silenced_ahead;
        let start = (appl + rt.silenced_ahead) % geom.buffer_size;
        let cont = (geom.buffer_size - start).min(n);
        areas_silence(&geom.areas, start, cont, geom.format)?;
        if n > cont {
            areas_silence(&geom.areas, 0, n - cont, geom.format)?;
        }
        rt.silenced_ahead = want;
        Ok(())
    }

    /// Copy interleaved user frames into the ring at the application
    /// position (playback) or out of it (capture).
    pub(crate) fn xfer_interleaved(&self, buf: *mut u8, frames: Frames, write: bool) -> Result<Frames> {
        let (areas, user, off, cont, format) = {
            let rt = self.rt.lock();
            let Some(geom) = rt.geom.as_ref() else {
                return Err(Error::BadState {
                    op: "transfer",
                    state: rt.st,
                });
            };
            let user = areas_from_buf(buf, geom.channels, geom.sample_bits, geom.frame_bits);
            let off = self.appl.get() % geom.buffer_size;
            let cont = (geom.buffer_size - off).min(frames);
            (geom.areas.clone(), user, off, cont, geom.format)
        };
        self.copy_chunks(&areas, &user, off, cont, frames, format, write)?;
        self.commit_appl(frames)
    }

    /// The non-interleaved variant: one user buffer per channel, with a
    /// per-channel frame offset into the user buffers.
    pub(crate) fn xfer_channels(
        &self,
        bufs: &[*mut u8],
        user_offset: Frames,
        frames: Frames,
        write: bool,
    ) -> Result<Frames> {
        let (areas, user, off, cont, format) = {
            let rt = self.rt.lock();
            let Some(geom) = rt.geom.as_ref() else {
                return Err(Error::BadState {
                    op: "transfer",
                    state: rt.st,
                });
            };
            if bufs.len() != geom.channels as usize {
                return Err(Error::Invalid("channel buffer count mismatch"));
            }
            let user = areas_from_bufs(bufs, geom.sample_bits);
            let off = self.appl.get() % geom.buffer_size;
            let cont = (geom.buffer_size - off).min(frames);
            (geom.areas.clone(), user, off, cont, geom.format)
        };
        if write {
            areas_copy(&areas, off, &user, user_offset, cont, format)?;
            if frames > cont {
                areas_copy(&areas, 0, &user, user_offset + cont, frames - cont, format)?;
            }
        } else {
            areas_copy(&user, user_offset, &areas, off, cont, format)?;
            if frames > cont {
                areas_copy(&user, user_offset + cont, &areas, 0, frames - cont, format)?;
            }
        }
        self.commit_appl(frames)
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_chunks(
        &self,
        ring: &[ChannelArea],
        user: &[ChannelArea],
        ring_off: Frames,
        cont: Frames,
        frames: Frames,
        format: Format,
        write: bool,
    ) -> Result<()> {
        if write {
            areas_copy(ring, ring_off, user, 0, cont, format)?;
            if frames > cont {
                areas_copy(ring, 0, user, cont, frames - cont, format)?;
            }
        } else {
            areas_copy(user, 0, ring, ring_off, cont, format)?;
            if frames > cont {
                areas_copy(user, cont, ring, 0, frames - cont, format)?;
            }
        }
        Ok(())
    }
}

impl Linkable for StreamShared {
    fn local_prepare(&self) -> Result<()> {
        self.do_prepare()
    }

    fn local_start(&self) -> Result<()> {
        self.do_start()
    }

    fn local_stop(&self) -> Result<()> {
        self.do_stop()
    }

    fn group(&self) -> Arc<LinkGroup> {
        StreamShared::group(self)
    }

    fn set_group(&self, group: Arc<LinkGroup>) {
        *self.link.lock() = Some(group);
    }
}

/// Generic ring back-end: the null sink and the loopback ring share
/// this implementation, differing only in clock behaviour and caps.
pub(crate) struct RingBackend {
    pub(crate) kind: BackendType,
    pub(crate) id: String,
    pub(crate) stream: Stream,
    pub(crate) shared: Arc<StreamShared>,
    pub(crate) caps: HwParams,
    pub(crate) events_mode: bool,
}

impl Backend for RingBackend {
    fn backend_type(&self) -> BackendType {
        self.kind
    }

    fn info(&self) -> Result<PcmInfo> {
        Ok(PcmInfo {
            backend: self.kind,
            id: self.id.clone(),
            stream: self.stream,
        })
    }

    fn hw_refine(&self, space: &mut HwParams) -> Result<()> {
        space.refine_with(&self.caps)?;
        Ok(())
    }

    fn hw_params(&mut self, config: &HwConfig) -> Result<BackendSetup> {
        self.shared.configure(config, self.events_mode)
    }

    fn hw_free(&mut self) -> Result<()> {
        self.shared.release();
        Ok(())
    }

    fn sw_params(&mut self, sw: &SwParams) -> Result<()> {
        self.shared.set_sw(sw)
    }

    fn dump(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(out, "{} PCM ({})", self.kind.name(), self.id)
    }

    fn close(&mut self) -> Result<()> {
        self.shared.release();
        Ok(())
    }

    fn state(&self) -> State {
        self.shared.state()
    }

    fn status(&self) -> Result<Status> {
        self.shared.status()
    }

    fn delay(&self) -> Result<i64> {
        self.shared.delay()
    }

    fn prepare(&mut self) -> Result<()> {
        self.shared.prepare()
    }

    fn reset(&mut self) -> Result<()> {
        self.shared.reset()
    }

    fn start(&mut self) -> Result<()> {
        self.shared.start()
    }

    fn drop_stream(&mut self) -> Result<()> {
        self.shared.stop()
    }

    fn drain(&mut self) -> Result<()> {
        self.shared.drain()
    }

    fn pause(&mut self, enable: bool) -> Result<()> {
        self.shared.pause(enable)
    }

    fn rewind(&mut self, frames: Frames) -> Result<Frames> {
        self.shared.rewind(frames)
    }

    fn avail_update(&self) -> Result<Frames> {
        self.shared.avail_update()
    }

    fn writei(&mut self, buf: &[u8], frames: Frames) -> Result<Frames> {
        self.shared
            .xfer_interleaved(buf.as_ptr() as *mut u8, frames, true)
    }

    fn writen(&mut self, bufs: &[&[u8]], offset: Frames, frames: Frames) -> Result<Frames> {
        let ptrs: Vec<*mut u8> = bufs.iter().map(|b| b.as_ptr() as *mut u8).collect();
        self.shared.xfer_channels(&ptrs, offset, frames, true)
    }

    fn readi(&mut self, buf: &mut [u8], frames: Frames) -> Result<Frames> {
        self.shared.xfer_interleaved(buf.as_mut_ptr(), frames, false)
    }

    fn readn(&mut self, bufs: &mut [&mut [u8]], offset: Frames, frames: Frames) -> Result<Frames> {
        let ptrs: Vec<*mut u8> = bufs.iter_mut().map(|b| b.as_mut_ptr()).collect();
        self.shared.xfer_channels(&ptrs, offset, frames, false)
    }

    fn mmap_commit(&mut self, _offset: Frames, frames: Frames) -> Result<Frames> {
        self.shared.commit_appl(frames)
    }

    fn link_descriptor(&self) -> Option<LinkHandle> {
        Some(self.shared.link_handle())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
