//! The loopback back-end: a user-space ring whose hardware clock is
//! driven by the embedder.
//!
//! Nothing consumes or produces frames until the [`LoopClock`] is
//! advanced, which makes under/over-runs, drain completion, and period
//! wake-ups fully deterministic. Tests and in-process audio wiring use
//! this back-end as their virtual hardware.

use crate::runtime::{RingBackend, StreamShared};
use ostinato_core::hw::HwParam;
use ostinato_core::interval::Interval;
use ostinato_core::mask::Mask;
use ostinato_core::{BackendType, Frames, HwParams, Mode, Pcm, Result, Stream, ALL_FORMATS};
use std::sync::Arc;

/// Handle that advances a loopback stream's hardware pointer.
///
/// Advancing simulates the hardware consuming (playback) or producing
/// (capture) frames: pointers move, periods elapse, xruns trip, and
/// blocked transfers wake. Safe to drive from another thread.
#[derive(Clone)]
pub struct LoopClock {
    shared: Arc<StreamShared>,
}

impl LoopClock {
    /// Advance the hardware clock by `frames`. Returns the frames the
    /// simulated hardware actually consumed or produced; a stream that
    /// is not running consumes nothing, and a draining stream stops at
    /// the application pointer.
    pub fn advance(&self, frames: Frames) -> Frames {
        self.shared.clock_advance(frames)
    }
}

pub(crate) fn caps() -> HwParams {
    let mut caps = HwParams::any();
    let mut formats = Mask::none();
    for f in ALL_FORMATS {
        if f.physical_width().is_some() {
            formats.set(f.index());
        }
    }
    caps.set_format_mask(formats).expect("non-empty format caps");
    let limits = [
        (HwParam::Channels, 1, 32),
        (HwParam::Rate, 4000, 384_000),
        (HwParam::PeriodSize, 8, 1 << 14),
        (HwParam::Periods, 2, 1024),
        (HwParam::BufferSize, 16, 1 << 16),
    ];
    for (param, min, max) in limits {
        caps.interval_mut(param)
            .refine(&Interval::new(min, max))
            .expect("non-empty interval caps");
    }
    caps
}

/// Open a loopback PCM together with its clock.
pub fn open(name: impl Into<String>, stream: Stream, mode: Mode) -> Result<(Pcm, LoopClock)> {
    let shared = StreamShared::new(stream, false);
    let clock = LoopClock {
        shared: shared.clone(),
    };
    let backend = RingBackend {
        kind: BackendType::Loop,
        id: "loopback".into(),
        stream,
        shared,
        caps: caps(),
        events_mode: mode.events,
    };
    Ok((Pcm::new(name, stream, mode, Box::new(backend)), clock))
}

/// Recover the clock of a loopback PCM opened through the registry.
pub fn clock_of(pcm: &Pcm) -> Option<LoopClock> {
    let backend = pcm.backend_any().downcast_ref::<RingBackend>()?;
    (backend.kind == BackendType::Loop).then(|| LoopClock {
        shared: backend.shared.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostinato_core::{Access, Format, State};

    fn configured(stream: Stream, mode: Mode) -> (Pcm, LoopClock) {
        let (mut pcm, clock) = open("test-loop", stream, mode).unwrap();
        let mut space = pcm.hw_params_any().unwrap();
        space.set_access(Access::RwInterleaved).unwrap();
        space.set_format(Format::S16Le).unwrap();
        space.set(HwParam::Channels, 2).unwrap();
        space.set(HwParam::Rate, 44100).unwrap();
        space.set(HwParam::PeriodSize, 1024).unwrap();
        space.set(HwParam::BufferSize, 4096).unwrap();
        pcm.hw_params(&mut space).unwrap();
        (pcm, clock)
    }

    #[test]
    fn test_clock_ignored_unless_running(){
        let (pcm, clock) = configured(Stream::Playback, Mode::BLOCK);
        assert_eq!(pcm.state(), State::Prepared);
        assert_eq!(clock.advance(1024), 0);
        assert_eq!(pcm.hw_ptr().unwrap(), 0);
    }

    #[test]
    fn test_playback_consumption() {
        let (mut pcm, clock) = configured(Stream::Playback, Mode::BLOCK);
        let buf = vec![0u8; 4096 * 4];
        assert_eq!(pcm.writei(&buf, 4096).unwrap(), 4096);
        assert_eq!(pcm.state(), State::Running);
        assert_eq!(pcm.avail_update().unwrap(), 0);

        assert_eq!(clock.advance(1024), 1024);
        assert_eq!(pcm.avail_update().unwrap(), 1024);
        assert_eq!(pcm.delay().unwrap(), 3072);
    }

    #[test]
    fn test_underrun_trips_xrun() {
        let (mut pcm, clock) = configured(Stream::Playback, Mode::BLOCK);
        let buf = vec![0u8; 1024 * 4];
        pcm.writei(&buf, 1024).unwrap();
        // Consume more than was queued.
        clock.advance(2048);
        assert_eq!(pcm.state(), State::Xrun);
        assert!(pcm.avail_update().is_err());
    }

    #[test]
    fn test_capture_production() {
        let (mut pcm, clock) = configured(Stream::Capture, Mode::NONBLOCK);
        pcm.start().unwrap();
        assert_eq!(pcm.avail_update().unwrap(), 0);
        clock.advance(1024);
        assert_eq!(pcm.avail_update().unwrap(), 1024);
        let mut buf = vec![0xffu8; 1024 * 4];
        assert_eq!(pcm.readi(&mut buf, 1024).unwrap(), 1024);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_period_events_fire() {
        let mode = Mode { nonblock: true, events: true };
        let (mut pcm, clock) = configured(Stream::Playback, mode);
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits2 = hits.clone();
        pcm.subscribe_periods(move |_| {
            hits2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();

        let buf = vec![0u8; 4096 * 4];
        pcm.writei(&buf, 4096).unwrap();
        clock.advance(2048);
        assert_eq!(pcm.dispatch_events(), 2);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
