//! The null back-end: playback is discarded, capture synthesises
//! silence. The hardware pointer tracks the application pointer, so a
//! full buffer is always available and the stream never xruns.

use crate::runtime::{RingBackend, StreamShared};
use ostinato_core::hw::HwParam;
use ostinato_core::interval::Interval;
use ostinato_core::mask::Mask;
use ostinato_core::{BackendType, HwParams, Mode, Pcm, Result, Stream, ALL_FORMATS};

pub(crate) fn caps() -> HwParams {
    let mut caps = HwParams::any();
    // Every format with a defined storage width.
    let mut formats = Mask::none();
    for f in ALL_FORMATS {
        if f.physical_width().is_some() {
            formats.set(f.index());
        }
    }
    caps.set_format_mask(formats).expect("non-empty format caps");
    let limits = [
        (HwParam::Channels, 1, 1024),
        (HwParam::Rate, 4000, 768_000),
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

/// Open a null PCM.
pub fn open(name: impl Into<String>, stream: Stream, mode: Mode) -> Result<Pcm> {
    let shared = StreamShared::new(stream, true);
    let backend = RingBackend {
        kind: BackendType::Null,
        id: "null".into(),
        stream,
        shared,
        caps: caps(),
        events_mode: mode.events,
    };
    Ok(Pcm::new(name, stream, mode, Box::new(backend)))
}
