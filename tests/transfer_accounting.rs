//! Pointer accounting, alignment, direct windows, silencing, and
//! boundary wrap behaviour of the transfer engine.

use ostinato::prelude::*;
use ostinato::{boundary_for, Error};

const FRAME_BYTES: usize = 4; // S16_LE stereo

fn open_configured(stream: Stream, nonblock: bool) -> (Pcm, LoopClock) {
    let (mut pcm, clock) = loopback::open(
        "accounting",
        stream,
        Mode {
            nonblock,
            events: false,
        },
    )
    .unwrap();
    let mut space = pcm.hw_params_any().unwrap();
    space.set_access(Access::RwInterleaved).unwrap();
    space.set_format(Format::S16Le).unwrap();
    space.set(HwParam::Channels, 2).unwrap();
    space.set(HwParam::Rate, 48000).unwrap();
    space.set(HwParam::PeriodSize, 1024).unwrap();
    space.set(HwParam::BufferSize, 4096).unwrap();
    pcm.hw_params(&mut space).unwrap();
    (pcm, clock)
}

#[test]
fn accounting_identity_after_write() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 2048 * FRAME_BYTES];

    let appl0 = pcm.appl_ptr().unwrap();
    let avail0 = pcm.avail_update().unwrap();
    let k = pcm.writei(&buf, 2048).unwrap();
    assert_eq!(pcm.appl_ptr().unwrap(), appl0 + k);
    assert_eq!(pcm.avail_update().unwrap(), avail0 - k);

    // delay + avail stays the buffer size while running normally.
    clock.advance(512);
    let avail = pcm.avail_update().unwrap();
    let delay = pcm.delay().unwrap() as u64;
    assert_eq!(avail + delay, 4096);
}

#[test]
fn hw_pointer_is_monotonic() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 4096 * FRAME_BYTES];
    pcm.writei(&buf, 4096).unwrap();

    let mut last = pcm.hw_ptr().unwrap();
    for _ in 0..16 {
        clock.advance(128);
        pcm.avail_update().unwrap();
        let now = pcm.hw_ptr().unwrap();
        assert!(now >= last);
        last = now;
    }
}

#[test]
fn xfer_alignment_rounds_down() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    let mut sw = pcm.sw_params_current().unwrap();
    sw.xfer_align = 512;
    pcm.sw_params(&sw).unwrap();

    let buf = vec![0u8; 4096 * FRAME_BYTES];
    // 1000 >= align: rounded down to 512.
    let n = pcm.writei(&buf, 1000).unwrap();
    assert_eq!(n % 512, 0);
    assert_eq!(n, 512);
    // Below the alignment the request passes through untouched.
    let n = pcm.writei(&buf, 100).unwrap();
    assert_eq!(n, 100);
}

#[test]
fn mmap_round_trip() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);

    let appl0 = pcm.appl_ptr().unwrap();
    let window = pcm.mmap_begin(1024).unwrap();
    assert_eq!(window.offset, appl0 % 4096);
    assert!(window.frames <= 1024);
    assert_eq!(window.frames, 1024);

    ostinato::areas_silence(&window.areas, window.offset, window.frames, Format::S16Le).unwrap();
    let committed = pcm.mmap_commit(window.offset, window.frames).unwrap();
    assert_eq!(committed, 1024);
    assert_eq!(pcm.appl_ptr().unwrap(), appl0 + 1024);

    // The window is clamped to the buffer end: after 3072 more frames
    // the next window cannot cross the wrap point.
    let window = pcm.mmap_begin(4096).unwrap();
    assert_eq!(window.offset, 1024);
    assert_eq!(window.frames, 3072);
}

#[test]
fn mmap_commit_validates_offset_and_size() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    let window = pcm.mmap_begin(1024).unwrap();
    let bad = pcm.mmap_commit(window.offset + 1, window.frames);
    assert!(matches!(bad, Err(Error::Invalid(_))));
    let bad = pcm.mmap_commit(window.offset, 4097);
    assert!(matches!(bad, Err(Error::Invalid(_))));
}

#[test]
fn silencing_tops_up_ahead_of_appl() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let mut sw = pcm.sw_params_current().unwrap();
    sw.silence_threshold = 1024;
    sw.silence_size = 1024;
    pcm.sw_params(&sw).unwrap();

    // Queue 512 frames of a non-zero pattern; the queue is already at
    // or below the threshold, so the next avail_update pre-zeroes a
    // kilobyte of frames ahead of the write position.
    let buf = vec![0x33u8; 512 * FRAME_BYTES];
    pcm.writei(&buf, 512).unwrap();
    pcm.avail_update().unwrap();

    let window = pcm.mmap_begin(0).unwrap();
    let area = window.areas[0];
    unsafe {
        // Ahead of appl: silenced.
        assert_eq!(*area.addr_at(512), 0);
        assert_eq!(*area.addr_at(512 + 1023), 0);
        // The queued data itself is untouched.
        assert_eq!(*area.addr_at(0), 0x33);
        assert_eq!(*area.addr_at(511), 0x33);
    }

    // When the hardware underruns into the silenced region it plays
    // zeros, not stale frames.
    clock.advance(512);
    pcm.avail_update().ok();
    unsafe {
        assert_eq!(*area.addr_at(513), 0);
    }
}

#[test]
fn boundary_wrap_keeps_accounting_correct() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let boundary = boundary_for(4096);
    // Run free: no xrun stop, so the pointers can lap the boundary.
    let mut sw = pcm.sw_params_current().unwrap();
    sw.set_stop_threshold(boundary);
    pcm.sw_params(&sw).unwrap();
    pcm.start().unwrap();

    let laps = boundary / 4096 + 3;
    for _ in 0..laps {
        clock.advance(4096);
        let window = pcm.mmap_begin(4096).unwrap();
        assert!(window.frames > 0);
        pcm.mmap_commit(window.offset, window.frames).unwrap();
        let appl = pcm.appl_ptr().unwrap();
        let hw = pcm.hw_ptr().unwrap();
        assert!(appl < boundary);
        assert!(hw < boundary);
    }
    // Both pointers lapped at least once and avail stays sane.
    let avail = pcm.avail_update().unwrap();
    assert!(avail <= 2 * 4096);
}

#[test]
fn reset_empties_the_queue() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 2048 * FRAME_BYTES];
    pcm.writei(&buf, 2048).unwrap();
    assert_eq!(pcm.state(), State::Running);
    assert_eq!(pcm.delay().unwrap(), 2048);

    pcm.reset().unwrap();
    assert_eq!(pcm.state(), State::Running);
    assert_eq!(pcm.delay().unwrap(), 0);
    assert_eq!(pcm.avail_update().unwrap(), 4096);
}

#[test]
fn noninterleaved_round_trip() {
    let (mut play, clock) = loopback::open("ni", Stream::Playback, Mode::BLOCK).unwrap();
    let mut space = play.hw_params_any().unwrap();
    space.set_access(Access::RwNoninterleaved).unwrap();
    space.set_format(Format::S16Le).unwrap();
    space.set(HwParam::Channels, 2).unwrap();
    space.set(HwParam::Rate, 48000).unwrap();
    space.set(HwParam::PeriodSize, 256).unwrap();
    space.set(HwParam::BufferSize, 1024).unwrap();
    play.hw_params(&mut space).unwrap();

    let left = vec![0x01u8; 512 * 2];
    let right = vec![0x02u8; 512 * 2];
    let n = play
        .writen(&[left.as_slice(), right.as_slice()], 512)
        .unwrap();
    assert_eq!(n, 512);

    // Per-channel planes: the ring keeps the channels separate.
    let window = play.mmap_begin(0).unwrap();
    unsafe {
        assert_eq!(*window.areas[0].addr_at(0), 0x01);
        assert_eq!(*window.areas[1].addr_at(0), 0x02);
    }
    // Consume half the queue; the rest stays accounted.
    clock.advance(256);
    assert_eq!(play.avail_update().unwrap(), 768);
    assert_eq!(play.delay().unwrap(), 256);
}

#[test]
fn conversions_follow_geometry() {
    let (pcm, _clock) = open_configured(Stream::Playback, false);
    assert_eq!(pcm.frames_to_bytes(1024).unwrap(), 4096);
    assert_eq!(pcm.bytes_to_frames(4096).unwrap(), 1024);
    assert_eq!(pcm.samples_to_bytes(4).unwrap(), 8);
    assert_eq!(pcm.bytes_to_samples(8).unwrap(), 4);
    assert!(pcm.bytes_to_frames(3).is_err());
}
