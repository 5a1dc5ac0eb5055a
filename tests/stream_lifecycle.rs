//! Stream lifecycle integration: configuration commit, auto-start,
//! xrun recovery, rewind, drain, pause, and linked groups, all against
//! the deterministic loopback back-end.

use ostinato::prelude::*;
use ostinato::{Error, StartMode};

const FRAME_BYTES: usize = 4; // S16_LE stereo

fn open_configured(stream: Stream, nonblock: bool) -> (Pcm, LoopClock) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (mut pcm, clock) = loopback::open(
        "lifecycle",
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
    space.set(HwParam::Rate, 44100).unwrap();
    space.set(HwParam::PeriodSize, 1024).unwrap();
    space.set(HwParam::BufferSize, 4096).unwrap();
    pcm.hw_params(&mut space).unwrap();
    (pcm, clock)
}

#[test]
fn interleaved_playback_start() {
    // Scenario: a full-buffer write returns completely and the stream
    // auto-starts once the start threshold is crossed.
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    assert_eq!(pcm.state(), State::Prepared);

    let setup_rate = pcm.setup().unwrap().rate;
    assert_eq!(setup_rate, 44100);
    assert_eq!(pcm.setup().unwrap().period_size, 1024);
    assert_eq!(pcm.setup().unwrap().buffer_size, 4096);

    let silence = vec![0u8; 4096 * FRAME_BYTES];
    assert_eq!(pcm.writei(&silence, 4096).unwrap(), 4096);
    assert_eq!(pcm.state(), State::Running);
}

#[test]
fn underrun_recovery() {
    // Withhold writes until the clock outruns the queue; the next write
    // reports the xrun, prepare recovers, and writing works again.
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 1024 * FRAME_BYTES];
    pcm.writei(&buf, 1024).unwrap();
    assert_eq!(pcm.state(), State::Running);

    clock.advance(4096);
    assert_eq!(pcm.state(), State::Xrun);

    let err = pcm.writei(&buf, 1024).unwrap_err();
    assert!(matches!(err, Error::Underrun));
    assert_eq!(err.errno(), -32);

    pcm.prepare().unwrap();
    assert_eq!(pcm.state(), State::Prepared);
    assert_eq!(pcm.writei(&buf, 1024).unwrap(), 1024);
}

#[test]
fn nonblock_capture_returns_would_block() {
    let (mut pcm, _clock) = open_configured(Stream::Capture, true);
    pcm.start().unwrap();
    let mut buf = vec![0u8; 1024 * FRAME_BYTES];
    let err = pcm.readi(&mut buf, 1024).unwrap_err();
    assert!(matches!(err, Error::WouldBlock));
    assert_eq!(err.errno(), -11);
}

#[test]
fn nonblock_playback_on_full_buffer() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, true);
    let buf = vec![0u8; 4096 * FRAME_BYTES];
    assert_eq!(pcm.writei(&buf, 4096).unwrap(), 4096);
    // The ring is full and the clock has not consumed anything.
    let err = pcm.writei(&buf, 1024).unwrap_err();
    assert!(matches!(err, Error::WouldBlock));
}

#[test]
fn rewind_rewrites_the_tail() {
    // Write 2048 frames without starting, rewind 1024, overwrite.
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    let mut sw = pcm.sw_params_current().unwrap();
    sw.set_start_mode(StartMode::Explicit);
    pcm.sw_params(&sw).unwrap();

    let first = vec![0x11u8; 2048 * FRAME_BYTES];
    assert_eq!(pcm.writei(&first, 2048).unwrap(), 2048);
    assert_eq!(pcm.state(), State::Prepared);
    assert_eq!(pcm.appl_ptr().unwrap(), 2048);

    assert_eq!(pcm.rewind(1024).unwrap(), 1024);
    assert_eq!(pcm.appl_ptr().unwrap(), 1024);

    let second = vec![0x22u8; 1024 * FRAME_BYTES];
    assert_eq!(pcm.writei(&second, 1024).unwrap(), 1024);
    assert_eq!(pcm.appl_ptr().unwrap(), 2048);

    // The ring now holds the first kilobyte of frames then the rewrite.
    let window = pcm.mmap_begin(0).unwrap();
    let area = window.areas[0];
    unsafe {
        assert_eq!(*area.addr_at(0), 0x11);
        assert_eq!(*area.addr_at(1023), 0x11);
        assert_eq!(*area.addr_at(1024), 0x22);
        assert_eq!(*area.addr_at(2047), 0x22);
    }
}

#[test]
fn drain_blocks_until_clock_catches_up() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 4096 * FRAME_BYTES];
    pcm.writei(&buf, 4096).unwrap();

    let ticker = std::thread::spawn(move || {
        for _ in 0..8 {
            std::thread::sleep(std::time::Duration::from_millis(2));
            clock.advance(1024);
        }
    });
    pcm.drain().unwrap();
    assert_eq!(pcm.state(), State::Setup);
    ticker.join().unwrap();
}

#[test]
fn drain_nonblock_reports_would_block() {
    let (mut pcm, clock) = open_configured(Stream::Playback, true);
    let buf = vec![0u8; 2048 * FRAME_BYTES];
    pcm.writei(&buf, 2048).unwrap();
    assert!(matches!(pcm.drain(), Err(Error::WouldBlock)));
    assert_eq!(pcm.state(), State::Draining);

    // Finish the drain and observe the stop.
    clock.advance(2048);
    assert_eq!(pcm.state(), State::Setup);
}

#[test]
fn pause_freezes_the_clock() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 4096 * FRAME_BYTES];
    pcm.writei(&buf, 4096).unwrap();

    pcm.pause(true).unwrap();
    assert_eq!(pcm.state(), State::Paused);
    assert_eq!(clock.advance(1024), 0);

    pcm.pause(false).unwrap();
    assert_eq!(pcm.state(), State::Running);
    assert_eq!(clock.advance(1024), 1024);
}

#[test]
fn illegal_transitions_are_badfd() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    // PREPARED does not accept pause.
    let err = pcm.pause(true).unwrap_err();
    assert!(matches!(err, Error::BadState { .. }));
    assert_eq!(err.errno(), -77);
    // RUNNING does not accept start.
    let buf = vec![0u8; 1024 * FRAME_BYTES];
    pcm.writei(&buf, 1024).unwrap();
    assert!(matches!(pcm.start(), Err(Error::BadState { .. })));
}

#[test]
fn linked_handles_start_together() {
    let (mut a, _ca) = open_configured(Stream::Playback, false);
    let (mut b, _cb) = open_configured(Stream::Playback, false);

    // Keep auto-start out of the way.
    for pcm in [&mut a, &mut b] {
        let mut sw = pcm.sw_params_current().unwrap();
        sw.set_start_mode(StartMode::Explicit);
        pcm.sw_params(&sw).unwrap();
    }
    a.link(&mut b).unwrap();

    let buf = vec![0u8; 1024 * FRAME_BYTES];
    a.writei(&buf, 1024).unwrap();
    b.writei(&buf, 1024).unwrap();
    assert_eq!(a.state(), State::Prepared);
    assert_eq!(b.state(), State::Prepared);

    a.start().unwrap();
    assert_eq!(a.state(), State::Running);
    assert_eq!(b.state(), State::Running);

    a.drop_frames().unwrap();
    assert_eq!(b.state(), State::Setup);

    // After unlink the handles trigger independently.
    a.prepare().unwrap();
    b.prepare().unwrap();
    a.unlink().unwrap();
    a.start().unwrap();
    assert_eq!(a.state(), State::Running);
    assert_eq!(b.state(), State::Prepared);
}

#[test]
fn hw_free_returns_to_open() {
    let (mut pcm, _clock) = open_configured(Stream::Playback, false);
    assert_eq!(pcm.state(), State::Prepared);
    pcm.drop_frames().unwrap();
    pcm.hw_free().unwrap();
    assert_eq!(pcm.state(), State::Open);
    assert!(pcm.setup().is_none());
    assert!(matches!(pcm.prepare(), Err(Error::BadState { .. })));
}

#[test]
fn close_is_idempotent_and_final() {
    let (mut pcm, clock) = open_configured(Stream::Playback, false);
    let buf = vec![0u8; 1024 * FRAME_BYTES];
    pcm.writei(&buf, 1024).unwrap();
    let ticker = std::thread::spawn(move || {
        for _ in 0..4 {
            std::thread::sleep(std::time::Duration::from_millis(2));
            clock.advance(1024);
        }
    });
    pcm.close().unwrap();
    pcm.close().unwrap();
    ticker.join().unwrap();
}
