//! Capture from the loopback ring: a thread drives the virtual
//! hardware clock while the main thread blocks on reads and drains
//! period events.

use ostinato::prelude::*;
use ostinato::XrunMode;
use std::time::Duration;

fn main() -> ostinato::Result<()> {
    tracing_subscriber::fmt::init();

    let (mut pcm, clock) = loopback::open(
        "virtual-mic",
        Stream::Capture,
        Mode {
            nonblock: false,
            events: true,
        },
    )?;

    let mut space = pcm.hw_params_any()?;
    space.set_access(Access::RwInterleaved)?;
    space.set_format(Format::S16Le)?;
    space.set(HwParam::Channels, 1)?;
    space.set(HwParam::Rate, 16000)?;
    space.set(HwParam::PeriodSize, 256)?;
    space.set(HwParam::BufferSize, 1024)?;
    pcm.hw_params(&mut space)?;

    // Keep going even if the reader falls behind the simulated clock.
    let mut sw = pcm.sw_params_current()?;
    sw.set_xrun_mode(XrunMode::None);
    pcm.sw_params(&sw)?;

    pcm.subscribe_periods(|event| {
        println!("period elapsed, hw_ptr = {}", event.hw_ptr);
    })?;

    // Simulated hardware: 256 frames every 16 ms.
    let ticker = std::thread::spawn(move || {
        for _ in 0..16 {
            std::thread::sleep(Duration::from_millis(16));
            clock.advance(256);
        }
    });

    pcm.start()?;
    let mut buf = vec![0u8; 512 * 2];
    let mut total = 0u64;
    while total < 4096 {
        total += pcm.readi(&mut buf, 512)?;
        pcm.dispatch_events();
    }
    println!("captured {total} frames, delay {}", pcm.delay()?);

    ticker.join().expect("clock thread");
    pcm.close()
}
