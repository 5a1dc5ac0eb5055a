//! Minimal playback: negotiate a configuration against the null sink,
//! stream a sine wave, and dump the committed setup.

use ostinato::prelude::*;

fn main() -> ostinato::Result<()> {
    tracing_subscriber::fmt::init();

    let mut pcm = PcmBuilder::playback("null").open()?;

    let mut space = pcm.hw_params_any()?;
    space.set_access(Access::RwInterleaved)?;
    space.set_format(Format::S16Le)?;
    space.set(HwParam::Channels, 2)?;
    space.set(HwParam::Rate, 44100)?;
    pcm.hw_params_set_near(&mut space, HwParam::PeriodSize, 1024, 0)?;
    pcm.hw_params_set_near(&mut space, HwParam::BufferSize, 4096, 0)?;
    pcm.hw_params(&mut space)?;

    let mut setup_text = String::new();
    pcm.dump(&mut setup_text).expect("formatting never fails");
    println!("{setup_text}");

    // One second of A440.
    let setup = pcm.setup().expect("configured above");
    let rate = setup.rate;
    let frames = rate as u64;
    let mut buf = Vec::with_capacity((frames * 4) as usize);
    for n in 0..frames {
        let t = n as f32 / rate as f32;
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 0.3 * i16::MAX as f32) as i16;
        let bytes = sample.to_le_bytes();
        // Two channels, same sample.
        buf.extend_from_slice(&bytes);
        buf.extend_from_slice(&bytes);
    }

    let mut written = 0;
    while written < frames {
        let offset = (written * 4) as usize;
        written += pcm.writei(&buf[offset..], frames - written)?;
    }
    println!("wrote {written} frames, state {}", pcm.state());

    pcm.drain()?;
    pcm.close()
}
