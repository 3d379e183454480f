use std::{f32::consts::TAU, thread, time::Duration};

use vela::{
    audio::{self, AudioBuffer, AudioContext, AudioDevice, AudioSource, PlaybackState},
    VelaResult,
};

const SAMPLE_RATE: u32 = 44_100;

fn sine(frequency: f32, duration: Duration) -> Vec<i16> {
    let count = (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            ((TAU * frequency * t).sin() * i16::MAX as f32 * 0.25) as i16
        })
        .collect()
}

fn run() -> VelaResult {
    let device = AudioDevice::open_default()?;
    let ctx = AudioContext::new(&device);
    audio::set_current(&ctx);

    let buffer = AudioBuffer::from_samples(&sine(440.0, Duration::from_secs(1)), 1, SAMPLE_RATE)?;
    let source = AudioSource::with_buffer(&buffer)?;
    log::info!("playing {:?} of 440 Hz", buffer.duration()?);

    source.play()?;
    while source.state()? == PlaybackState::Playing {
        thread::sleep(Duration::from_millis(50));
    }

    source.set_pitch(1.5)?;
    source.set_looping(true)?;
    source.play()?;
    thread::sleep(Duration::from_secs(2));
    source.stop()?;

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("tone exited with error: {err}");
    }
}
