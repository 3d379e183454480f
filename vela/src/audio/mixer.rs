//! In-memory audio objects and the mixer that plays them.
//!
//! The mixer owns every buffer and source name and the sticky error flag. It renders the
//! playing sources into interleaved `f32` frames at the output rate.

use crate::{
    audio::api::{code, SampleFormat, SourceState},
    names::NameTable,
};

type Native<T = ()> = Result<T, u32>;

struct BufferObject {
    format: SampleFormat,
    data: Vec<u8>,
    frequency: u32,
}

impl BufferObject {
    fn frames(&self) -> usize {
        self.data.len() / self.format.frame_size()
    }

    /// The sample for output `channel` of a frame. Mono is copied to every channel and stereo
    /// is averaged down to a mono output.
    fn sample(&self, frame: usize, channel: usize, out_channels: usize) -> f32 {
        let size = self.format.frame_size();
        let bytes = &self.data[frame * size..(frame + 1) * size];
        match (self.format.channels(), out_channels) {
            (1, _) => self.format.decode(bytes, 0),
            (_, 1) => (self.format.decode(bytes, 0) + self.format.decode(bytes, 1)) / 2.0,
            _ if channel < 2 => self.format.decode(bytes, channel),
            _ => 0.0,
        }
    }
}

struct SourceObject {
    buffer: u32,
    state: SourceState,
    // In buffer frames.
    cursor: f64,
    looping: bool,
    gain: f32,
    pitch: f32,
    position: [f32; 3],
}

impl Default for SourceObject {
    fn default() -> Self {
        Self {
            buffer: 0,
            state: SourceState::Initial,
            cursor: 0.0,
            looping: false,
            gain: 1.0,
            pitch: 1.0,
            position: [0.0; 3],
        }
    }
}

impl SourceObject {
    fn is_active(&self) -> bool {
        matches!(self.state, SourceState::Playing | SourceState::Paused)
    }
}

pub(crate) struct Mixer {
    rate: u32,
    channels: u16,
    error: u32,
    buffers: NameTable<BufferObject>,
    sources: NameTable<SourceObject>,
}

impl Mixer {
    pub(crate) fn new(rate: u32, channels: u16) -> Self {
        Self {
            rate,
            channels,
            error: code::NO_ERROR,
            buffers: NameTable::default(),
            sources: NameTable::default(),
        }
    }

    pub(crate) fn rate(&self) -> u32 {
        self.rate
    }

    pub(crate) fn channels(&self) -> u16 {
        self.channels
    }

    fn raise(&mut self, code: u32) {
        if self.error == code::NO_ERROR {
            self.error = code;
        }
    }

    pub(crate) fn take_error(&mut self) -> u32 {
        std::mem::replace(&mut self.error, code::NO_ERROR)
    }

    pub(crate) fn run<T: Default>(&mut self, f: impl FnOnce(&mut Self) -> Native<T>) -> T {
        match f(self) {
            Ok(value) => value,
            Err(code) => {
                self.raise(code);
                T::default()
            }
        }
    }

    fn buffer(&self, name: u32) -> Native<&BufferObject> {
        self.buffers.get(name).ok_or(code::INVALID_NAME)
    }

    fn source(&self, name: u32) -> Native<&SourceObject> {
        self.sources.get(name).ok_or(code::INVALID_NAME)
    }

    fn source_mut(&mut self, name: u32) -> Native<&mut SourceObject> {
        self.sources.get_mut(name).ok_or(code::INVALID_NAME)
    }

    fn is_attached(&self, buffer: u32) -> bool {
        self.sources.iter().any(|(_, source)| source.buffer == buffer)
    }

    // ----- Buffers -----

    pub(crate) fn create_buffer(&mut self) -> Native<u32> {
        self.buffers
            .insert(BufferObject {
                format: SampleFormat::default(),
                data: Vec::new(),
                frequency: 0,
            })
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_buffer(&mut self, name: u32) -> Native {
        if name == 0 {
            return Ok(());
        }
        self.buffer(name)?;
        if self.is_attached(name) {
            return Err(code::INVALID_OPERATION);
        }
        self.buffers.remove(name);
        Ok(())
    }

    pub(crate) fn buffer_data(
        &mut self,
        name: u32,
        format: SampleFormat,
        data: &[u8],
        frequency: u32,
    ) -> Native {
        self.buffer(name)?;
        if self.is_attached(name) {
            return Err(code::INVALID_OPERATION);
        }
        if frequency == 0 || data.len() % format.frame_size() != 0 {
            return Err(code::INVALID_VALUE);
        }

        let buffer = self.buffers.get_mut(name).ok_or(code::INVALID_NAME)?;
        buffer.format = format;
        buffer.data = data.to_vec();
        buffer.frequency = frequency;
        Ok(())
    }

    pub(crate) fn buffer_size(&mut self, name: u32) -> Native<usize> {
        Ok(self.buffer(name)?.data.len())
    }

    pub(crate) fn buffer_format(&mut self, name: u32) -> Native<SampleFormat> {
        Ok(self.buffer(name)?.format)
    }

    pub(crate) fn buffer_frequency(&mut self, name: u32) -> Native<u32> {
        Ok(self.buffer(name)?.frequency)
    }

    // ----- Sources -----

    pub(crate) fn create_source(&mut self) -> Native<u32> {
        self.sources
            .insert(SourceObject::default())
            .ok_or(code::OUT_OF_MEMORY)
    }

    pub(crate) fn delete_source(&mut self, name: u32) -> Native {
        if name != 0 {
            self.sources.remove(name).ok_or(code::INVALID_NAME)?;
        }
        Ok(())
    }

    pub(crate) fn set_source_buffer(&mut self, name: u32, buffer: u32) -> Native {
        if buffer != 0 && !self.buffers.contains(buffer) {
            return Err(code::INVALID_VALUE);
        }
        let source = self.source_mut(name)?;
        if source.is_active() {
            return Err(code::INVALID_OPERATION);
        }

        source.buffer = buffer;
        source.cursor = 0.0;
        source.state = SourceState::Initial;
        Ok(())
    }

    pub(crate) fn source_buffer(&mut self, name: u32) -> Native<u32> {
        Ok(self.source(name)?.buffer)
    }

    pub(crate) fn play(&mut self, name: u32) -> Native {
        let source = self.source_mut(name)?;
        match source.state {
            SourceState::Playing => source.cursor = 0.0,
            SourceState::Paused | SourceState::Initial | SourceState::Stopped => {}
        }
        source.state = SourceState::Playing;
        Ok(())
    }

    pub(crate) fn resume(&mut self, name: u32) -> Native {
        self.source_mut(name)?.state = SourceState::Playing;
        Ok(())
    }

    pub(crate) fn pause(&mut self, name: u32) -> Native {
        let source = self.source_mut(name)?;
        if source.state == SourceState::Playing {
            source.state = SourceState::Paused;
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self, name: u32) -> Native {
        let source = self.source_mut(name)?;
        source.state = SourceState::Stopped;
        source.cursor = 0.0;
        Ok(())
    }

    pub(crate) fn source_state(&mut self, name: u32) -> Native<SourceState> {
        Ok(self.source(name)?.state)
    }

    pub(crate) fn set_sample_offset(&mut self, name: u32, offset: u32) -> Native {
        let buffer = self.source(name)?.buffer;
        let frames = self.buffers.get(buffer).map_or(0, BufferObject::frames);
        if offset != 0 && offset as usize >= frames {
            return Err(code::INVALID_VALUE);
        }

        self.source_mut(name)?.cursor = offset as f64;
        Ok(())
    }

    pub(crate) fn sample_offset(&mut self, name: u32) -> Native<u32> {
        Ok(self.source(name)?.cursor as u32)
    }

    pub(crate) fn set_looping(&mut self, name: u32, looping: bool) -> Native {
        self.source_mut(name)?.looping = looping;
        Ok(())
    }

    pub(crate) fn looping(&mut self, name: u32) -> Native<bool> {
        Ok(self.source(name)?.looping)
    }

    pub(crate) fn set_gain(&mut self, name: u32, gain: f32) -> Native {
        let source = self.source_mut(name)?;
        if !gain.is_finite() || gain < 0.0 {
            return Err(code::INVALID_VALUE);
        }
        source.gain = gain;
        Ok(())
    }

    pub(crate) fn gain(&mut self, name: u32) -> Native<f32> {
        Ok(self.source(name)?.gain)
    }

    pub(crate) fn set_pitch(&mut self, name: u32, pitch: f32) -> Native {
        let source = self.source_mut(name)?;
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(code::INVALID_VALUE);
        }
        source.pitch = pitch;
        Ok(())
    }

    pub(crate) fn pitch(&mut self, name: u32) -> Native<f32> {
        Ok(self.source(name)?.pitch)
    }

    pub(crate) fn set_position(&mut self, name: u32, position: [f32; 3]) -> Native {
        let source = self.source_mut(name)?;
        if !position.iter().all(|v| v.is_finite()) {
            return Err(code::INVALID_VALUE);
        }
        source.position = position;
        Ok(())
    }

    pub(crate) fn position(&mut self, name: u32) -> Native<[f32; 3]> {
        Ok(self.source(name)?.position)
    }

    // ----- Output -----

    /// Mixes every playing source into `out`, interleaved at the output channel count.
    pub(crate) fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = usize::from(self.channels.max(1));
        let rate = f64::from(self.rate.max(1));
        let buffers = &self.buffers;

        for source in self.sources.values_mut() {
            if source.state != SourceState::Playing {
                continue;
            }
            // Playing with nothing attached is silent.
            let Some(buffer) = buffers.get(source.buffer) else {
                continue;
            };
            let frames = buffer.frames();
            if frames == 0 {
                continue;
            }

            let step = f64::from(buffer.frequency) / rate * f64::from(source.pitch);
            for frame in out.chunks_mut(channels) {
                let at = source.cursor as usize;
                for (channel, sample) in frame.iter_mut().enumerate() {
                    *sample += buffer.sample(at, channel, channels) * source.gain;
                }

                source.cursor += step;
                if source.cursor >= frames as f64 {
                    if source.looping {
                        source.cursor %= frames as f64;
                    } else {
                        source.state = SourceState::Stopped;
                        source.cursor = 0.0;
                        break;
                    }
                }
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mono16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn with_source(samples: &[i16], frequency: u32) -> (Mixer, u32, u32) {
        let mut mixer = Mixer::new(frequency, 1);
        let buffer = mixer.create_buffer().unwrap();
        mixer
            .buffer_data(buffer, SampleFormat::Mono16, &mono16(samples), frequency)
            .unwrap();
        let source = mixer.create_source().unwrap();
        mixer.set_source_buffer(source, buffer).unwrap();
        (mixer, buffer, source)
    }

    #[test]
    fn play_restarts_a_playing_source() {
        let (mut mixer, _, source) = with_source(&[0; 4], 2);
        mixer.play(source).unwrap();
        mixer.render(&mut [0.0; 2]);
        assert_eq!(2, mixer.sample_offset(source).unwrap());

        mixer.play(source).unwrap();

        assert_eq!(0, mixer.sample_offset(source).unwrap());
        assert_eq!(SourceState::Playing, mixer.source_state(source).unwrap());
    }

    #[test]
    fn resume_keeps_a_playing_source_going() {
        let (mut mixer, _, source) = with_source(&[0; 4], 2);
        mixer.resume(source).unwrap();
        mixer.render(&mut [0.0; 2]);

        mixer.resume(source).unwrap();

        assert_eq!(2, mixer.sample_offset(source).unwrap());
        assert_eq!(SourceState::Playing, mixer.source_state(source).unwrap());
        assert_eq!(Err(code::INVALID_NAME), mixer.resume(99));
    }

    #[test]
    fn pause_resumes_where_it_left_off() {
        let (mut mixer, _, source) = with_source(&[0; 4], 2);
        mixer.play(source).unwrap();
        mixer.render(&mut [0.0; 1]);
        mixer.pause(source).unwrap();
        mixer.render(&mut [0.0; 2]);

        assert_eq!(1, mixer.sample_offset(source).unwrap());
        mixer.play(source).unwrap();
        assert_eq!(1, mixer.sample_offset(source).unwrap());
    }

    #[test]
    fn sources_stop_at_the_end_unless_looping() {
        let (mut mixer, _, source) = with_source(&[0; 4], 2);
        mixer.play(source).unwrap();

        mixer.render(&mut [0.0; 6]);

        assert_eq!(SourceState::Stopped, mixer.source_state(source).unwrap());
        assert_eq!(0, mixer.sample_offset(source).unwrap());

        mixer.set_looping(source, true).unwrap();
        mixer.play(source).unwrap();
        mixer.render(&mut [0.0; 6]);

        assert_eq!(SourceState::Playing, mixer.source_state(source).unwrap());
        assert_eq!(2, mixer.sample_offset(source).unwrap());
    }

    #[test]
    fn render_mixes_with_gain_and_clamps() {
        let (mut mixer, buffer, a) = with_source(&[16384, -16384], 2);
        let b = mixer.create_source().unwrap();
        mixer.set_source_buffer(b, buffer).unwrap();
        mixer.set_gain(b, 2.0).unwrap();
        mixer.play(a).unwrap();
        mixer.play(b).unwrap();

        let mut out = [0.0; 2];
        mixer.render(&mut out);

        assert_eq!([1.0, -1.0], out);
    }

    #[test]
    fn mono_is_copied_to_every_output_channel() {
        let mut mixer = Mixer::new(2, 2);
        let buffer = mixer.create_buffer().unwrap();
        mixer
            .buffer_data(buffer, SampleFormat::Mono8, &[192, 64], 2)
            .unwrap();
        let source = mixer.create_source().unwrap();
        mixer.set_source_buffer(source, buffer).unwrap();
        mixer.play(source).unwrap();

        let mut out = [0.0; 4];
        mixer.render(&mut out);

        assert_eq!([0.5, 0.5, -0.5, -0.5], out);
    }

    #[test]
    fn pitch_scales_the_step() {
        let (mut mixer, _, source) = with_source(&[0; 8], 2);
        mixer.set_pitch(source, 2.0).unwrap();
        mixer.play(source).unwrap();

        mixer.render(&mut [0.0; 2]);

        assert_eq!(4, mixer.sample_offset(source).unwrap());
    }

    #[test]
    fn attached_buffers_cannot_change() {
        let (mut mixer, buffer, source) = with_source(&[0; 4], 2);

        mixer.run(|m| m.delete_buffer(buffer));
        assert_eq!(code::INVALID_OPERATION, mixer.take_error());

        mixer.run(|m| m.buffer_data(buffer, SampleFormat::Mono8, &[0], 2));
        assert_eq!(code::INVALID_OPERATION, mixer.take_error());

        mixer.set_source_buffer(source, 0).unwrap();
        assert!(mixer.delete_buffer(buffer).is_ok());
    }

    #[test]
    fn attaching_to_a_playing_source_is_an_invalid_operation() {
        let (mut mixer, buffer, source) = with_source(&[0; 4], 2);
        mixer.play(source).unwrap();

        assert_eq!(
            Err(code::INVALID_OPERATION),
            mixer.set_source_buffer(source, buffer)
        );
        assert_eq!(Err(code::INVALID_VALUE), mixer.set_source_buffer(source, 99));
    }

    #[test]
    fn offsets_past_the_end_are_invalid() {
        let (mut mixer, _, source) = with_source(&[0; 4], 2);

        assert_eq!(Err(code::INVALID_VALUE), mixer.set_sample_offset(source, 4));
        mixer.set_sample_offset(source, 3).unwrap();
        assert_eq!(3, mixer.sample_offset(source).unwrap());
    }

    #[test]
    fn misaligned_data_is_invalid() {
        let mut mixer = Mixer::new(44_100, 2);
        let buffer = mixer.create_buffer().unwrap();

        assert_eq!(
            Err(code::INVALID_VALUE),
            mixer.buffer_data(buffer, SampleFormat::Stereo16, &[0; 6], 44_100)
        );
        assert_eq!(
            Err(code::INVALID_VALUE),
            mixer.buffer_data(buffer, SampleFormat::Mono8, &[0; 6], 0)
        );
    }

    #[test]
    fn first_error_sticks_until_read() {
        let mut mixer = Mixer::new(44_100, 2);

        mixer.run(|m| m.play(42));
        mixer.run(|m| m.set_gain(42, -1.0));

        assert_eq!(code::INVALID_NAME, mixer.take_error());
        assert_eq!(code::NO_ERROR, mixer.take_error());
    }
}
