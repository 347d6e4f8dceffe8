/// Sound cues: short procedural tones via rodio.
///
/// Three cues, generated as in-memory WAV buffers at init time:
///   start      rising three-note run
///   score      quick two-note chirp
///   game over  falling four-note line
///
/// Build without the "sound" feature to get the silent stub.

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_start: Arc<Vec<u8>>,
        sfx_score: Arc<Vec<u8>>,
        sfx_game_over: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_start: Arc::new(make_wav(&gen_start())),
                sfx_score: Arc::new(make_wav(&gen_score())),
                sfx_game_over: Arc::new(make_wav(&gen_game_over())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(sink) => sink,
                Err(e) => {
                    debug!(error = %e, "sound sink unavailable");
                    return;
                }
            };
            let cursor = Cursor::new(buf.as_ref().clone());
            if let Ok(src) = rodio::Decoder::new(cursor) {
                sink.append(src);
                sink.detach();
            }
        }

        pub fn play_start(&self) { self.play(&self.sfx_start); }
        pub fn play_score(&self) { self.play(&self.sfx_score); }
        pub fn play_game_over(&self) { self.play(&self.sfx_game_over); }
    }

    // ── Waveforms (mono f32) ──

    fn tone(freq: f32, secs: f32, volume: f32, shape: impl Fn(f32) -> f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * secs) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = shape(i as f32 / n as f32);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                wave * env * volume
            })
            .collect()
    }

    /// C5 → E5 → G5
    fn gen_start() -> Vec<f32> {
        [523.0_f32, 659.0, 784.0]
            .iter()
            .flat_map(|&f| tone(f, 0.08, 0.3, |p| 1.0 - p * 0.4))
            .collect()
    }

    /// E6 → A6
    fn gen_score() -> Vec<f32> {
        [1319.0_f32, 1760.0]
            .iter()
            .flat_map(|&f| tone(f, 0.04, 0.25, |p| 1.0 - p.powf(0.5)))
            .collect()
    }

    /// A4 → F#4 → Eb4 → C4, faded out over the last quarter
    fn gen_game_over() -> Vec<f32> {
        let mut samples: Vec<f32> = [440.0_f32, 370.0, 311.0, 261.0]
            .iter()
            .flat_map(|&f| tone(f, 0.12, 0.3, |p| 1.0 - p * 0.3))
            .collect();
        let total = samples.len();
        let fade_len = total / 4;
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    // ── WAV encoder ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

// ── Public API: no-ops when the sound feature is off ──

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_start(&self) {}
    pub fn play_score(&self) {}
    pub fn play_game_over(&self) {}
}
