//! In-memory WAV encoding of finalized recordings.
//!
//! The recorder hands mono `f32` samples to [`encode_wav`], which produces
//! 16-bit PCM bytes suitable both for local playback and for upload to the
//! transcription backend (`audio/wav`).

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Media type tag attached to every encoded recording.
pub const WAV_MEDIA_TYPE: &str = "audio/wav";

/// Encode mono `samples` (`[-1.0, 1.0]`) at `sample_rate` Hz as 16-bit PCM WAV.
///
/// Out-of-range samples are clamped before quantisation.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
