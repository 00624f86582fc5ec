use base64::{engine::general_purpose::STANDARD, Engine};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encodes mono `f32` samples as 16-bit PCM WAV.
pub fn f32_to_wav_bytes(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for &sample in samples {
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(sample_i16)?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

pub fn f32_to_wav_base64(samples: &[f32], sample_rate: u32) -> Result<String, hound::Error> {
    let wav_bytes = f32_to_wav_bytes(samples, sample_rate)?;
    Ok(STANDARD.encode(wav_bytes))
}

/// Averages interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
