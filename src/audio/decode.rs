use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{info, warn};

/// Canonical waveform format expected by the recognition engine
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Decode an uploaded audio blob (any container symphonia understands) to a
/// mono 16 kHz f32 waveform. If probing fails, a plain WAV parse via hound is
/// attempted as the alternate decode path before giving up.
pub fn decode_blob(bytes: &[u8]) -> Result<Vec<f32>> {
    match decode_container(bytes) {
        Ok(samples) => Ok(samples),
        Err(e) => {
            warn!("Container decode failed ({e:#}), retrying as plain WAV");
            decode_wav(bytes).context("Both container and WAV decode paths failed")
        }
    }
}

fn decode_container(bytes: &[u8]) -> Result<Vec<f32>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unrecognized audio container")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No decodable audio track")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .unwrap_or(TARGET_SAMPLE_RATE);
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder for audio track")?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut buf =
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
            // Recoverable corruption: skip the packet
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {e}");
            }
            Err(e) => return Err(e).context("Decoder failed"),
        }
    }

    if interleaved.is_empty() {
        anyhow::bail!("Audio track decoded to zero samples");
    }

    info!(
        "Decoded audio blob: {} samples, {}Hz, {} channels",
        interleaved.len(),
        sample_rate,
        channels
    );

    Ok(to_canonical(interleaved, sample_rate, channels))
}

/// Alternate decode path for blobs that are really WAV files.
fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>> {
    let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV header")?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read f32 WAV samples")?,
        SampleFormat::Int => reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read i16 WAV samples")?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
    };

    if interleaved.is_empty() {
        anyhow::bail!("WAV contained zero samples");
    }

    Ok(to_canonical(
        interleaved,
        spec.sample_rate,
        spec.channels as usize,
    ))
}

/// Downmix interleaved channels to mono, then decimate to the canonical rate.
fn to_canonical(interleaved: Vec<f32>, sample_rate: u32, channels: usize) -> Vec<f32> {
    let mono = if channels <= 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if sample_rate <= TARGET_SAMPLE_RATE {
        // Cannot upsample by decimation; the recognizer tolerates a low rate
        return mono;
    }

    let ratio = (sample_rate / TARGET_SAMPLE_RATE).max(1) as usize;
    mono.into_iter().step_by(ratio).collect()
}
