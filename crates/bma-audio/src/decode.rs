use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use bma_core::signal::SampleBuffer;
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file and keep a single channel.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia. Samples are decoded as
/// normalized f32 and multiplied by `amplitude_scale` (32768.0 gives back
/// 16-bit PCM values). `channel` is clamped to the track's channel count.
/// The sample rate is kept as is: beat windows are counted in samples.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
///
/// # Example
/// ```no_run
/// use bma_audio::decode::decode_file;
/// let buffer = decode_file("song.wav", 0, 32768.0).unwrap();
/// println!("{} samples @ {} Hz", buffer.len(), buffer.sample_rate);
/// ```
pub fn decode_file(
    path: impl AsRef<Path>,
    channel: usize,
    amplitude_scale: f32,
) -> Result<SampleBuffer> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track found")?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Audio track has no sample rate")?;
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);
    if channel >= channels {
        log::warn!(
            "Canal {channel} absent ({channels} canaux), utilisation du canal {}",
            channels - 1
        );
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let track_id = track.id;
    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<InterleavedBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse the buffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(InterleavedBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let buffer =
        SampleBuffer::from_interleaved(&interleaved, channels, channel, amplitude_scale, sample_rate);

    log::info!(
        "Decoded {} samples @ {}Hz ({} channel(s)) from {}",
        buffer.len(),
        sample_rate,
        channels,
        path.display()
    );

    Ok(buffer)
}
