extern crate chromaprint_rust;
extern crate ffmpeg_next;

use chromaprint_rust as chromaprint;

use std::path::Path;
use std::time::Duration;

use super::AudioFingerprinter;
use crate::{Error, Result};

/// Thin wrapper around the native `FFmpeg` audio decoder.
struct Decoder {
    decoder: ffmpeg_next::codec::decoder::Audio,
}

impl Decoder {
    fn from_stream(stream: ffmpeg_next::format::stream::Stream) -> Result<Self> {
        let ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = ctx.decoder().audio()?;
        Ok(Self { decoder })
    }

    fn send_packet(&mut self, packet: &ffmpeg_next::packet::Packet) -> Result<()> {
        Ok(self.decoder.send_packet(packet)?)
    }

    fn send_eof(&mut self) -> Result<()> {
        Ok(self.decoder.send_eof()?)
    }

    fn receive_frame(&mut self, frame: &mut ffmpeg_next::frame::Audio) -> Result<()> {
        Ok(self.decoder.receive_frame(frame)?)
    }

    fn resampler(&self) -> Result<ffmpeg_next::software::resampling::Context> {
        Ok(self.decoder.resampler(
            ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
            ffmpeg_next::ChannelLayout::STEREO,
            self.decoder.rate(),
        )?)
    }
}

fn chromaprint_error(e: impl std::fmt::Debug) -> Error {
    Error::Chromaprint(format!("{:?}", e))
}

/// Returns the compressed base64 fingerprint of a finished context, or `None` if no audio
/// was fingerprinted.
fn encode(ctx: &chromaprint::Context) -> Result<Option<String>> {
    let raw = ctx.get_fingerprint_raw().map_err(chromaprint_error)?;
    if raw.get().is_empty() {
        return Ok(None);
    }
    let fingerprint = ctx.get_fingerprint_base64().map_err(chromaprint_error)?;
    let encoded = fingerprint.get().map_err(chromaprint_error)?;
    Ok(Some(encoded.to_string()))
}

/// Resamples decoded audio to packed S16 stereo and feeds it to Chromaprint.
struct Feeder {
    resampler: ffmpeg_next::software::resampling::Context,
    resampled: ffmpeg_next::frame::Audio,
    sample_rate: u32,
}

impl Feeder {
    fn feed(
        &mut self,
        frame: &ffmpeg_next::frame::Audio,
        fingerprinter: &mut chromaprint::Context,
    ) -> Result<()> {
        let mut delay = match self.resampler.run(frame, &mut self.resampled) {
            Ok(v) => v,
            // If resampling fails due to changed input, construct a new resampler for this
            // frame and keep using it from here on.
            Err(ffmpeg_next::Error::InputChanged) => {
                let mut resampler = frame.resampler(
                    ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
                    ffmpeg_next::ChannelLayout::STEREO,
                    self.sample_rate,
                )?;
                let delay = resampler.run(frame, &mut self.resampled)?;
                self.resampler = resampler;
                delay
            }
            Err(e) => return Err(e.into()),
        };

        loop {
            // Obtain a slice of raw bytes in interleaved format.
            // We have two channels, so the bytes look like this: c1, c1, c2, c2, c1, c1, c2, c2, ...
            //
            // Note that `data` is a fixed-size buffer. To get the _actual_ sample bytes, we need to use:
            // a) sample count, b) channel count, and c) number of bytes per S16 sample.
            let raw_samples = &self.resampled.data(0)
                [..self.resampled.samples() * self.resampled.channels() as usize * 2];

            // SAFETY: The resampler was explicitly configured to produce S16 samples (see above).
            let (_, samples, _) = unsafe { raw_samples.align_to::<i16>() };
            fingerprinter.feed(samples).map_err(chromaprint_error)?;

            if delay.is_none() {
                break;
            }
            delay = self.resampler.flush(&mut self.resampled)?;
        }

        Ok(())
    }
}

/// Fingerprints audio in-process: the best audio stream is decoded with `FFmpeg` and fed
/// to the Chromaprint library.
///
/// The key is the compressed, base64-encoded fingerprint, the same form `fpcalc` prints.
#[derive(Clone, Copy, Debug, Default)]
pub struct Chromaprint;

impl Chromaprint {
    fn compute(path: &Path, length: Duration) -> Result<Option<String>> {
        let span = tracing::span!(tracing::Level::TRACE, "chromaprint");
        let _enter = span.enter();

        let mut ctx = ffmpeg_next::format::input(&path)?;
        let stream = match ctx.streams().best(ffmpeg_next::media::Type::Audio) {
            Some(stream) => stream,
            None => return Ok(None),
        };
        let stream_idx = stream.index();
        let time_base = f64::from(stream.time_base());
        let mut decoder = Decoder::from_stream(stream)?;

        let sample_rate = decoder.decoder.rate();
        let mut feeder = Feeder {
            resampler: decoder.resampler()?,
            resampled: ffmpeg_next::frame::Audio::empty(),
            sample_rate,
        };

        let mut fingerprinter = chromaprint::Context::default();
        fingerprinter
            .start(sample_rate, 2)
            .map_err(chromaprint_error)?;

        // Compute the end timestamp in time base units. This allows for quick
        // comparison with the PTS.
        let end_timestamp = (length.as_secs_f64() / time_base) as i64;

        tracing::debug!(
            "fingerprinting first {} of {}",
            crate::util::format_time(length),
            path.display()
        );

        let mut frame = ffmpeg_next::frame::Audio::empty();
        let audio_packets = ctx
            .packets()
            .filter(|(s, _)| s.index() == stream_idx)
            .map(|(_, p)| p)
            .take_while(|p| p.pts().map_or(true, |pts| pts < end_timestamp));

        for p in audio_packets {
            decoder.send_packet(&p)?;
            while decoder.receive_frame(&mut frame).is_ok() {
                feeder.feed(&frame, &mut fingerprinter)?;
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut frame).is_ok() {
            feeder.feed(&frame, &mut fingerprinter)?;
        }

        fingerprinter.finish().map_err(chromaprint_error)?;
        encode(&fingerprinter)
    }
}

impl AudioFingerprinter for Chromaprint {
    fn name(&self) -> &'static str {
        "chromaprint"
    }

    fn fingerprint(&self, path: &Path, length: Duration) -> Option<String> {
        match Self::compute(path, length) {
            Ok(fp) => fp,
            Err(e) => {
                tracing::debug!("chromaprint failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}
