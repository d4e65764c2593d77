extern crate ffmpeg_next;

use std::path::Path;
use std::time::Duration;

use super::{Frame, FrameSource, VideoBackend};
use crate::Result;

/// Wraps the `FFmpeg` video decoder along with a converter to RGB24.
struct VideoDecoder {
    decoder: ffmpeg_next::codec::decoder::Video,
    converter: ffmpeg_next::software::scaling::context::Context,
}

impl VideoDecoder {
    fn from_stream(stream: ffmpeg_next::format::stream::Stream) -> Result<Self> {
        let ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = ctx.decoder().video()?;
        let converter = decoder.converter(ffmpeg_next::format::Pixel::RGB24)?;
        Ok(Self { decoder, converter })
    }

    fn send_packet(&mut self, packet: &ffmpeg_next::packet::Packet) -> Result<()> {
        Ok(self.decoder.send_packet(packet)?)
    }

    fn send_eof(&mut self) -> Result<()> {
        Ok(self.decoder.send_eof()?)
    }

    fn receive_frame(&mut self, frame: &mut ffmpeg_next::frame::Video) -> Result<()> {
        Ok(self.decoder.receive_frame(frame)?)
    }

    fn flush(&mut self) {
        self.decoder.flush();
    }

    // Converts a decoded frame into a tightly packed RGB image.
    fn to_rgb(&mut self, frame: &ffmpeg_next::frame::Video) -> Option<Frame> {
        let mut rgb = ffmpeg_next::frame::Video::empty();
        if let Err(e) = self.converter.run(frame, &mut rgb) {
            tracing::debug!("failed to convert frame: {}", e);
            return None;
        }

        let (width, height) = (rgb.width(), rgb.height());
        let row_len = width as usize * 3;
        let stride = rgb.stride(0);
        if row_len == 0 || stride < row_len {
            return None;
        }

        // Each row in the frame buffer is padded out to `stride` bytes.
        let mut buf = Vec::with_capacity(row_len * height as usize);
        for row in rgb.data(0).chunks(stride).take(height as usize) {
            buf.extend_from_slice(&row[..row_len]);
        }
        Frame::from_raw(width, height, buf)
    }
}

/// A video file opened with `FFmpeg`. The format context and decoder are released on drop.
struct FfmpegSource {
    input: ffmpeg_next::format::context::Input,
    decoder: VideoDecoder,
    stream_idx: usize,
    time_base: ffmpeg_next::Rational,
    frame_rate: f64,
    start_pts: i64,
    frame_count: u64,
}

impl FfmpegSource {
    fn open(path: &Path) -> Result<Self> {
        let input = ffmpeg_next::format::input(&path)?;
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(ffmpeg_next::Error::StreamNotFound)?;

        let stream_idx = stream.index();
        let time_base = stream.time_base();
        let frame_rate = f64::from(stream.avg_frame_rate());
        let start_pts = if stream.start_time() == ffmpeg_next::ffi::AV_NOPTS_VALUE {
            0
        } else {
            stream.start_time()
        };
        let frame_count = Self::count_frames(&input, &stream, frame_rate);
        let decoder = VideoDecoder::from_stream(stream)?;

        tracing::debug!(frame_count, frame_rate, "opened {}", path.display());

        Ok(Self {
            input,
            decoder,
            stream_idx,
            time_base,
            frame_rate,
            start_pts,
            frame_count,
        })
    }

    // Uses the frame count stored in the container if there is one. Otherwise, it is
    // estimated from the duration and the average frame rate.
    fn count_frames(
        input: &ffmpeg_next::format::context::Input,
        stream: &ffmpeg_next::format::stream::Stream,
        frame_rate: f64,
    ) -> u64 {
        if stream.frames() > 0 {
            return stream.frames() as u64;
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return 0;
        }

        // As an example, Matroska does not store the duration in the stream; it
        // only stores it in the format context.
        let duration = if stream.duration() > 0 {
            crate::util::to_timestamp(stream.time_base(), stream.duration())
        } else if input.duration() > 0 {
            Duration::from_secs_f64(
                input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE),
            )
        } else {
            return 0;
        };

        (duration.as_secs_f64() * frame_rate) as u64
    }
}

impl FrameSource for FfmpegSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn decode_frame(&mut self, index: u64) -> Option<Frame> {
        let _g = tracing::span!(tracing::Level::TRACE, "decode_frame", index).entered();

        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return None;
        }
        let time_base = f64::from(self.time_base);
        let target_pts = self.start_pts + (index as f64 / self.frame_rate / time_base) as i64;

        // Seek (in AV_TIME_BASE units) to the closest keyframe at or before the target and
        // decode forward from there.
        let seek_ts =
            (target_pts as f64 * time_base * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;
        if let Err(e) = self.input.seek(seek_ts, ..seek_ts) {
            tracing::debug!("failed to seek to frame {}: {}", index, e);
            return None;
        }
        self.decoder.flush();

        let reached = |frame: &ffmpeg_next::frame::Video| {
            frame.timestamp().map_or(true, |ts| ts >= target_pts)
        };

        let mut frame = ffmpeg_next::frame::Video::empty();
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_idx {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            while self.decoder.receive_frame(&mut frame).is_ok() {
                if reached(&frame) {
                    return self.decoder.to_rgb(&frame);
                }
            }
        }

        // End of stream: drain whatever the decoder is still holding.
        if self.decoder.send_eof().is_ok() {
            while self.decoder.receive_frame(&mut frame).is_ok() {
                if reached(&frame) {
                    return self.decoder.to_rgb(&frame);
                }
            }
        }

        None
    }
}

/// Decodes video frames using `FFmpeg`.
///
/// `ffmpeg_next::init` must have been called before use; see
/// [Capabilities::probe](crate::Capabilities::probe).
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn open(&self, path: &Path) -> Option<Box<dyn FrameSource>> {
        match FfmpegSource::open(path) {
            Ok(source) => Some(Box::new(source)),
            Err(e) => {
                tracing::debug!("unable to open {} for decoding: {}", path.display(), e);
                None
            }
        }
    }
}
