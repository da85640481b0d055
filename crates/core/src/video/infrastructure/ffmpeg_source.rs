use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Decoding is forward-only: frames come out in decode order through an
/// internal cursor, and a request for an earlier frame rewinds by
/// reopening the input. The decoder context is acquired lazily on the
/// first read and dropped on [`VideoSource::close`], rewind or decode
/// failure, so it never outlives the struct that owns it.
pub struct FfmpegSource {
    path: PathBuf,
    metadata: VideoMetadata,
    state: Option<DecodeState>,
}

// Safety: FfmpegSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    /// Opens a video file and probes its metadata. No decoder state is
    /// created until the first frame is read.
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let (stream_index, declared, fps, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("no video stream found")?;

            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = codec_ctx.decoder().video()?;

            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };

            (stream.index(), stream.frames(), fps, decoder)
        };
        drop(ictx);

        // Some containers omit nb_frames; fall back to a demux-only
        // packet-count pass.
        let total_frames = if declared > 0 {
            declared as usize
        } else {
            count_video_packets(path, stream_index)?
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            state: None,
        })
    }

    fn open_state(&self) -> Result<DecodeState, Box<dyn std::error::Error>> {
        let ictx = ffmpeg_next::format::input(&self.path)?;

        let (stream_index, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("no video stream found")?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            (stream.index(), codec_ctx.decoder().video()?)
        };

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(DecodeState {
            input: ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            next_index: 0,
            flushing: false,
        })
    }
}

impl VideoSource for FfmpegSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
        let total = self.metadata.total_frames;
        if index >= total {
            return Err(format!("frame index {index} out of range (0..{total})").into());
        }

        if self.state.as_ref().map_or(true, |s| s.next_index > index) {
            log::debug!("reopening {} to reach frame {index}", self.path.display());
            self.state = Some(self.open_state()?);
        }
        let state = self.state.as_mut().expect("decode state opened above");

        match advance_to(state, index) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // A failed decode leaves the cursor unreliable; release the
                // context so the next read starts clean.
                self.state = None;
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        self.state = None;
    }
}

fn advance_to(state: &mut DecodeState, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    while let Some(frame) = state.decode_next()? {
        if frame.index() == index {
            return Ok(frame);
        }
    }
    Err(format!("decoder ended before frame {index}").into())
}

struct DecodeState {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    next_index: usize,
    flushing: bool,
}

impl DecodeState {
    /// Decodes the next frame in stream order, or `None` at end of stream.
    fn decode_next(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
            if self.flushing {
                return Ok(None);
            }

            let mut fed = false;
            while let Some((stream, packet)) = self.input.packets().next() {
                if stream.index() != self.stream_index {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                fed = true;
                break;
            }
            if !fed {
                let _ = self.decoder.send_eof();
                self.flushing = true;
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.height, self.width, 3, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

/// Demuxes the file once, counting packets of the given stream. Used when
/// the container does not declare a frame count; no decoding happens.
fn count_video_packets(
    path: &Path,
    stream_index: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut ictx = ffmpeg_next::format::input(path)?;
    let count = ictx
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count();
    Ok(count)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride >
/// width*3); the padding is stripped to produce a tightly-packed buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
