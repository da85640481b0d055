use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_source::VideoSource;

/// Presents an ordered list of image files as a video, one frame per file.
///
/// Some corpora ship sequences as frame-per-file image sets rather than
/// encoded videos; this adapter lets the view layer treat both uniformly.
/// Only the first image's header is read at open time; member images are
/// decoded lazily per `read_frame`. Frame labels are the file names, which
/// is how string identifiers reach containers and annotation tracks.
pub struct ImageListSource {
    paths: Vec<PathBuf>,
    metadata: VideoMetadata,
}

impl ImageListSource {
    pub fn open(paths: Vec<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let first = paths.first().ok_or("image list is empty")?;
        let (width, height) = image::image_dimensions(first)?;

        let metadata = VideoMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: paths.len(),
            codec: "image".to_string(),
            source_path: first.parent().map(Path::to_path_buf),
        };

        Ok(Self { paths, metadata })
    }
}

impl VideoSource for ImageListSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
        let total = self.paths.len();
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| format!("frame index {index} out of range (0..{total})"))?;

        let rgb = image::open(path)?.to_rgb8();
        if (rgb.width(), rgb.height()) != (self.metadata.width, self.metadata.height) {
            return Err(format!(
                "image {} is {}x{}, expected {}x{}",
                path.display(),
                rgb.width(),
                rgb.height(),
                self.metadata.width,
                self.metadata.height
            )
            .into());
        }

        let (width, height) = (rgb.width(), rgb.height());
        Ok(Frame::new(rgb.into_raw(), height, width, 3, index))
    }

    fn frame_label(&self, index: usize) -> String {
        self.paths
            .get(index)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| index.to_string())
    }

    fn close(&mut self) {
        // No handles are held between reads.
    }
}
