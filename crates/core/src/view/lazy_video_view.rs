use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{s, Array4};
use thiserror::Error;

use crate::selection::frame_selector::{select_frames, SelectionConfig, SelectionError};
use crate::shared::frame::Frame;
use crate::video::domain::video_source::VideoSource;
use crate::video::infrastructure::ffmpeg_source::FfmpegSource;
use crate::view::frame_transform::FrameTransform;
use crate::view::view_state::ViewState;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unsupported indexing: expected {expected} axis ranges, got {actual}")]
    UnsupportedIndexing { expected: usize, actual: usize },
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("view has no source path to suspend from")]
    NotSuspendable,
    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// A memory-efficient, array-like view over a selected subset of a video's
/// frames.
///
/// The frame selection is computed once at construction; element and block
/// access decode exactly the frames they need, one at a time, through the
/// owned [`VideoSource`]. A view never buffers more than one decoded frame
/// plus the output of the current request, regardless of video length.
///
/// Views share nothing: callers that want parallel decode open one view per
/// worker. The `&mut self` on decoding methods reflects the single decoder
/// cursor per instance.
pub struct LazyVideoView {
    source: Box<dyn VideoSource>,
    config: SelectionConfig,
    selection: Vec<usize>,
    frame_shape: [usize; 3],
    total_frames: usize,
    transform: Option<Box<dyn FrameTransform>>,
}

impl LazyVideoView {
    /// Opens a video file through ffmpeg and selects frames per `config`.
    pub fn open(path: &Path, config: SelectionConfig) -> Result<Self, ViewError> {
        let source = FfmpegSource::open(path).map_err(|e| ViewError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_source(Box::new(source), config)
    }

    /// Builds a view over an already-open source.
    pub fn from_source(
        source: Box<dyn VideoSource>,
        config: SelectionConfig,
    ) -> Result<Self, ViewError> {
        let metadata = source.metadata();
        let total_frames = metadata.total_frames;
        let frame_shape = metadata.frame_shape();
        let selection = select_frames(total_frames, &config)?;
        Ok(Self {
            source,
            config,
            selection,
            frame_shape,
            total_frames,
            transform: None,
        })
    }

    /// Attaches a shape-preserving post-decode transform.
    pub fn with_transform(mut self, transform: Box<dyn FrameTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Number of selected frames.
    pub fn len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// `[selected frames, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        let [h, w, c] = self.frame_shape;
        [self.selection.len(), h, w, c]
    }

    /// Real frame numbers backing each view position.
    pub fn indices(&self) -> &[usize] {
        &self.selection
    }

    /// String identifiers for each view position, from the source's frame
    /// labels (decimal frame numbers for videos, file names for image
    /// lists).
    pub fn labels(&self) -> Vec<String> {
        self.selection
            .iter()
            .map(|&i| self.source.frame_label(i))
            .collect()
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Decodes the frame at view position `index`.
    pub fn get(&mut self, index: usize) -> Result<Frame, ViewError> {
        if index >= self.selection.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.selection.len(),
            });
        }
        self.decode_at(index)
    }

    /// Extracts a sub-block of the view, one `Range` per axis of
    /// [`shape()`](Self::shape).
    ///
    /// Ranges clamp to the axis extents the way slices do. Only the
    /// selected frames inside `ranges[0]` are decoded, each cropped by the
    /// spatial ranges before assembly. A request with any zero-length axis
    /// returns an empty block without touching the source.
    pub fn get_block(&mut self, ranges: &[Range<usize>]) -> Result<Array4<u8>, ViewError> {
        let shape = self.shape();
        if ranges.len() != shape.len() {
            return Err(ViewError::UnsupportedIndexing {
                expected: shape.len(),
                actual: ranges.len(),
            });
        }

        let spans: Vec<Range<usize>> = ranges
            .iter()
            .zip(shape.iter())
            .map(|(r, &dim)| {
                let start = r.start.min(dim);
                let end = r.end.min(dim);
                start..start.max(end)
            })
            .collect();

        let mut block: Array4<u8> = Array4::zeros((
            spans[0].len(),
            spans[1].len(),
            spans[2].len(),
            spans[3].len(),
        ));
        if block.is_empty() {
            return Ok(block);
        }

        log::debug!(
            "materializing block of {} frame(s) from {} selected",
            spans[0].len(),
            self.selection.len()
        );

        for (k, position) in spans[0].clone().enumerate() {
            let frame = self.decode_at(position)?;
            let pixels = frame.as_ndarray();
            let cropped = pixels.slice(s![
                spans[1].clone(),
                spans[2].clone(),
                spans[3].clone()
            ]);
            block.slice_mut(s![k, .., .., ..]).assign(&cropped);
        }

        Ok(block)
    }

    /// Iterates over the selected frames in order, decoding one at a time.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            view: self,
            position: 0,
        }
    }

    /// Captures the state needed to rebuild this view after the decoder
    /// handle is gone. Fails for sources without a filesystem path.
    pub fn suspend(&self) -> Result<ViewState, ViewError> {
        let path = self
            .source
            .metadata()
            .source_path
            .clone()
            .ok_or(ViewError::NotSuspendable)?;
        Ok(ViewState {
            path,
            config: self.config.clone(),
            selection: self.selection.clone(),
            frame_shape: self.frame_shape,
            total_frames: self.total_frames,
        })
    }

    /// Rebuilds a suspended view by reopening its file through ffmpeg.
    pub fn resume(state: ViewState) -> Result<Self, ViewError> {
        let source = FfmpegSource::open(&state.path).map_err(|e| ViewError::SourceUnavailable {
            path: state.path.clone(),
            reason: e.to_string(),
        })?;
        Self::resume_with_source(state, Box::new(source))
    }

    /// Rebuilds a suspended view over a caller-supplied source, validating
    /// that the source still matches the suspended state.
    pub fn resume_with_source(
        state: ViewState,
        source: Box<dyn VideoSource>,
    ) -> Result<Self, ViewError> {
        let metadata = source.metadata();
        if metadata.total_frames != state.total_frames
            || metadata.frame_shape() != state.frame_shape
        {
            return Err(ViewError::SourceUnavailable {
                path: state.path,
                reason: format!(
                    "source changed since suspension: {} frames of {:?}, expected {} of {:?}",
                    metadata.total_frames,
                    metadata.frame_shape(),
                    state.total_frames,
                    state.frame_shape
                ),
            });
        }
        Ok(Self {
            source,
            config: state.config,
            selection: state.selection,
            frame_shape: state.frame_shape,
            total_frames: state.total_frames,
            transform: None,
        })
    }

    /// Releases decoder resources; a later read reacquires them.
    pub fn close(&mut self) {
        self.source.close();
    }

    fn decode_at(&mut self, position: usize) -> Result<Frame, ViewError> {
        let real_index = self.selection[position];
        let frame = self
            .source
            .read_frame(real_index)
            .map_err(|e| ViewError::Decode {
                index: real_index,
                reason: e.to_string(),
            })?;
        Ok(match &self.transform {
            None => frame,
            Some(transform) => {
                let shape = frame.shape();
                let transformed = transform.apply(frame);
                debug_assert_eq!(
                    transformed.shape(),
                    shape,
                    "transform must preserve frame shape"
                );
                transformed
            }
        })
    }
}

/// Iterator over a view's selected frames, one decoded frame in flight at
/// a time.
pub struct Frames<'a> {
    view: &'a mut LazyVideoView,
    position: usize,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, ViewError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.view.len() {
            return None;
        }
        let item = self.view.decode_at(self.position);
        self.position += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::frame_selector::SelectionStyle;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::infrastructure::test_video::create_test_video;
    use crate::view::frame_transform::HorizontalFlip;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const FAKE_HEIGHT: u32 = 6;
    const FAKE_WIDTH: u32 = 8;

    /// Deterministic pixel pattern keyed on (frame, row, col, channel), so
    /// content checks can regenerate any frame without a decoder.
    fn pixel_value(index: usize, row: usize, col: usize, ch: usize) -> u8 {
        ((index * 31 + row * 7 + col * 3 + ch) % 251) as u8
    }

    fn fake_frame(index: usize) -> Frame {
        let (h, w) = (FAKE_HEIGHT as usize, FAKE_WIDTH as usize);
        let mut pixels = Vec::with_capacity(h * w * 3);
        for row in 0..h {
            for col in 0..w {
                for ch in 0..3 {
                    pixels.push(pixel_value(index, row, col, ch));
                }
            }
        }
        Frame::new(pixels, FAKE_HEIGHT, FAKE_WIDTH, 3, index)
    }

    struct FakeSource {
        metadata: VideoMetadata,
        reads: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(total_frames: usize) -> Self {
            Self {
                metadata: VideoMetadata {
                    width: FAKE_WIDTH,
                    height: FAKE_HEIGHT,
                    fps: 30.0,
                    total_frames,
                    codec: "fake".to_string(),
                    source_path: Some(PathBuf::from("/synthetic/video")),
                },
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn read_counter(&self) -> Arc<AtomicUsize> {
            self.reads.clone()
        }
    }

    impl VideoSource for FakeSource {
        fn metadata(&self) -> &VideoMetadata {
            &self.metadata
        }

        fn read_frame(&mut self, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
            if index >= self.metadata.total_frames {
                return Err(format!("frame index {index} out of range").into());
            }
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok(fake_frame(index))
        }

        fn close(&mut self) {}
    }

    fn view(total_frames: usize, config: SelectionConfig) -> LazyVideoView {
        LazyVideoView::from_source(Box::new(FakeSource::new(total_frames)), config).unwrap()
    }

    fn spread(max_frames: usize) -> SelectionConfig {
        SelectionConfig {
            style: SelectionStyle::Spread,
            max_frames,
            ..SelectionConfig::default()
        }
    }

    #[test]
    fn test_all_selection_exposes_every_frame() {
        let view = view(83, SelectionConfig::with_style(SelectionStyle::All));
        assert_eq!(view.len(), 83);
        let want: Vec<usize> = (0..83).collect();
        assert_eq!(view.indices(), &want[..]);
        assert_eq!(view.shape(), [83, 6, 8, 3]);
    }

    #[test]
    fn test_spread_selection_reference_indices() {
        let view = view(83, spread(3));
        assert_eq!(view.len(), 3);
        assert_eq!(view.indices(), &[13, 41, 69]);
        assert_eq!(view.shape(), [3, 6, 8, 3]);
    }

    #[test]
    fn test_get_translates_through_selection() {
        let mut view = view(83, spread(3));
        let frame = view.get(1).unwrap();
        assert_eq!(frame.index(), 41);
        assert_eq!(frame, fake_frame(41));
    }

    #[test]
    fn test_get_out_of_range() {
        let mut view = view(83, spread(3));
        let result = view.get(3);
        assert!(matches!(
            result,
            Err(ViewError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_labels_follow_selection() {
        let view = view(83, spread(3));
        assert_eq!(view.labels(), vec!["13", "41", "69"]);
    }

    #[test]
    fn test_block_matches_direct_decode_and_crop() {
        let mut view = view(10, SelectionConfig::with_style(SelectionStyle::All));
        let block = view.get_block(&[2..5, 1..4, 2..6, 0..3]).unwrap();

        assert_eq!(block.shape(), &[3, 3, 4, 3]);
        for (k, real) in (2..5).enumerate() {
            let frame = fake_frame(real);
            let pixels = frame.as_ndarray();
            let expected = pixels.slice(s![1..4, 2..6, 0..3]);
            assert_eq!(block.slice(s![k, .., .., ..]), expected, "frame {real}");
        }
    }

    #[test]
    fn test_block_respects_selection_mapping() {
        // spread over 83 picks real frames [13, 41, 69]; block rows 1..3
        // must come from 41 and 69.
        let mut view = view(83, spread(3));
        let block = view.get_block(&[1..3, 0..6, 0..8, 0..3]).unwrap();
        assert_eq!(block.shape(), &[2, 6, 8, 3]);
        assert_eq!(
            block.slice(s![0, .., .., ..]),
            fake_frame(41).as_ndarray()
        );
        assert_eq!(
            block.slice(s![1, .., .., ..]),
            fake_frame(69).as_ndarray()
        );
    }

    #[test]
    fn test_block_clamps_oversized_ranges() {
        let mut view = view(5, SelectionConfig::with_style(SelectionStyle::All));
        let block = view.get_block(&[0..100, 0..100, 0..100, 0..100]).unwrap();
        assert_eq!(block.shape(), &[5, 6, 8, 3]);
    }

    #[test]
    fn test_empty_block_never_touches_source() {
        let source = FakeSource::new(10);
        let reads = source.read_counter();
        let mut view = LazyVideoView::from_source(
            Box::new(source),
            SelectionConfig::with_style(SelectionStyle::All),
        )
        .unwrap();

        let block = view.get_block(&[0..0, 0..0, 0..0, 0..0]).unwrap();
        assert_eq!(block.shape(), &[0, 0, 0, 0]);
        assert_eq!(reads.load(Ordering::Relaxed), 0);

        // A zero-length spatial axis also yields an empty block undecoded.
        let block = view.get_block(&[0..10, 0..6, 3..3, 0..3]).unwrap();
        assert_eq!(block.shape(), &[10, 6, 0, 3]);
        assert_eq!(reads.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_block_decodes_only_requested_frames() {
        let source = FakeSource::new(10);
        let reads = source.read_counter();
        let mut view = LazyVideoView::from_source(
            Box::new(source),
            SelectionConfig::with_style(SelectionStyle::All),
        )
        .unwrap();

        view.get_block(&[3..6, 0..6, 0..8, 0..3]).unwrap();
        assert_eq!(reads.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_block_with_wrong_arity_is_unsupported() {
        let mut view = view(10, SelectionConfig::with_style(SelectionStyle::All));
        let result = view.get_block(&[0..2, 0..2]);
        assert!(matches!(
            result,
            Err(ViewError::UnsupportedIndexing {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_transform_applies_to_get_and_block() {
        let mut plain = view(10, SelectionConfig::with_style(SelectionStyle::All));
        let mut flipped = view(10, SelectionConfig::with_style(SelectionStyle::All))
            .with_transform(Box::new(HorizontalFlip));

        let expected = HorizontalFlip.apply(plain.get(4).unwrap());
        assert_eq!(flipped.get(4).unwrap(), expected);

        let block = flipped.get_block(&[4..5, 0..6, 0..8, 0..3]).unwrap();
        assert_eq!(block.slice(s![0, .., .., ..]), expected.as_ndarray());
    }

    #[test]
    fn test_frames_iterator_yields_selection_in_order() {
        let mut view = view(83, spread(3));
        let frames: Vec<Frame> = view.frames().map(|f| f.unwrap()).collect();
        let indices: Vec<usize> = frames.iter().map(Frame::index).collect();
        assert_eq!(indices, vec![13, 41, 69]);
    }

    #[test]
    fn test_suspend_resume_preserves_view() {
        let mut before = view(83, spread(3));
        let reference = before.get(1).unwrap();

        let state = before.suspend().unwrap();
        let mut after =
            LazyVideoView::resume_with_source(state, Box::new(FakeSource::new(83))).unwrap();

        assert_eq!(after.len(), before.len());
        assert_eq!(after.shape(), before.shape());
        assert_eq!(after.indices(), before.indices());
        assert_eq!(after.get(1).unwrap(), reference);
    }

    #[test]
    fn test_resume_rejects_changed_source() {
        let view = view(83, spread(3));
        let state = view.suspend().unwrap();
        let result = LazyVideoView::resume_with_source(state, Box::new(FakeSource::new(82)));
        assert!(matches!(result, Err(ViewError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_resume_missing_file_is_source_unavailable() {
        let view = view(5, spread(2));
        let state = view.suspend().unwrap();
        // `/synthetic/video` does not exist on disk
        let result = LazyVideoView::resume(state);
        assert!(matches!(result, Err(ViewError::SourceUnavailable { .. })));
    }

    // ── ffmpeg integration ───────────────────────────────────────────

    #[test]
    fn test_open_video_all_and_spread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 83, 64, 48, 30.0);

        let view = LazyVideoView::open(&path, SelectionConfig::with_style(SelectionStyle::All))
            .unwrap();
        assert_eq!(view.len(), 83);
        let want: Vec<usize> = (0..83).collect();
        assert_eq!(view.indices(), &want[..]);

        let mut view = LazyVideoView::open(&path, spread(3)).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.indices(), &[13, 41, 69]);
        assert_eq!(view.shape(), [3, 48, 64, 3]);
        assert_eq!(view.get(0).unwrap().index(), 13);
    }

    #[test]
    fn test_suspend_resume_through_serialization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        create_test_video(&path, 20, 64, 48, 30.0);

        let mut before = LazyVideoView::open(&path, spread(4)).unwrap();
        let reference = before.get(2).unwrap();

        let json = serde_json::to_string(&before.suspend().unwrap()).unwrap();
        drop(before);

        let state: ViewState = serde_json::from_str(&json).unwrap();
        let mut after = LazyVideoView::resume(state).unwrap();

        assert_eq!(after.len(), 4);
        assert_eq!(after.shape(), [4, 48, 64, 3]);
        assert_eq!(after.get(2).unwrap(), reference);
    }
}
