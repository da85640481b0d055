use crate::annotation::annotation::AnnotationTrack;
use crate::annotation::annotator::{default_validator, AnnotateError, FrameAnnotator, Validator};
use crate::annotation::normalizer::normalize_annotations;
use crate::shared::frame::Frame;
use crate::view::lazy_video_view::LazyVideoView;

/// Runs a single image annotator over every frame of a video.
///
/// Frame ids are the decimal positions of the frames handed in. With
/// normalization enabled, gaps are filled per
/// [`normalize_annotations`]; only enable it when annotating *all* frames
/// of the video — over a sparse selection the carried values would span
/// unrelated moments.
pub struct VideoAnnotator {
    annotator: Box<dyn FrameAnnotator>,
    validator: Validator,
    normalize: bool,
    max_age: Option<usize>,
}

impl VideoAnnotator {
    pub fn new(annotator: Box<dyn FrameAnnotator>) -> Self {
        Self {
            annotator,
            validator: default_validator(),
            normalize: false,
            max_age: None,
        }
    }

    /// Enables gap filling with the given staleness window (`None` =
    /// carry forward without limit).
    pub fn with_normalization(mut self, max_age: Option<usize>) -> Self {
        self.normalize = true;
        self.max_age = max_age;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Annotates every selected frame of a view, decoding one at a time.
    pub fn annotate_view(
        &mut self,
        view: &mut LazyVideoView,
    ) -> Result<AnnotationTrack, AnnotateError> {
        let mut track = Vec::with_capacity(view.len());
        for position in 0..view.len() {
            let frame = view.get(position)?;
            self.annotate_into(position, &frame, &mut track)?;
        }
        Ok(self.finish(track))
    }

    /// Annotates an in-memory frame sequence.
    pub fn annotate_frames(&mut self, frames: &[Frame]) -> Result<AnnotationTrack, AnnotateError> {
        let mut track = Vec::with_capacity(frames.len());
        for (position, frame) in frames.iter().enumerate() {
            self.annotate_into(position, frame, &mut track)?;
        }
        Ok(self.finish(track))
    }

    fn annotate_into(
        &mut self,
        position: usize,
        frame: &Frame,
        track: &mut AnnotationTrack,
    ) -> Result<(), AnnotateError> {
        let id = position.to_string();
        log::debug!("annotating frame {id}");
        let annot = self
            .annotator
            .annotate(frame)
            .map_err(|e| AnnotateError::Annotator {
                id: id.clone(),
                reason: e.to_string(),
            })?;
        track.push((id, annot));
        Ok(())
    }

    fn finish(&self, track: AnnotationTrack) -> AnnotationTrack {
        if !self.normalize {
            return track;
        }
        let validator = &self.validator;
        normalize_annotations(&track, |a| validator(a), self.max_age)
    }
}
