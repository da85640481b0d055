use crate::annotation::annotation::{Annotation, AnnotationTrack};
use crate::annotation::annotator::{default_validator, AnnotateError, FrameAnnotator, Validator};
use crate::shared::frame::Frame;
use crate::view::lazy_video_view::LazyVideoView;

pub const DEFAULT_FAILOVER_MAX_AGE: usize = 15;

/// Tries several annotators per frame, in listed order, with carry-forward
/// between frames.
///
/// For each frame the first annotator whose output validates wins. When an
/// annotator produces nothing usable, the previous frame's accepted value
/// carries forward while it is younger than `max_age` — and the remaining
/// annotators are *not* consulted for that frame. Only once the carried
/// value has gone stale is it cleared and the next annotator in the list
/// given a chance. The carried state is shared across annotators, not kept
/// per annotator.
///
/// Mixing annotators with differently-calibrated bounding boxes makes the
/// output jump between conventions; keep the list homogeneous.
pub struct FailoverAnnotator {
    annotators: Vec<Box<dyn FrameAnnotator>>,
    validator: Validator,
    max_age: usize,
}

impl FailoverAnnotator {
    /// `max_age` must be at least 1; an unbounded window would make the
    /// fallback annotators unreachable.
    pub fn new(
        annotators: Vec<Box<dyn FrameAnnotator>>,
        max_age: usize,
    ) -> Result<Self, &'static str> {
        if max_age < 1 {
            return Err("max_age must be >= 1");
        }
        Ok(Self {
            annotators,
            validator: default_validator(),
            max_age,
        })
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
        let mut current: Option<Annotation> = None;
        let mut age: usize = 0;
        for position in 0..view.len() {
            let frame = view.get(position)?;
            self.annotate_into(position, &frame, &mut current, &mut age, &mut track)?;
        }
        Ok(track)
    }

    /// Annotates an in-memory frame sequence.
    pub fn annotate_frames(&mut self, frames: &[Frame]) -> Result<AnnotationTrack, AnnotateError> {
        let mut track = Vec::with_capacity(frames.len());
        let mut current: Option<Annotation> = None;
        let mut age: usize = 0;
        for (position, frame) in frames.iter().enumerate() {
            self.annotate_into(position, frame, &mut current, &mut age, &mut track)?;
        }
        Ok(track)
    }

    fn annotate_into(
        &mut self,
        position: usize,
        frame: &Frame,
        current: &mut Option<Annotation>,
        age: &mut usize,
        track: &mut AnnotationTrack,
    ) -> Result<(), AnnotateError> {
        let id = position.to_string();
        for (nth, annotator) in self.annotators.iter_mut().enumerate() {
            let annot = annotator
                .annotate(frame)
                .map_err(|e| AnnotateError::Annotator {
                    id: id.clone(),
                    reason: e.to_string(),
                })?;
            match annot {
                Some(a) if (self.validator)(&a) => {
                    *current = Some(a);
                    *age = 0;
                    break;
                }
                _ if *age < self.max_age => {
                    // carry the previous frame's value; later annotators
                    // are skipped for this frame
                    *age += 1;
                    break;
                }
                _ => {
                    log::debug!("annotator {nth} failed on frame {id} past the carry window");
                    *current = None;
                }
            }
        }
        track.push((id, current.clone()));
        Ok(())
    }
}
