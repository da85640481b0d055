use thiserror::Error;

use crate::annotation::annotation::Annotation;
use crate::shared::frame::Frame;
use crate::view::lazy_video_view::ViewError;

/// Minimum accepted bounding-box size for the default validator.
pub const DEFAULT_MIN_BOX_HEIGHT: f64 = 32.0;
pub const DEFAULT_MIN_BOX_WIDTH: f64 = 32.0;

/// Produces an annotation for a single frame.
///
/// `Ok(None)` means "no detection" and is a first-class result, not a
/// failure; `Err` is reserved for the annotator itself breaking.
/// Implementations may be stateful, hence `&mut self`.
pub trait FrameAnnotator: Send {
    fn annotate(&mut self, frame: &Frame) -> Result<Option<Annotation>, Box<dyn std::error::Error>>;
}

/// Decides whether an annotation is good enough to accept.
pub type Validator = Box<dyn Fn(&Annotation) -> bool + Send>;

/// Accepts annotations whose bounding box is at least `min_height` by
/// `min_width`.
pub fn min_box_validator(min_height: f64, min_width: f64) -> Validator {
    Box::new(move |annot| annot.height() >= min_height && annot.width() >= min_width)
}

pub fn default_validator() -> Validator {
    min_box_validator(DEFAULT_MIN_BOX_HEIGHT, DEFAULT_MIN_BOX_WIDTH)
}

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error(transparent)]
    Frame(#[from] ViewError),
    #[error("annotator failed on frame {id}: {reason}")]
    Annotator { id: String, reason: String },
}
