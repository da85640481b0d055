use ndarray::ArrayD;
use thiserror::Error;

use crate::annotation::annotation::{Annotation, AnnotationTrack};
use crate::container::frame_container::{ContainerError, FrameContainer};
use crate::shared::frame::Frame;
use crate::view::lazy_video_view::{LazyVideoView, ViewError};

/// Frame-wise processing battery applied to a whole selected sequence.
///
/// The output must align 1:1 with the input: one entry per frame, `None`
/// where processing produced nothing for that frame. Changing the count is
/// a contract violation the use case rejects.
pub trait SequenceProcessor: Send {
    fn process(
        &mut self,
        frames: &[Frame],
        annotations: &[Option<Annotation>],
    ) -> Result<Vec<Option<ArrayD<u8>>>, Box<dyn std::error::Error>>;
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("processor returned {actual} elements for {expected} input frames")]
    TransformedLengthMismatch { expected: usize, actual: usize },
    #[error("processor failed: {0}")]
    Processor(String),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Runs an image-processing battery over a video view and wraps the
/// results in a [`FrameContainer`].
///
/// Frames are decoded through the view's selection, caller-supplied
/// annotations are aligned to the selected real frame indices, and absent
/// processor outputs are dropped together with their indices — the only
/// filtering permitted after the 1:1 length check.
pub struct ProcessVideoUseCase {
    processor: Box<dyn SequenceProcessor>,
}

impl ProcessVideoUseCase {
    pub fn new(processor: Box<dyn SequenceProcessor>) -> Self {
        Self { processor }
    }

    pub fn execute(
        &mut self,
        view: &mut LazyVideoView,
        annotations: Option<&AnnotationTrack>,
    ) -> Result<FrameContainer<u8>, PipelineError> {
        let mut frames = Vec::with_capacity(view.len());
        for position in 0..view.len() {
            frames.push(view.get(position)?);
        }

        let aligned = match annotations {
            Some(track) => align_annotations(track, view.indices()),
            None => vec![None; frames.len()],
        };

        let outputs = self
            .processor
            .process(&frames, &aligned)
            .map_err(|e| PipelineError::Processor(e.to_string()))?;

        if outputs.len() != frames.len() {
            return Err(PipelineError::TransformedLengthMismatch {
                expected: frames.len(),
                actual: outputs.len(),
            });
        }

        let labels = view.labels();
        let mut data = Vec::with_capacity(outputs.len());
        let mut indices = Vec::with_capacity(outputs.len());
        for (output, label) in outputs.into_iter().zip(labels) {
            if let Some(output) = output {
                data.push(Some(output));
                indices.push(label);
            } else {
                log::debug!("dropping frame {label}: no processor output");
            }
        }

        Ok(FrameContainer::new(data, indices)?)
    }
}

/// Looks up each real frame index in an annotation track by its decimal
/// string id. Missing frames align to `None`.
pub fn align_annotations(track: &AnnotationTrack, indices: &[usize]) -> Vec<Option<Annotation>> {
    indices
        .iter()
        .map(|&real| {
            let id = real.to_string();
            track
                .iter()
                .find(|(key, _)| *key == id)
                .and_then(|(_, annot)| annot.clone())
        })
        .collect()
}
