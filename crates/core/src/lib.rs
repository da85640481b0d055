//! Adaptation layer that lets image-based biometric algorithms operate on
//! video sequences.
//!
//! Videos are opened as lazy, array-like views that decode only a selected
//! subset of frames ([`view::lazy_video_view::LazyVideoView`]); processed
//! frames travel in `(data, indices)` containers that persist to a single
//! NPZ file ([`container::frame_container::FrameContainer`]); per-frame
//! annotations are smoothed over detection gaps
//! ([`annotation::normalizer::normalize_annotations`]).

pub mod annotation;
pub mod container;
pub mod pipeline;
pub mod selection;
pub mod shared;
pub mod video;
pub mod view;
