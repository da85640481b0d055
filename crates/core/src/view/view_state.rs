use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::selection::frame_selector::SelectionConfig;

/// Everything a [`LazyVideoView`] carries across a suspend/resume boundary.
///
/// The decoder handle is deliberately absent: resuming reopens the source
/// from `path` and validates that it still matches this state. Transforms
/// are not serializable and must be re-attached after resume.
///
/// [`LazyVideoView`]: crate::view::lazy_video_view::LazyVideoView
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub path: PathBuf,
    pub config: SelectionConfig,
    pub selection: Vec<usize>,
    pub frame_shape: [usize; 3],
    pub total_frames: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::frame_selector::{SelectionConfig, SelectionStyle};

    #[test]
    fn test_serde_round_trip() {
        let state = ViewState {
            path: PathBuf::from("/data/clip.mp4"),
            config: SelectionConfig {
                style: SelectionStyle::Spread,
                max_frames: 3,
                step_size: 10,
            },
            selection: vec![13, 41, 69],
            frame_shape: [120, 160, 3],
            total_frames: 83,
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_style_serializes_lowercase() {
        let state = ViewState {
            path: PathBuf::from("/data/clip.mp4"),
            config: SelectionConfig::with_style(SelectionStyle::All),
            selection: vec![0, 1],
            frame_shape: [2, 2, 3],
            total_frames: 2,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"all\""), "{json}");
    }
}
