use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_FRAMES: usize = 20;
pub const DEFAULT_STEP_SIZE: usize = 10;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("invalid selection style: {0}")]
    InvalidStyle(String),
    #[error("step size must be >= 1")]
    InvalidStepSize,
}

/// How frames are picked out of a video.
///
/// * `First`: the first `max_frames` frames.
/// * `Spread`: `max_frames` frames evenly spaced over the whole video.
/// * `Step`: every `step_size`-th frame starting at `step_size / 2`,
///   truncated to `max_frames` entries.
/// * `All`: every frame, `max_frames` ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStyle {
    First,
    Spread,
    Step,
    All,
}

impl FromStr for SelectionStyle {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "spread" => Ok(Self::Spread),
            "step" => Ok(Self::Step),
            "all" => Ok(Self::All),
            other => Err(SelectionError::InvalidStyle(other.to_string())),
        }
    }
}

impl fmt::Display for SelectionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::First => "first",
            Self::Spread => "spread",
            Self::Step => "step",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

/// Frame-selection parameters. The defaults pick 20 frames spread over the
/// whole video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub style: SelectionStyle,
    pub max_frames: usize,
    /// Only used with [`SelectionStyle::Step`].
    pub step_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            style: SelectionStyle::Spread,
            max_frames: DEFAULT_MAX_FRAMES,
            step_size: DEFAULT_STEP_SIZE,
        }
    }
}

impl SelectionConfig {
    pub fn with_style(style: SelectionStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }
}

/// Returns the indices of the frames to select from a video with `count`
/// frames.
///
/// The result is strictly increasing, duplicate-free and bounded by
/// `count`. Pure; performs no I/O.
pub fn select_frames(count: usize, config: &SelectionConfig) -> Result<Vec<usize>, SelectionError> {
    let indices = match config.style {
        SelectionStyle::First => (0..count.min(config.max_frames)).collect(),
        SelectionStyle::Spread => spread_indices(count, config.max_frames),
        SelectionStyle::Step => {
            if config.step_size == 0 {
                return Err(SelectionError::InvalidStepSize);
            }
            (config.step_size / 2..count)
                .step_by(config.step_size)
                .take(config.max_frames)
                .collect()
        }
        SelectionStyle::All => (0..count).collect(),
    };
    Ok(indices)
}

/// `desired` indices evenly spaced over `0..count`, each the floor of
/// `(i + 0.5) * count / desired`. Returns every index when `desired`
/// covers the whole range.
fn spread_indices(count: usize, desired: usize) -> Vec<usize> {
    if desired >= count {
        return (0..count).collect();
    }
    (0..desired)
        .map(|i| (2 * i + 1) * count / (2 * desired))
        .collect()
}
