pub mod frame;
pub mod video_metadata;
