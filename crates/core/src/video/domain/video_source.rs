use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Random-access frame supply for a video, image list or equivalent.
///
/// Implementations handle I/O details (codec, container format, file
/// layout) while the view layer works with the abstract `Frame` and
/// `VideoMetadata` types. Sequential codecs may satisfy `read_frame` by
/// decoding forward and rewinding via reopen; callers that care about
/// decode cost should request indices in increasing order.
pub trait VideoSource: Send {
    /// Properties probed when the source was opened.
    fn metadata(&self) -> &VideoMetadata;

    /// Decodes the frame with the given *real* frame index.
    fn read_frame(&mut self, index: usize) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Stable string identifier for a frame, used as the container/annotation
    /// key. Defaults to the decimal frame number.
    fn frame_label(&self, index: usize) -> String {
        index.to_string()
    }

    /// Releases decoder resources. Idempotent; a later `read_frame` may
    /// reacquire them.
    fn close(&mut self);
}
