use ndarray::{Array3, ArrayView3, ArrayViewMut3};

/// One decoded video frame: contiguous RGB bytes in row-major order.
///
/// `index` is the *real* frame number in the source, not a position in any
/// selection. Format conversion happens at I/O boundaries only; everything
/// above the source layer treats pixel data as an opaque `(height, width,
/// channels)` array.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pixels: Vec<u8>,
    height: u32,
    width: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, height: u32, width: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (height as usize) * (width as usize) * (channels as usize),
            "pixel buffer length must equal height * width * channels"
        );
        Self {
            pixels,
            height,
            width,
            channels,
            index,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Real frame number in the originating source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Array shape as `(height, width, channels)`.
    pub fn shape(&self) -> [usize; 3] {
        [
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        ]
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        let [h, w, c] = self.shape();
        ArrayView3::from_shape((h, w, c), &self.pixels)
            .expect("pixel buffer length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let [h, w, c] = self.shape();
        ArrayViewMut3::from_shape((h, w, c), &mut self.pixels)
            .expect("pixel buffer length must match dimensions")
    }

    /// Consumes the frame into an owned `(height, width, channels)` array.
    pub fn into_ndarray(self) -> Array3<u8> {
        let [h, w, c] = self.shape();
        Array3::from_shape_vec((h, w, c), self.pixels)
            .expect("pixel buffer length must match dimensions")
    }
}
