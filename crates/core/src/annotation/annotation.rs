use std::collections::BTreeMap;

/// Per-frame annotation: a bounding box plus optional named landmark
/// points. All coordinates are `(y, x)`, matching row-major frame arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub topleft: (f64, f64),
    pub bottomright: (f64, f64),
    pub landmarks: BTreeMap<String, (f64, f64)>,
}

impl Annotation {
    pub fn new(topleft: (f64, f64), bottomright: (f64, f64)) -> Self {
        Self {
            topleft,
            bottomright,
            landmarks: BTreeMap::new(),
        }
    }

    pub fn with_landmark(mut self, name: impl Into<String>, point: (f64, f64)) -> Self {
        self.landmarks.insert(name.into(), point);
        self
    }

    pub fn height(&self) -> f64 {
        self.bottomright.0 - self.topleft.0
    }

    pub fn width(&self) -> f64 {
        self.bottomright.1 - self.topleft.1
    }
}

/// Ordered per-frame annotations for one video: `(frame id, annotation)`
/// pairs where `None` marks a frame without a detection.
///
/// Insertion order is semantically significant — carry-forward
/// normalization walks the track in this order, so ids must appear in
/// frame order. Frame ids are strings: decimal positions at the annotator
/// seam, file names for image-list sources.
pub type AnnotationTrack = Vec<(String, Option<Annotation>)>;
