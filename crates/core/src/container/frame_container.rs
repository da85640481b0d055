use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{ArrayD, Axis, IxDyn};
use ndarray_npy::{NpzReader, ReadNpzError, ReadableElement, WritableElement, WriteNpzError};
use thiserror::Error;

use crate::container::npz_store;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("data length ({data}) does not match indices length ({indices})")]
    LengthMismatch { data: usize, indices: usize },
    #[error("index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("present elements have differing shapes: {first:?} vs {other:?}")]
    HeterogeneousShapes { first: Vec<usize>, other: Vec<usize> },
    #[error("frame labels must be NUL-free UTF-8")]
    LabelEncoding,
    #[error("persisted container is malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Read(#[from] ReadNpzError),
    #[error(transparent)]
    Write(#[from] WriteNpzError),
}

/// An ordered `(data, indices)` pair of per-frame results.
///
/// `data` elements are per-frame arrays of one scalar type (`u8` for
/// pixels, any npy-storable primitive for features); `None` marks a frame
/// whose processing produced nothing and is a first-class value. `indices`
/// are the string identifiers of the originating frames, aligned with
/// `data` — not necessarily contiguous and not necessarily numeric.
///
/// Containers are never mutated: build a new one instead. A container
/// loaded from disk keeps its file handle open and reads element data only
/// when first accessed; dropping the container (or calling
/// [`close`](Self::close)) releases the handle.
pub struct FrameContainer<T> {
    data: FrameData<T>,
    indices: Vec<String>,
}

enum FrameData<T> {
    Memory(Vec<Option<ArrayD<T>>>),
    Disk(DiskBacked<T>),
}

struct DiskBacked<T> {
    reader: RefCell<NpzReader<BufReader<File>>>,
    mask: Vec<bool>,
    cache: RefCell<Option<Vec<Option<ArrayD<T>>>>>,
}

impl<T> FrameContainer<T> {
    /// Pairs `data` with `indices`. The only validation is that the
    /// lengths agree.
    pub fn new(
        data: Vec<Option<ArrayD<T>>>,
        indices: Vec<String>,
    ) -> Result<Self, ContainerError> {
        if data.len() != indices.len() {
            return Err(ContainerError::LengthMismatch {
                data: data.len(),
                indices: indices.len(),
            });
        }
        Ok(Self {
            data: FrameData::Memory(data),
            indices,
        })
    }

    /// Builds a container where every element is present.
    pub fn from_arrays(
        arrays: Vec<ArrayD<T>>,
        indices: Vec<String>,
    ) -> Result<Self, ContainerError> {
        Self::new(arrays.into_iter().map(Some).collect(), indices)
    }

    pub fn len(&self) -> usize {
        match &self.data {
            FrameData::Memory(elements) => elements.len(),
            FrameData::Disk(disk) => disk.mask.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Releases the container and any disk handle it holds. Dropping has
    /// the same effect; this spelling exists for call sites that want the
    /// release to be visible.
    pub fn close(self) {}
}

impl<T> FrameContainer<T>
where
    T: Clone + Default + PartialEq + ReadableElement + WritableElement,
{
    /// Returns element `index`, or `None` for an absent element. The first
    /// access on a loaded container reads the data array from disk.
    pub fn get(&self, index: usize) -> Result<Option<ArrayD<T>>, ContainerError> {
        let len = self.len();
        if index >= len {
            return Err(ContainerError::IndexOutOfRange { index, len });
        }
        match &self.data {
            FrameData::Memory(elements) => Ok(elements[index].clone()),
            FrameData::Disk(disk) => {
                disk.ensure_cache()?;
                let cache = disk.cache.borrow();
                Ok(cache.as_ref().expect("cache populated above")[index].clone())
            }
        }
    }

    /// Materializes the whole container as one `(len, …element shape)`
    /// array. Absent elements appear zero-filled, exactly as persisted.
    pub fn to_array(&self) -> Result<ArrayD<T>, ContainerError> {
        let (stacked, _) = self.stacked()?;
        Ok(stacked)
    }

    /// Writes the container to a single NPZ file; absent elements are
    /// preserved through the validity mask.
    pub fn save(&self, path: &Path) -> Result<(), ContainerError> {
        let (stacked, mask) = self.stacked()?;
        npz_store::write_container(path, &stacked, &mask, &self.indices)
    }

    /// Opens a persisted container without reading the frame data: the
    /// returned container holds the NPZ handle and defers the `data`
    /// array until an element or [`to_array`](Self::to_array) forces it.
    pub fn load(path: &Path) -> Result<Self, ContainerError> {
        let (reader, mask, labels) = npz_store::open_container(path)?;
        Ok(Self {
            data: FrameData::Disk(DiskBacked {
                reader: RefCell::new(reader),
                mask,
                cache: RefCell::new(None),
            }),
            indices: labels,
        })
    }

    fn elements(&self) -> Result<Vec<Option<ArrayD<T>>>, ContainerError> {
        match &self.data {
            FrameData::Memory(elements) => Ok(elements.clone()),
            FrameData::Disk(disk) => {
                disk.ensure_cache()?;
                Ok(disk
                    .cache
                    .borrow()
                    .as_ref()
                    .expect("cache populated above")
                    .clone())
            }
        }
    }

    fn stacked(&self) -> Result<(ArrayD<T>, Vec<bool>), ContainerError> {
        let elements = self.elements()?;
        let mask: Vec<bool> = elements.iter().map(Option::is_some).collect();

        let element_shape: Vec<usize> = match elements.iter().flatten().next() {
            Some(first) => first.shape().to_vec(),
            // No present element to take a shape from; stack as (len, 0).
            None => vec![0],
        };
        for element in elements.iter().flatten() {
            if element.shape() != element_shape.as_slice() {
                return Err(ContainerError::HeterogeneousShapes {
                    first: element_shape,
                    other: element.shape().to_vec(),
                });
            }
        }

        let mut shape = vec![elements.len()];
        shape.extend(&element_shape);
        let mut stacked = ArrayD::from_elem(IxDyn(&shape), T::default());
        for (i, element) in elements.iter().enumerate() {
            if let Some(element) = element {
                stacked.index_axis_mut(Axis(0), i).assign(element);
            }
        }
        Ok((stacked, mask))
    }
}

impl<T> DiskBacked<T>
where
    T: Clone + ReadableElement,
{
    fn ensure_cache(&self) -> Result<(), ContainerError> {
        if self.cache.borrow().is_some() {
            return Ok(());
        }
        log::debug!("materializing {} persisted elements", self.mask.len());
        let data: ArrayD<T> = npz_store::read_data(&mut self.reader.borrow_mut())?;
        if data.ndim() == 0 {
            return Err(ContainerError::Malformed(
                "data array has no leading frame axis".to_string(),
            ));
        }
        if data.shape()[0] != self.mask.len() {
            return Err(ContainerError::Malformed(format!(
                "data has {} rows, mask has {}",
                data.shape()[0],
                self.mask.len()
            )));
        }
        let elements: Vec<Option<ArrayD<T>>> = self
            .mask
            .iter()
            .enumerate()
            .map(|(i, &present)| present.then(|| data.index_axis(Axis(0), i).to_owned()))
            .collect();
        *self.cache.borrow_mut() = Some(elements);
        Ok(())
    }
}

/// Order-sensitive elementwise equality over both fields, regardless of
/// backing. A container whose disk data cannot be read compares unequal.
impl<T> PartialEq for FrameContainer<T>
where
    T: Clone + Default + PartialEq + ReadableElement + WritableElement,
{
    fn eq(&self, other: &Self) -> bool {
        if self.indices != other.indices {
            return false;
        }
        match (self.elements(), other.elements()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> std::fmt::Debug for FrameContainer<T>
where
    T: Clone + Default + PartialEq + std::fmt::Debug + ReadableElement + WritableElement,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameContainer")
            .field("indices", &self.indices)
            .field("elements", &self.elements().ok())
            .finish()
    }
}
