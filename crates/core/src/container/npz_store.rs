//! On-disk container format: a single NPZ file with three named arrays.
//!
//! * `data` — the stacked elements, absent slots zero-filled.
//! * `indices` — frame labels as a fixed-width, zero-padded UTF-8 byte
//!   matrix (npy has no native string dtype).
//! * `mask` — u8 validity marker per element, making absent elements
//!   round-trip exactly.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array, Array1, Array2, ArrayD, Dimension};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError, ReadableElement, WritableElement};

use crate::container::frame_container::ContainerError;

const DATA_ENTRY: &str = "data";
const INDICES_ENTRY: &str = "indices";
const MASK_ENTRY: &str = "mask";

pub(crate) fn write_container<T: WritableElement>(
    path: &Path,
    data: &ArrayD<T>,
    mask: &[bool],
    labels: &[String],
) -> Result<(), ContainerError> {
    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array(DATA_ENTRY, data)?;
    npz.add_array(INDICES_ENTRY, &encode_labels(labels)?)?;
    let mask_array: Array1<u8> = mask.iter().map(|&present| present as u8).collect();
    npz.add_array(MASK_ENTRY, &mask_array)?;
    npz.finish()?;
    Ok(())
}

/// Opens a persisted container, reading only the small `indices` and
/// `mask` arrays; `data` stays behind the returned handle until
/// [`read_data`] forces it.
pub(crate) fn open_container(
    path: &Path,
) -> Result<(NpzReader<BufReader<File>>, Vec<bool>, Vec<String>), ContainerError> {
    let mut npz = NpzReader::new(BufReader::new(File::open(path)?))?;
    let label_matrix: Array2<u8> = read_entry(&mut npz, INDICES_ENTRY)?;
    let mask_array: Array1<u8> = read_entry(&mut npz, MASK_ENTRY)?;

    let labels = decode_labels(&label_matrix)?;
    let mask: Vec<bool> = mask_array.iter().map(|&m| m != 0).collect();
    if labels.len() != mask.len() {
        return Err(ContainerError::Malformed(format!(
            "indices has {} entries, mask has {}",
            labels.len(),
            mask.len()
        )));
    }
    Ok((npz, mask, labels))
}

pub(crate) fn read_data<T: ReadableElement>(
    npz: &mut NpzReader<BufReader<File>>,
) -> Result<ArrayD<T>, ContainerError> {
    Ok(read_entry(npz, DATA_ENTRY)?)
}

/// Zip entries carry the `.npy` suffix; accept archives either way.
fn read_entry<T, D>(
    npz: &mut NpzReader<BufReader<File>>,
    name: &str,
) -> Result<Array<T, D>, ReadNpzError>
where
    T: ReadableElement,
    D: Dimension,
{
    npz.by_name(&format!("{name}.npy"))
        .or_else(|_| npz.by_name(name))
}

fn encode_labels(labels: &[String]) -> Result<Array2<u8>, ContainerError> {
    if labels.iter().any(|l| l.as_bytes().contains(&0)) {
        return Err(ContainerError::LabelEncoding);
    }
    let width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    let mut matrix = Array2::<u8>::zeros((labels.len(), width));
    for (row, label) in labels.iter().enumerate() {
        for (col, &byte) in label.as_bytes().iter().enumerate() {
            matrix[[row, col]] = byte;
        }
    }
    Ok(matrix)
}

fn decode_labels(matrix: &Array2<u8>) -> Result<Vec<String>, ContainerError> {
    matrix
        .outer_iter()
        .map(|row| {
            let bytes: Vec<u8> = row.iter().copied().take_while(|&b| b != 0).collect();
            String::from_utf8(bytes).map_err(|_| ContainerError::LabelEncoding)
        })
        .collect()
}
