pub mod frame_container;
pub(crate) mod npz_store;
