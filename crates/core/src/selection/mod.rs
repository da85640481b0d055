pub mod frame_selector;
