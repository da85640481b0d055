pub mod process_video_use_case;
