mod file_utils;

pub use file_utils::{read_bytes_from_file, write_bytes_to_file};
