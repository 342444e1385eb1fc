use std::{fs, path::Path};

use crate::error::{CliError, result::CliResultHelper};

/// Read all bytes from a file
pub fn read_bytes_from_file(file: &impl AsRef<Path>) -> Result<Vec<u8>, CliError> {
    fs::read(file).with_context(|| format!("could not read the file {}", file.as_ref().display()))
}

/// Write all bytes to a file
pub fn write_bytes_to_file(bytes: &[u8], file: &impl AsRef<Path>) -> Result<(), CliError> {
    fs::write(file, bytes)
        .with_context(|| format!("failed writing data to file {:?}", file.as_ref()))
}
