use std::io::{self, Write};

use crate::error::result::CliResult;

/// Width of the field names, so that the values line up
const FIELD_WIDTH: usize = 16;

/// Output of a demonstration: a status line, then named values
#[derive(Debug, Default)]
pub struct Stdout {
    stdout: String,
    fields: Vec<(String, String)>,
}

impl Stdout {
    #[must_use]
    pub fn new(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_owned(),
            ..Default::default()
        }
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_owned(), value.into()));
    }

    /// Add a binary value, hex encoded
    pub fn add_hex(&mut self, name: &str, value: &[u8]) {
        self.add_field(name, hex::encode(value));
    }

    fn render(&self, out: &mut impl Write) -> io::Result<()> {
        if !self.stdout.is_empty() {
            writeln!(out, "{}", self.stdout)?;
        }
        if !self.fields.is_empty() {
            writeln!(out)?;
            for (name, value) in &self.fields {
                writeln!(out, "{name:<FIELD_WIDTH$}: {value}")?;
            }
        }
        writeln!(out)
    }

    pub fn write(&self) -> CliResult<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.render(&mut lock)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Stdout;

    #[test]
    fn fields_are_aligned_and_hex_encoded() {
        let mut stdout = Stdout::new("Signature verified.");
        stdout.add_field("Plain text", "hi");
        stdout.add_hex("Plain text (hex)", b"hi");
        let mut out = Vec::new();
        stdout.render(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Signature verified.\n\nPlain text      : hi\nPlain text (hex): 6869\n\n"
        );
    }

    #[test]
    fn empty_output_is_a_blank_line() {
        let mut out = Vec::new();
        Stdout::default().render(&mut out).unwrap();
        assert_eq!(out, b"\n");
    }
}
