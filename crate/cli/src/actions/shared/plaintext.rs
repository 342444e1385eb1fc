use std::io::{self, BufRead, Write};

use clap::Args;
use p11_samples_hsm::AES_BLOCK_SIZE;

use crate::{cli_ensure, error::{CliError, result::CliResult}};

/// Largest message RSA-2048 PKCS#1 v1.5 encrypts: 256 bytes minus 11 bytes of padding
pub const RSA_PKCS1_MAX_PLAINTEXT_LEN: usize = 245;
/// Largest message RSA-2048 OAEP with SHA-256 encrypts: 256 - 2 * 32 - 2
pub const RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN: usize = 190;

pub const AES_ECB_PLAINTEXT_ERROR: &str = "Text too small/big for AES-ECB";

/// The message a demonstration processes
#[derive(Args, Debug, Default, Clone)]
pub struct PlaintextArgs {
    /// The plaintext. Read from the terminal when absent.
    #[clap(long, short = 'p')]
    pub plaintext: Option<String>,
}

impl PlaintextArgs {
    /// The given plaintext, or a line read from stdin after printing `prompt`
    pub fn read(&self, prompt: &str) -> CliResult<String> {
        if let Some(plaintext) = &self.plaintext {
            return Ok(plaintext.clone());
        }
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

/// AES-ECB does not pad: the plaintext must be a non-empty multiple of the block size
pub fn ensure_aes_ecb_plaintext(plaintext: &[u8]) -> CliResult<()> {
    cli_ensure!(
        !plaintext.is_empty() && plaintext.len() % AES_BLOCK_SIZE == 0,
        CliError::UserError(AES_ECB_PLAINTEXT_ERROR.to_owned())
    );
    Ok(())
}

pub fn ensure_max_plaintext_len(plaintext: &[u8], max_len: usize) -> CliResult<()> {
    cli_ensure!(
        plaintext.len() <= max_len,
        CliError::UserError(format!(
            "Plaintext too long: {} bytes, at most {max_len} bytes are supported.",
            plaintext.len()
        ))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        PlaintextArgs, RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN, RSA_PKCS1_MAX_PLAINTEXT_LEN,
        ensure_aes_ecb_plaintext, ensure_max_plaintext_len,
    };

    #[test]
    fn aes_ecb_plaintext_is_whole_blocks() {
        ensure_aes_ecb_plaintext(&[0; 16]).unwrap();
        ensure_aes_ecb_plaintext(&[0; 48]).unwrap();
        ensure_aes_ecb_plaintext(b"").unwrap_err();
        let err = ensure_aes_ecb_plaintext(b"Hello").unwrap_err();
        assert_eq!(err.to_string(), "Text too small/big for AES-ECB");
    }

    #[test]
    fn rsa_plaintext_limits() {
        ensure_max_plaintext_len(&[0; RSA_PKCS1_MAX_PLAINTEXT_LEN], RSA_PKCS1_MAX_PLAINTEXT_LEN)
            .unwrap();
        let err = ensure_max_plaintext_len(
            &[0; RSA_PKCS1_MAX_PLAINTEXT_LEN + 1],
            RSA_PKCS1_MAX_PLAINTEXT_LEN,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Plaintext too long"));
        ensure_max_plaintext_len(&[0; 191], RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN).unwrap_err();
    }

    #[test]
    fn given_plaintext_is_not_read_from_stdin() {
        let args = PlaintextArgs {
            plaintext: Some("Earth".to_owned()),
        };
        assert_eq!(args.read("unused").unwrap(), "Earth");
    }
}
