use std::path::PathBuf;

use clap::Parser;
use p11_samples_hsm::{KeyClass, validate_aes_wrapped_key_len};

use crate::{
    actions::shared::{
        LoggedInToken,
        utils::{read_bytes_from_file, write_bytes_to_file},
    },
    config::ClientConf,
    error::result::CliResult,
};

/// Wrap a secret key with an AES key, using `CKM_AES_KEY_WRAP` (RFC 3394).
///
/// Both keys are looked up by label. The raw wrapped key is written to the output file.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct WrapWithAesAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of the AES wrapping key
    #[clap(required = true)]
    pub wrapping_key_label: String,

    /// The label of the secret key to wrap
    #[clap(required = true)]
    pub key_to_wrap_label: String,

    /// The file receiving the wrapped key
    #[clap(required = true)]
    pub output_file: PathBuf,
}

impl WrapWithAesAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;

        let wrapping_key = session.find_key(&self.wrapping_key_label, KeyClass::Secret)?;
        println!("\t> Wrapping key found : {}", self.wrapping_key_label);
        let key_to_wrap = session.find_key(&self.key_to_wrap_label, KeyClass::Secret)?;
        println!("\t> Key to wrap found : {}", self.key_to_wrap_label);

        let wrapped_key = session.wrap_key_with_aes_key_wrap(wrapping_key, key_to_wrap)?;
        write_bytes_to_file(&wrapped_key, &self.output_file)?;
        println!(
            "Wrapped key written to file {}\n",
            self.output_file.display()
        );
        Ok(())
    }
}

/// Unwrap an AES key wrapped with `CKM_AES_KEY_WRAP`, and store it on the token.
///
/// The unwrapped key length is the wrapped key length minus 8 bytes.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct UnwrapWithAesAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of the AES unwrapping key
    #[clap(required = true)]
    pub wrapping_key_label: String,

    /// The label given to the unwrapped key
    #[clap(required = true)]
    pub unwrapped_key_label: String,

    /// The file holding the wrapped key
    #[clap(required = true)]
    pub wrapped_key_file: PathBuf,
}

impl UnwrapWithAesAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let wrapped_key = read_bytes_from_file(&self.wrapped_key_file)?;
        validate_aes_wrapped_key_len(wrapped_key.len())?;

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;
        let unwrapping_key = session.find_key(&self.wrapping_key_label, KeyClass::Secret)?;
        println!("\t> Wrapping key found : {}", self.wrapping_key_label);

        session.unwrap_aes_key_with_aes_key_wrap(
            unwrapping_key,
            &wrapped_key,
            &self.unwrapped_key_label,
        )?;
        println!("Key unwrapped successfully.\n");
        Ok(())
    }
}
