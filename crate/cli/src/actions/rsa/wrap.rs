use std::path::PathBuf;

use clap::Parser;
use p11_samples_hsm::{KeyClass, RsaOaepDigest};

use crate::{
    actions::shared::{
        LoggedInToken,
        utils::{read_bytes_from_file, write_bytes_to_file},
    },
    config::ClientConf,
    error::result::CliResult,
};

/// Wrap an AES key with an RSA public key, using OAEP with SHA-256 and MGF1-SHA-256.
///
/// The raw wrapped key is written to the output file, e.g. to import a key into a cloud KMS.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct WrapWithRsaOaepAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of the RSA public key
    #[clap(required = true)]
    pub public_key_label: String,

    /// The label of the AES key to wrap
    #[clap(required = true)]
    pub aes_key_label: String,

    /// The file receiving the wrapped key
    #[clap(required = true)]
    pub output_file: PathBuf,
}

impl WrapWithRsaOaepAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;

        let wrapping_key = session.find_key(&self.public_key_label, KeyClass::Public)?;
        println!("\t> Public key found : {}", self.public_key_label);
        let key_to_wrap = session.find_key(&self.aes_key_label, KeyClass::Secret)?;
        println!("\t> Key to wrap found : {}", self.aes_key_label);

        let wrapped_key =
            session.wrap_key_with_rsa_oaep(wrapping_key, key_to_wrap, RsaOaepDigest::SHA256)?;
        write_bytes_to_file(&wrapped_key, &self.output_file)?;
        println!(
            "Wrapped key written to file {}\n",
            self.output_file.display()
        );
        Ok(())
    }
}

/// Unwrap an AES key wrapped with RSA-OAEP (SHA-256), and store it on the token.
#[derive(Parser, Debug)]
pub struct UnwrapWithRsaOaepAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of the RSA private key
    #[clap(required = true)]
    pub private_key_label: String,

    /// The label given to the unwrapped key
    #[clap(required = true)]
    pub unwrapped_key_label: String,

    /// The file holding the wrapped key
    #[clap(required = true)]
    pub wrapped_key_file: PathBuf,
}

impl UnwrapWithRsaOaepAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let wrapped_key = read_bytes_from_file(&self.wrapped_key_file)?;

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;
        let unwrapping_key = session.find_key(&self.private_key_label, KeyClass::Private)?;
        println!("\t> Wrapping key found : {}", self.private_key_label);

        session.unwrap_aes_key_with_rsa_oaep(
            unwrapping_key,
            &wrapped_key,
            &self.unwrapped_key_label,
            RsaOaepDigest::SHA256,
        )?;
        println!("Key unwrapped successfully.\n");
        Ok(())
    }
}
