use clap::Parser;
use p11_samples_hsm::{AesKeySize, SecretKeyTemplate};

use crate::{
    actions::shared::LoggedInToken,
    config::ClientConf,
    error::{CliError, result::CliResult},
};

/// Generate an AES key stored on the token.
///
/// By default the key can encrypt, decrypt, wrap and unwrap.
/// With `--full-template`, it can also sign and verify, and gets a fixed `CKA_ID`.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct GenerateAesKeyAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of the generated key
    #[clap(required = true)]
    pub key_label: String,

    /// The key size in bits: 128, 192 or 256
    #[clap(required = true)]
    pub key_size: usize,

    /// Set every usage attribute explicitly
    #[clap(long, default_value = "false")]
    pub full_template: bool,
}

impl GenerateAesKeyAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let key_size = AesKeySize::try_from(self.key_size)
            .map_err(|_| CliError::UserError("AES key size invalid.".to_owned()))?;
        let template = if self.full_template {
            SecretKeyTemplate::full(&self.key_label)
        } else {
            SecretKeyTemplate::new(&self.key_label)
        };

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        token.session()?.generate_aes_key(key_size, &template)?;
        println!(
            "AES-{} key generated with label : {}\n",
            key_size.bits(),
            self.key_label
        );
        Ok(())
    }
}
