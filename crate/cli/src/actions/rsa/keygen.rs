use clap::Parser;
use p11_samples_hsm::RsaKeySize;

use crate::{
    actions::shared::LoggedInToken,
    config::ClientConf,
    error::{CliError, result::CliResult},
};

/// Generate an RSA key pair stored on the token, with public exponent 65537.
#[derive(Parser, Debug)]
pub struct GenerateRsaKeyPairAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of both keys of the pair
    #[clap(required = true)]
    pub keypair_label: String,

    /// The modulus size in bits, between 512 and 8192
    #[clap(required = true)]
    pub key_size: usize,
}

impl GenerateRsaKeyPairAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let key_size = RsaKeySize::try_from(self.key_size)
            .map_err(|_| CliError::UserError("RSA keypair size invalid.".to_owned()))?;

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let (public_key, private_key) =
            token
                .session()?
                .generate_rsa_key_pair(key_size, &self.keypair_label, true)?;
        println!("RSA key generated with label : {}", self.keypair_label);
        println!("\t > Private Key : {private_key}");
        println!("\t > Public Key : {public_key}\n");
        Ok(())
    }
}
