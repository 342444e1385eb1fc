use clap::{Parser, Subcommand};
use p11_samples_hsm::DsaKeySize;

use crate::{
    actions::shared::LoggedInToken,
    config::ClientConf,
    error::{CliError, result::CliResult},
};

/// Generate DSA key pairs
#[derive(Subcommand, Debug)]
pub enum DsaCommands {
    Keygen(GenerateDsaKeyPairAction),
}

impl DsaCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::Keygen(action) => action.process(conf),
        }
    }
}

/// Generate a DSA key pair stored on the token.
///
/// The domain parameters are generated by the token first, for the
/// requested prime size.
#[derive(Parser, Debug)]
pub struct GenerateDsaKeyPairAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of both keys of the pair
    #[clap(required = true)]
    pub keypair_label: String,

    /// The prime size in bits: 1024, 2048 or 3072
    #[clap(long = "size", short = 's', default_value = "2048")]
    pub key_size: usize,
}

impl GenerateDsaKeyPairAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let key_size = DsaKeySize::try_from(self.key_size)
            .map_err(|_| CliError::UserError("DSA keypair size invalid.".to_owned()))?;

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let (public_key, private_key) =
            token
                .session()?
                .generate_dsa_key_pair(key_size, &self.keypair_label, true)?;
        println!("DSA key pair generated with label : {}", self.keypair_label);
        println!("\t > Private Key : {private_key}");
        println!("\t > Public Key : {public_key}\n");
        Ok(())
    }
}
