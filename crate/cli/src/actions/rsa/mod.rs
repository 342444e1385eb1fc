use clap::Subcommand;

use self::{
    encrypt::{EncryptRsaOaepAction, EncryptRsaPkcs1Action},
    keygen::GenerateRsaKeyPairAction,
    sign::{SignRsaPssAction, SignRsaSha256Action},
    wrap::{UnwrapWithRsaOaepAction, WrapWithRsaOaepAction},
};
use crate::{config::ClientConf, error::result::CliResult};

mod encrypt;
mod keygen;
mod sign;
mod wrap;

/// Size of the ephemeral key pairs generated by the encryption and signature demonstrations
const SESSION_KEY_BITS: usize = 2048;

/// Generate RSA key pairs, encrypt, sign and wrap keys with RSA
#[derive(Subcommand, Debug)]
pub enum RsaCommands {
    Keygen(GenerateRsaKeyPairAction),
    EncryptPkcs1(EncryptRsaPkcs1Action),
    EncryptOaep(EncryptRsaOaepAction),
    SignSha256(SignRsaSha256Action),
    SignPss(SignRsaPssAction),
    Wrap(WrapWithRsaOaepAction),
    Unwrap(UnwrapWithRsaOaepAction),
}

impl RsaCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::Keygen(action) => action.process(conf),
            Self::EncryptPkcs1(action) => action.process(conf),
            Self::EncryptOaep(action) => action.process(conf),
            Self::SignSha256(action) => action.process(conf),
            Self::SignPss(action) => action.process(conf),
            Self::Wrap(action) => action.process(conf),
            Self::Unwrap(action) => action.process(conf),
        }
    }
}
