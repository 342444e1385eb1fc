use clap::Subcommand;

use self::{
    encrypt::{EncryptAesCbcPadAction, EncryptAesEcbAction},
    keygen::GenerateAesKeyAction,
    wrap::{UnwrapWithAesAction, WrapWithAesAction},
};
use crate::{config::ClientConf, error::result::CliResult};

mod encrypt;
mod keygen;
mod wrap;

/// Generate AES keys, encrypt with AES and wrap keys with `CKM_AES_KEY_WRAP`
#[derive(Subcommand, Debug)]
pub enum AesCommands {
    Keygen(GenerateAesKeyAction),
    EncryptEcb(EncryptAesEcbAction),
    EncryptCbcPad(EncryptAesCbcPadAction),
    Wrap(WrapWithAesAction),
    Unwrap(UnwrapWithAesAction),
}

impl AesCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::Keygen(action) => action.process(conf),
            Self::EncryptEcb(action) => action.process(conf),
            Self::EncryptCbcPad(action) => action.process(conf),
            Self::Wrap(action) => action.process(conf),
            Self::Unwrap(action) => action.process(conf),
        }
    }
}
