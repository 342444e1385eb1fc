use clap::{Parser, Subcommand};
use p11_samples_hsm::{CK_OBJECT_HANDLE, Mechanism, SecretKeyTemplate, Session};

use crate::{
    actions::{
        console,
        shared::LoggedInToken,
        sign_and_verify,
    },
    config::ClientConf,
    error::result::CliResult,
};

/// Message authenticated when no plaintext is given
const DEFAULT_MESSAGE: &str = "Hello World, I've been waiting for the chance to see your face.";

/// Bits of the generic secret HMAC key
const HMAC_KEY_BITS: usize = 256;

/// Compute and verify MACs with ephemeral secret keys
#[derive(Subcommand, Debug)]
pub enum MacCommands {
    HmacSha1(HmacSha1Action),
    CmacDes3(CmacDes3Action),
}

impl MacCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::HmacSha1(action) => action.process(conf),
            Self::CmacDes3(action) => action.process(conf),
        }
    }
}

fn run(
    conf: &ClientConf,
    slot_label: &str,
    message: &str,
    mechanism: &Mechanism,
    generate_key: impl FnOnce(&Session) -> CliResult<CK_OBJECT_HANDLE>,
) -> CliResult<()> {
    let token = LoggedInToken::connect(conf, slot_label)?;
    let session = token.session()?;
    let key = generate_key(&session)?;

    let (mac, verified) = sign_and_verify(&session, key, key, mechanism, message.as_bytes())?;
    let mut stdout = console::Stdout::new(if verified {
        "MAC verified."
    } else {
        "MAC verification failed."
    });
    stdout.add_field("Plain text", message);
    stdout.add_hex("Plain text (hex)", message.as_bytes());
    stdout.add_hex(&mechanism.to_string(), &mac);
    stdout.write()
}

/// Compute an HMAC-SHA1 with an ephemeral 256-bit generic secret key, then verify it.
#[derive(Parser, Debug)]
pub struct HmacSha1Action {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The message to authenticate
    #[clap(long, short = 'p', default_value = DEFAULT_MESSAGE)]
    pub plaintext: String,
}

impl HmacSha1Action {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(
            conf,
            &self.slot_label,
            &self.plaintext,
            &Mechanism::Sha1Hmac,
            |session| {
                let key = session.generate_generic_secret_key(
                    HMAC_KEY_BITS,
                    &SecretKeyTemplate::mac_session_key("hmac-session-key"),
                )?;
                println!("Generic secret key generated.");
                Ok(key)
            },
        )
    }
}

/// Compute a CMAC with an ephemeral triple DES key, then verify it.
#[derive(Parser, Debug)]
pub struct CmacDes3Action {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The message to authenticate
    #[clap(long, short = 'p', default_value = DEFAULT_MESSAGE)]
    pub plaintext: String,
}

impl CmacDes3Action {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(
            conf,
            &self.slot_label,
            &self.plaintext,
            &Mechanism::Des3Cmac,
            |session| {
                let key = session
                    .generate_des3_key(&SecretKeyTemplate::mac_session_key("cmac-session-key"))?;
                println!("DES3 key generated.");
                Ok(key)
            },
        )
    }
}
