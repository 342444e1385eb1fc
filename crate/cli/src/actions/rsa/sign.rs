use clap::Parser;
use p11_samples_hsm::{Mechanism, RsaKeySize};

use super::SESSION_KEY_BITS;
use crate::{
    actions::{
        console,
        shared::{LoggedInToken, PlaintextArgs, RSA_PKCS1_MAX_PLAINTEXT_LEN, ensure_max_plaintext_len},
        sign_and_verify,
    },
    config::ClientConf,
    error::result::CliResult,
};

const PROMPT: &str = "Enter plaintext to sign : ";

fn run(
    conf: &ClientConf,
    slot_label: &str,
    plaintext: &PlaintextArgs,
    mechanism: &Mechanism,
) -> CliResult<()> {
    let lib_path = conf.library_path()?;
    let pin = conf.pin()?;
    let plaintext = plaintext.read(PROMPT)?;
    ensure_max_plaintext_len(plaintext.as_bytes(), RSA_PKCS1_MAX_PLAINTEXT_LEN)?;

    let token = LoggedInToken::login(lib_path, &pin, slot_label)?;
    let session = token.session()?;
    let (public_key, private_key) = session.generate_rsa_key_pair(
        RsaKeySize::try_from(SESSION_KEY_BITS)?,
        "rsa-2048-session-key",
        false,
    )?;
    println!("RSA-2048 keypair generated.");

    let (signature, verified) =
        sign_and_verify(&session, private_key, public_key, mechanism, plaintext.as_bytes())?;
    let mut stdout = console::Stdout::new(if verified {
        "Signature verified."
    } else {
        "Signature verification failed."
    });
    stdout.add_field("Plain text", plaintext.as_str());
    stdout.add_hex("Plain text (hex)", plaintext.as_bytes());
    stdout.add_hex("Signature", &signature);
    stdout.write()
}

/// Sign a plaintext with an ephemeral RSA-2048 key pair, using `CKM_SHA256_RSA_PKCS`, then verify the signature.
#[derive(Parser, Debug)]
pub struct SignRsaSha256Action {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl SignRsaSha256Action {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(conf, &self.slot_label, &self.plaintext, &Mechanism::Sha256RsaPkcs)
    }
}

/// Sign a plaintext with an ephemeral RSA-2048 key pair, using RSA-PSS, then verify the signature.
///
/// PSS uses SHA-256, MGF1 with SHA-256 and a 32 byte salt.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct SignRsaPssAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl SignRsaPssAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(
            conf,
            &self.slot_label,
            &self.plaintext,
            &Mechanism::Sha256RsaPkcsPss,
        )
    }
}
