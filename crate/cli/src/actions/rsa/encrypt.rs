use clap::Parser;
use p11_samples_hsm::{Mechanism, RsaKeySize, RsaOaepDigest};

use super::SESSION_KEY_BITS;
use crate::{
    actions::{
        console,
        shared::{
            LoggedInToken, PlaintextArgs, RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN,
            RSA_PKCS1_MAX_PLAINTEXT_LEN, ensure_max_plaintext_len,
        },
    },
    config::ClientConf,
    error::result::CliResult,
};

const PROMPT: &str = "Enter plaintext to encrypt : ";

/// Read and check the plaintext, log in, then encrypt and decrypt with an
/// ephemeral RSA-2048 key pair
fn run(
    conf: &ClientConf,
    slot_label: &str,
    plaintext: &PlaintextArgs,
    mechanism: &Mechanism,
    max_len: usize,
) -> CliResult<()> {
    let lib_path = conf.library_path()?;
    let pin = conf.pin()?;
    let plaintext = plaintext.read(PROMPT)?;
    ensure_max_plaintext_len(plaintext.as_bytes(), max_len)?;

    let token = LoggedInToken::login(lib_path, &pin, slot_label)?;
    let session = token.session()?;
    let (public_key, private_key) = session.generate_rsa_key_pair(
        RsaKeySize::try_from(SESSION_KEY_BITS)?,
        "rsa-2048-session-key",
        false,
    )?;
    println!("RSA-2048 keypair generated.");

    let encrypted = session.encrypt(public_key, mechanism, plaintext.as_bytes())?;
    println!("Plaintext encrypted.");
    let decrypted = session.decrypt(private_key, mechanism, &encrypted)?;
    println!("Encrypted data decrypted.");

    let mut stdout = console::Stdout::new("");
    stdout.add_field("Plain text", plaintext.as_str());
    stdout.add_hex("Plain text (hex)", plaintext.as_bytes());
    stdout.add_hex("Encrypted text", &encrypted);
    stdout.add_hex("Decrypted text", &decrypted);
    stdout.write()
}

/// Encrypt a plaintext with an ephemeral RSA-2048 key pair, using PKCS#1 v1.5 padding.
///
/// The plaintext is at most 245 bytes long.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct EncryptRsaPkcs1Action {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl EncryptRsaPkcs1Action {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(
            conf,
            &self.slot_label,
            &self.plaintext,
            &Mechanism::RsaPkcs,
            RSA_PKCS1_MAX_PLAINTEXT_LEN,
        )
    }
}

/// Encrypt a plaintext with an ephemeral RSA-2048 key pair, using OAEP with SHA-256 and MGF1-SHA-256.
///
/// The plaintext is at most 190 bytes long.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct EncryptRsaOaepAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl EncryptRsaOaepAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        run(
            conf,
            &self.slot_label,
            &self.plaintext,
            &Mechanism::RsaPkcsOaep(RsaOaepDigest::SHA256),
            RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN,
        )
    }
}
