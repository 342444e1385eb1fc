use clap::Parser;
use p11_samples_hsm::{AES_BLOCK_SIZE, AesKeySize, CK_OBJECT_HANDLE, Mechanism, SecretKeyTemplate, Session};

use crate::{
    actions::{
        console,
        shared::{LoggedInToken, PlaintextArgs, ensure_aes_ecb_plaintext},
    },
    config::ClientConf,
    error::result::{CliResult, CliResultHelper},
};

const PROMPT: &str = "Enter plaintext to encrypt : ";

/// Generate an AES-128 session key: it disappears with the session
fn generate_session_key(session: &Session) -> CliResult<CK_OBJECT_HANDLE> {
    let key = session.generate_aes_key(
        AesKeySize::Aes128,
        &SecretKeyTemplate::encryption_session_key("aes-128-session-key"),
    )?;
    println!("AES-128 key generated.");
    Ok(key)
}

/// Encrypt then decrypt with `mechanism`, and print both results
fn encrypt_decrypt(
    session: &Session,
    key: CK_OBJECT_HANDLE,
    mechanism: &Mechanism,
    plaintext: &str,
) -> CliResult<()> {
    let encrypted = session.encrypt(key, mechanism, plaintext.as_bytes())?;
    println!("Plaintext encrypted.");
    let decrypted = session.decrypt(key, mechanism, &encrypted)?;
    println!("Encrypted text decrypted.");

    let mut stdout = console::Stdout::new("");
    stdout.add_field("Plain text", plaintext);
    stdout.add_hex("Plain text (hex)", plaintext.as_bytes());
    stdout.add_hex("Encrypted text", &encrypted);
    stdout.add_hex("Decrypted text", &decrypted);
    stdout.write()
}

/// Encrypt a plaintext with a generated AES-128 key, using AES-ECB.
///
/// ECB does not pad: the plaintext length must be a multiple of 16 bytes.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct EncryptAesEcbAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl EncryptAesEcbAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let lib_path = conf.library_path()?;
        let pin = conf.pin()?;
        let plaintext = self.plaintext.read(PROMPT)?;
        ensure_aes_ecb_plaintext(plaintext.as_bytes())?;

        let token = LoggedInToken::login(lib_path, &pin, &self.slot_label)?;
        let session = token.session()?;
        let key = generate_session_key(&session)?;
        encrypt_decrypt(&session, key, &Mechanism::AesEcb, &plaintext)
    }
}

/// Encrypt a plaintext with a generated AES-128 key, using AES-CBC with PKCS#7 padding.
///
/// The IV is drawn from the token's random number generator.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct EncryptAesCbcPadAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl EncryptAesCbcPadAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let lib_path = conf.library_path()?;
        let pin = conf.pin()?;
        let plaintext = self.plaintext.read(PROMPT)?;

        let token = LoggedInToken::login(lib_path, &pin, &self.slot_label)?;
        let session = token.session()?;
        let key = generate_session_key(&session)?;
        let iv: [u8; AES_BLOCK_SIZE] = session
            .generate_random(AES_BLOCK_SIZE)?
            .try_into()
            .ok()
            .context("the token returned an IV of the wrong size")?;
        encrypt_decrypt(&session, key, &Mechanism::AesCbcPad { iv }, &plaintext)
    }
}
