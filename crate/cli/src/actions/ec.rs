use clap::{Parser, Subcommand};
use p11_samples_hsm::{EcCurve, Mechanism};

use crate::{
    actions::{
        console,
        shared::{LoggedInToken, PlaintextArgs},
        sign_and_verify,
    },
    config::ClientConf,
    error::{CliError, result::CliResult},
};

/// Generate EC key pairs and sign with ECDSA
#[derive(Subcommand, Debug)]
pub enum EcCommands {
    Keygen(GenerateEcKeyPairAction),
    SignSha256(SignEcdsaSha256Action),
}

impl EcCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::Keygen(action) => action.process(conf),
            Self::SignSha256(action) => action.process(conf),
        }
    }
}

fn parse_curve(name: &str) -> CliResult<EcCurve> {
    EcCurve::from_name(name).map_err(|e| CliError::UserError(e.to_string()))
}

/// Generate an ECDSA key pair stored on the token.
///
/// Known curves: secp256r1 (prime256v1, P-256), secp384r1 (P-384), secp521r1 (P-521), secp256k1.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct GenerateEcKeyPairAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The label of both keys of the pair
    #[clap(required = true)]
    pub keypair_label: String,

    /// The name of the curve
    #[clap(required = true)]
    pub curve: String,
}

impl GenerateEcKeyPairAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let curve = parse_curve(&self.curve)?;

        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let (public_key, private_key) =
            token
                .session()?
                .generate_ec_key_pair(curve, &self.keypair_label, true)?;
        println!("ECDSA key generated with label : {}", self.keypair_label);
        println!("\t > Private Key : {private_key}");
        println!("\t > Public Key : {public_key}\n");
        Ok(())
    }
}

/// Sign a plaintext with an ephemeral EC key pair, using `CKM_ECDSA_SHA256`, then verify the signature.
#[derive(Parser, Debug)]
pub struct SignEcdsaSha256Action {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The curve of the ephemeral key pair
    #[clap(long, short = 'c', default_value = "secp384r1")]
    pub curve: String,

    #[clap(flatten)]
    pub plaintext: PlaintextArgs,
}

impl SignEcdsaSha256Action {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let curve = parse_curve(&self.curve)?;
        let lib_path = conf.library_path()?;
        let pin = conf.pin()?;
        let plaintext = self.plaintext.read("Enter plaintext to sign : ")?;

        let token = LoggedInToken::login(lib_path, &pin, &self.slot_label)?;
        let session = token.session()?;
        let (public_key, private_key) =
            session.generate_ec_key_pair(curve, "ecdsa-session-key", false)?;
        println!("ECDSA key pair generated.");

        let (signature, verified) = sign_and_verify(
            &session,
            private_key,
            public_key,
            &Mechanism::EcdsaSha256,
            plaintext.as_bytes(),
        )?;
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
}

#[cfg(test)]
mod tests {
    use p11_samples_hsm::EcCurve;

    use super::parse_curve;

    #[test]
    fn curve_names() {
        assert_eq!(parse_curve("secp384r1").unwrap(), EcCurve::Secp384r1);
        assert_eq!(parse_curve("P-256").unwrap(), EcCurve::Secp256r1);
        let err = parse_curve("curve25519").unwrap_err();
        assert!(err.to_string().contains("unknown curve"));
    }
}
