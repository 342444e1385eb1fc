use p11_samples_hsm::{CK_OBJECT_HANDLE, Mechanism, Session};

use crate::error::result::CliResult;

pub mod aes;
pub mod console;
pub mod dsa;
pub mod ec;
pub mod mac;
pub mod objects;
pub mod rng;
pub mod rsa;
pub mod shared;
pub mod slots;

/// Sign `data`, then verify the signature; return the signature and whether it verified
pub(crate) fn sign_and_verify(
    session: &Session,
    signing_key: CK_OBJECT_HANDLE,
    verification_key: CK_OBJECT_HANDLE,
    mechanism: &Mechanism,
    data: &[u8],
) -> CliResult<(Vec<u8>, bool)> {
    let signature = session.sign(signing_key, mechanism, data)?;
    println!("Plaintext signed.");
    let verified = session.verify(verification_key, mechanism, data, &signature)?;
    Ok((signature, verified))
}
