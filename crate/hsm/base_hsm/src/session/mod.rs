mod aes;
mod dsa;
mod ec;
mod mechanism;
mod objects;
mod rsa;
mod secret;
mod session_impl;
mod sign;
mod wrap;

pub use aes::{AesKeySize, validate_aes_wrapped_key_len};
pub use dsa::DsaKeySize;
pub use ec::EcCurve;
pub use mechanism::{AES_BLOCK_SIZE, Mechanism};
pub use objects::{KeyClass, ObjectFilter};
pub use rsa::{RsaKeySize, RsaOaepDigest};
pub use secret::SecretKeyTemplate;
pub use session_impl::Session;
