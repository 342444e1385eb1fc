#![allow(non_snake_case)]

/// Call a PKCS#11 function of the loaded library and return early with an `HError`
/// if the function is missing or does not return `CKR_OK`.
///
/// A macro is used so that the raw pointer arguments are expanded in place, in the
/// scope that owns the pointed-to buffers.
macro_rules! hsm_call {
    ($hsm:expr, $msg:expr, $func:ident $(, $arg:expr)* $(,)?) => {{
        #[allow(unsafe_code)]
        let rv = unsafe {
            $hsm.$func.ok_or_else(|| {
                $crate::HError::Default(format!(
                    "{} not available on library",
                    stringify!($func)
                ))
            })?($($arg),*)
        };
        if rv != pkcs11_sys::CKR_OK {
            return Err($crate::HError::from_rv($msg, rv));
        }
    }};
}

mod base_hsm;
mod error;
mod hsm_capabilities;
mod hsm_lib;
#[cfg(test)]
mod mock_cryptoki;
mod session;
mod slots;
mod template;

pub mod test_helpers;
pub mod tests_shared;

pub use base_hsm::{BaseHsm, DefaultCapabilityProvider, Info, SlotDescription, TokenDescription};
pub use error::{HError, HResult, rv_name};
pub use hsm_capabilities::{HsmCapabilities, HsmProvider};
pub use pkcs11_sys::{CK_OBJECT_HANDLE, CK_SLOT_ID};
pub use session::{
    AES_BLOCK_SIZE, AesKeySize, DsaKeySize, EcCurve, KeyClass, Mechanism, ObjectFilter, RsaKeySize,
    RsaOaepDigest, SecretKeyTemplate, Session, validate_aes_wrapped_key_len,
};
pub use slots::{ObjectHandlesCache, SlotManager};
