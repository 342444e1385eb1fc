use std::fmt;

use pkcs11_sys::{
    CK_OBJECT_HANDLE, CK_ULONG, CKA_CLASS, CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE,
    CKA_KEY_TYPE, CKA_LABEL, CKA_MODULUS_BITS, CKA_PRIVATE, CKA_PUBLIC_EXPONENT, CKA_SENSITIVE,
    CKA_SIGN, CKA_TOKEN, CKA_UNWRAP, CKA_VERIFY, CKA_WRAP, CKK_AES, CKK_RSA, CKM_RSA_PKCS_KEY_PAIR_GEN,
    CKO_PRIVATE_KEY, CKO_PUBLIC_KEY, CKO_SECRET_KEY,
};

use crate::{
    HError, HResult,
    session::{Session, mechanism::Mechanism},
    template::Template,
};

/// Public exponent of the generated keys: 65537
const PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// Size of an RSA modulus in bits, between 512 and 8192
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaKeySize(usize);

impl RsaKeySize {
    pub const MIN_BITS: usize = 512;
    pub const MAX_BITS: usize = 8192;

    #[must_use]
    pub const fn bits(&self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for RsaKeySize {
    type Error = HError;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        if (Self::MIN_BITS..=Self::MAX_BITS).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(HError::InvalidInput(format!(
                "RSA key size invalid: {bits}. It must be between {} and {} bits.",
                Self::MIN_BITS,
                Self::MAX_BITS
            )))
        }
    }
}

impl fmt::Display for RsaKeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSA-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaOaepDigest {
    SHA1,
    SHA256,
}

impl Session {
    /// Generate an RSA key pair labelled `label`, and return the public and private
    /// key handles in this order.
    ///
    /// With `token` set, both keys are persistent token objects; otherwise they
    /// disappear with the session.
    pub fn generate_rsa_key_pair(
        &self,
        key_size: RsaKeySize,
        label: &str,
        token: bool,
    ) -> HResult<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let public_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PUBLIC_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_RSA)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_ulong(CKA_MODULUS_BITS, CK_ULONG::try_from(key_size.bits())?)
            .with_bytes(CKA_PUBLIC_EXPONENT, &PUBLIC_EXPONENT)
            .with_bool(CKA_ENCRYPT, true)
            .with_bool(CKA_VERIFY, true)
            .with_bool(CKA_WRAP, true);
        let private_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PRIVATE_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_RSA)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, true)
            .with_bool(CKA_SENSITIVE, true)
            .with_bool(CKA_EXTRACTABLE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bool(CKA_DECRYPT, true)
            .with_bool(CKA_SIGN, true)
            .with_bool(CKA_UNWRAP, true);

        self.generate_key_pair(
            CKM_RSA_PKCS_KEY_PAIR_GEN,
            &public_template,
            &private_template,
        )
    }

    /// Wrap a secret key with an RSA public key, using RSA-OAEP.
    pub fn wrap_key_with_rsa_oaep(
        &self,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
        digest: RsaOaepDigest,
    ) -> HResult<Vec<u8>> {
        self.wrap_key(wrapping_key, key, &Mechanism::RsaPkcsOaep(digest))
    }

    /// Unwrap an AES key with an RSA private key, using RSA-OAEP.
    ///
    /// The unwrapped key is a token object labelled `label`, usable for
    /// encryption and decryption.
    pub fn unwrap_aes_key_with_rsa_oaep(
        &self,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped_key: &[u8],
        label: &str,
        digest: RsaOaepDigest,
    ) -> HResult<CK_OBJECT_HANDLE> {
        let template = Template::new()
            .with_ulong(CKA_CLASS, CKO_SECRET_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_AES)
            .with_bool(CKA_TOKEN, true)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bool(CKA_PRIVATE, true)
            .with_bool(CKA_SENSITIVE, true)
            .with_bool(CKA_EXTRACTABLE, true)
            .with_bool(CKA_ENCRYPT, true)
            .with_bool(CKA_DECRYPT, true);
        self.unwrap_key(
            unwrapping_key,
            wrapped_key,
            &Mechanism::RsaPkcsOaep(digest),
            &template,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RsaKeySize;

    #[test]
    fn rsa_key_size_bounds() {
        assert_eq!(RsaKeySize::try_from(512).unwrap().bits(), 512);
        assert_eq!(RsaKeySize::try_from(2048).unwrap().bits(), 2048);
        assert_eq!(RsaKeySize::try_from(8192).unwrap().bits(), 8192);
        assert!(RsaKeySize::try_from(511).is_err());
        assert!(RsaKeySize::try_from(8193).is_err());
        assert!(RsaKeySize::try_from(0).is_err());
    }

    #[test]
    fn rsa_key_size_error_message() {
        let err = RsaKeySize::try_from(256).unwrap_err();
        assert!(err.to_string().contains("between 512 and 8192"));
    }
}
