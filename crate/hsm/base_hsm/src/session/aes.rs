use pkcs11_sys::{
    CK_OBJECT_HANDLE, CK_ULONG, CKA_CLASS, CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE,
    CKA_KEY_TYPE, CKA_LABEL, CKA_PRIVATE, CKA_SENSITIVE, CKA_TOKEN, CKA_VALUE_LEN, CKK_AES,
    CKM_AES_KEY_GEN, CKO_SECRET_KEY,
};

use crate::{
    HError, HResult,
    session::{Session, mechanism::Mechanism, secret::SecretKeyTemplate},
    template::Template,
};

/// Integrity check value appended by `CKM_AES_KEY_WRAP` (RFC 3394)
const AES_KEY_WRAP_OVERHEAD: usize = 8;
/// Smallest wrapped blob: a 128 bit key plus the integrity check value
const AES_KEY_WRAP_MIN_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesKeySize {
    Aes128,
    Aes192,
    Aes256,
}

impl AesKeySize {
    /// Key length in bytes
    #[must_use]
    pub const fn key_length(&self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    #[must_use]
    pub const fn bits(&self) -> usize {
        self.key_length() * 8
    }
}

impl TryFrom<usize> for AesKeySize {
    type Error = HError;

    /// Key size in bits: 128, 192 or 256
    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        match bits {
            128 => Ok(Self::Aes128),
            192 => Ok(Self::Aes192),
            256 => Ok(Self::Aes256),
            x => Err(HError::InvalidInput(format!(
                "AES key size invalid: {x}. It must be 128, 192 or 256."
            ))),
        }
    }
}

/// Check the length of an `CKM_AES_KEY_WRAP` blob and return the length of the
/// key it holds.
pub fn validate_aes_wrapped_key_len(len: usize) -> HResult<usize> {
    if len < AES_KEY_WRAP_MIN_LEN || len % AES_KEY_WRAP_OVERHEAD != 0 {
        return Err(HError::InvalidInput(format!(
            "invalid wrapped key length: {len} bytes. An AES wrapped key is a multiple of 8 \
             bytes and at least {AES_KEY_WRAP_MIN_LEN} bytes long."
        )));
    }
    Ok(len - AES_KEY_WRAP_OVERHEAD)
}

impl Session {
    /// Generate an AES key with the attributes of `template`
    pub fn generate_aes_key(
        &self,
        size: AesKeySize,
        template: &SecretKeyTemplate,
    ) -> HResult<CK_OBJECT_HANDLE> {
        let attributes =
            template.to_template(CKK_AES, Some(CK_ULONG::try_from(size.key_length())?));
        self.generate_key(CKM_AES_KEY_GEN, &attributes)
    }

    /// Wrap `key` with the AES key `wrapping_key`, using `CKM_AES_KEY_WRAP`
    pub fn wrap_key_with_aes_key_wrap(
        &self,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
    ) -> HResult<Vec<u8>> {
        self.wrap_key(wrapping_key, key, &Mechanism::AesKeyWrap)
    }

    /// Unwrap an AES key wrapped with `CKM_AES_KEY_WRAP`.
    ///
    /// The blob length is checked before reaching the library: the unwrapped key
    /// length (`CKA_VALUE_LEN`) is the blob length minus the 8 byte integrity
    /// check value.
    pub fn unwrap_aes_key_with_aes_key_wrap(
        &self,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped_key: &[u8],
        label: &str,
    ) -> HResult<CK_OBJECT_HANDLE> {
        let key_length = validate_aes_wrapped_key_len(wrapped_key.len())?;
        let template = Template::new()
            .with_ulong(CKA_CLASS, CKO_SECRET_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_AES)
            .with_bool(CKA_TOKEN, true)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bool(CKA_PRIVATE, true)
            .with_bool(CKA_SENSITIVE, true)
            .with_bool(CKA_ENCRYPT, true)
            .with_bool(CKA_DECRYPT, true)
            .with_bool(CKA_EXTRACTABLE, true)
            .with_ulong(CKA_VALUE_LEN, CK_ULONG::try_from(key_length)?);
        self.unwrap_key(
            unwrapping_key,
            wrapped_key,
            &Mechanism::AesKeyWrap,
            &template,
        )
    }
}
