use pkcs11_sys::{
    CK_KEY_TYPE, CK_OBJECT_HANDLE, CK_ULONG, CKA_CLASS, CKA_DECRYPT, CKA_ENCRYPT,
    CKA_EXTRACTABLE, CKA_ID, CKA_KEY_TYPE, CKA_LABEL, CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE,
    CKA_SIGN, CKA_TOKEN, CKA_UNWRAP, CKA_VALUE_LEN, CKA_VERIFY, CKA_WRAP, CKK_DES3,
    CKK_GENERIC_SECRET, CKM_DES3_KEY_GEN, CKM_GENERIC_SECRET_KEY_GEN, CKO_SECRET_KEY,
};

use crate::{HError, HResult, session::Session, template::Template};

/// Id given to keys generated with the full template
const FULL_TEMPLATE_KEY_ID: &[u8] = b"1123581321345589";

/// Attributes of a generated secret key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeyTemplate {
    pub label: String,
    pub id: Option<Vec<u8>>,
    pub token: bool,
    pub private: bool,
    pub sensitive: bool,
    pub extractable: bool,
    pub modifiable: bool,
    pub encrypt: bool,
    pub decrypt: bool,
    pub wrap: bool,
    pub unwrap: bool,
    pub sign: bool,
    pub verify: bool,
}

impl SecretKeyTemplate {
    /// A private, sensitive token key, usable for encryption and key wrapping
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            id: None,
            token: true,
            private: true,
            sensitive: true,
            extractable: true,
            modifiable: true,
            encrypt: true,
            decrypt: true,
            wrap: true,
            unwrap: true,
            sign: false,
            verify: false,
        }
    }

    /// Every usage flag set, with a fixed `CKA_ID`
    #[must_use]
    pub fn full(label: &str) -> Self {
        Self {
            id: Some(FULL_TEMPLATE_KEY_ID.to_vec()),
            sign: true,
            verify: true,
            ..Self::new(label)
        }
    }

    /// A session key that only signs and verifies, for MAC computations
    #[must_use]
    pub fn mac_session_key(label: &str) -> Self {
        Self {
            token: false,
            encrypt: false,
            decrypt: false,
            wrap: false,
            unwrap: false,
            sign: true,
            verify: true,
            ..Self::new(label)
        }
    }

    /// A session key that only encrypts and decrypts
    #[must_use]
    pub fn encryption_session_key(label: &str) -> Self {
        Self {
            token: false,
            wrap: false,
            unwrap: false,
            ..Self::new(label)
        }
    }

    pub(crate) fn to_template(&self, key_type: CK_KEY_TYPE, value_len: Option<CK_ULONG>) -> Template {
        let mut template = Template::new()
            .with_ulong(CKA_CLASS, CKO_SECRET_KEY)
            .with_ulong(CKA_KEY_TYPE, key_type)
            .with_bool(CKA_TOKEN, self.token)
            .with_bytes(CKA_LABEL, self.label.as_bytes());
        if let Some(id) = &self.id {
            template = template.with_bytes(CKA_ID, id);
        }
        if let Some(value_len) = value_len {
            template = template.with_ulong(CKA_VALUE_LEN, value_len);
        }
        template
            .with_bool(CKA_PRIVATE, self.private)
            .with_bool(CKA_SENSITIVE, self.sensitive)
            .with_bool(CKA_EXTRACTABLE, self.extractable)
            .with_bool(CKA_MODIFIABLE, self.modifiable)
            .with_bool(CKA_ENCRYPT, self.encrypt)
            .with_bool(CKA_DECRYPT, self.decrypt)
            .with_bool(CKA_WRAP, self.wrap)
            .with_bool(CKA_UNWRAP, self.unwrap)
            .with_bool(CKA_SIGN, self.sign)
            .with_bool(CKA_VERIFY, self.verify)
    }
}

impl Session {
    /// Generate a generic secret key of `bits` bits, e.g. for HMAC
    pub fn generate_generic_secret_key(
        &self,
        bits: usize,
        template: &SecretKeyTemplate,
    ) -> HResult<CK_OBJECT_HANDLE> {
        if bits == 0 || bits % 8 != 0 {
            return Err(HError::InvalidInput(format!(
                "generic secret key size must be a positive multiple of 8 bits, got {bits}"
            )));
        }
        let attributes =
            template.to_template(CKK_GENERIC_SECRET, Some(CK_ULONG::try_from(bits / 8)?));
        self.generate_key(CKM_GENERIC_SECRET_KEY_GEN, &attributes)
    }

    /// Generate a triple DES key
    pub fn generate_des3_key(&self, template: &SecretKeyTemplate) -> HResult<CK_OBJECT_HANDLE> {
        let attributes = template.to_template(CKK_DES3, None);
        self.generate_key(CKM_DES3_KEY_GEN, &attributes)
    }
}

#[cfg(test)]
mod tests {
    use pkcs11_sys::{CKA_ID, CKA_VALUE_LEN, CKK_AES, CKK_DES3};

    use super::SecretKeyTemplate;

    #[test]
    fn full_template_sets_every_usage() {
        let t = SecretKeyTemplate::full("myAesKey");
        assert_eq!(t.id.as_deref(), Some(&b"1123581321345589"[..]));
        assert!(t.token && t.private && t.sensitive && t.extractable && t.modifiable);
        assert!(t.encrypt && t.decrypt && t.wrap && t.unwrap && t.sign && t.verify);
    }

    #[test]
    fn value_len_and_id_are_optional() {
        let basic = SecretKeyTemplate::new("k").to_template(CKK_AES, Some(32));
        let attributes = basic.ck_attributes().unwrap();
        assert!(attributes.iter().any(|a| a.type_ == CKA_VALUE_LEN));
        assert!(!attributes.iter().any(|a| a.type_ == CKA_ID));

        let des3 = SecretKeyTemplate::full("k").to_template(CKK_DES3, None);
        let attributes = des3.ck_attributes().unwrap();
        assert!(!attributes.iter().any(|a| a.type_ == CKA_VALUE_LEN));
        assert!(attributes.iter().any(|a| a.type_ == CKA_ID));
    }

    #[test]
    fn mac_key_is_a_session_object() {
        let t = SecretKeyTemplate::mac_session_key("hmac");
        assert!(!t.token);
        assert!(t.sign && t.verify);
        assert!(!t.encrypt && !t.wrap);
    }
}
