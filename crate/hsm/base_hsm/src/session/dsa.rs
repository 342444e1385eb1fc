use pkcs11_sys::{
    CK_ATTRIBUTE_TYPE, CK_OBJECT_HANDLE, CK_ULONG, CKA_BASE, CKA_CLASS, CKA_EXTRACTABLE,
    CKA_KEY_TYPE, CKA_LABEL, CKA_PRIME, CKA_PRIME_BITS, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN,
    CKA_SUBPRIME, CKA_TOKEN, CKA_VERIFY, CKK_DSA, CKM_DSA_KEY_PAIR_GEN, CKM_DSA_PARAMETER_GEN,
    CKO_DOMAIN_PARAMETERS, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY,
};

use crate::{HError, HResult, session::Session, template::Template};

/// Size of the DSA prime `p` in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsaKeySize {
    Dsa1024,
    Dsa2048,
    Dsa3072,
}

impl DsaKeySize {
    #[must_use]
    pub const fn bits(&self) -> usize {
        match self {
            Self::Dsa1024 => 1024,
            Self::Dsa2048 => 2048,
            Self::Dsa3072 => 3072,
        }
    }
}

impl TryFrom<usize> for DsaKeySize {
    type Error = HError;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        match bits {
            1024 => Ok(Self::Dsa1024),
            2048 => Ok(Self::Dsa2048),
            3072 => Ok(Self::Dsa3072),
            x => Err(HError::InvalidInput(format!(
                "DSA key size invalid: {x}. It must be 1024, 2048 or 3072."
            ))),
        }
    }
}

/// The `p`, `q` and `g` values shared by the keys of a DSA domain
struct DsaDomainParameters {
    prime: Vec<u8>,
    subprime: Vec<u8>,
    base: Vec<u8>,
}

impl Session {
    /// Generate fresh domain parameters with `CKM_DSA_PARAMETER_GEN`.
    ///
    /// The domain parameters object is a session object, destroyed once its
    /// values are read.
    fn generate_dsa_domain_parameters(&self, key_size: DsaKeySize) -> HResult<DsaDomainParameters> {
        let template = Template::new()
            .with_ulong(CKA_CLASS, CKO_DOMAIN_PARAMETERS)
            .with_ulong(CKA_KEY_TYPE, CKK_DSA)
            .with_bool(CKA_TOKEN, false)
            .with_ulong(CKA_PRIME_BITS, CK_ULONG::try_from(key_size.bits())?);
        let handle = self.generate_key(CKM_DSA_PARAMETER_GEN, &template)?;
        let parameters = self.read_dsa_domain_parameters(handle);
        let destroyed = self.destroy_object(handle);
        let parameters = parameters?;
        destroyed?;
        Ok(parameters)
    }

    fn read_dsa_domain_parameters(&self, handle: CK_OBJECT_HANDLE) -> HResult<DsaDomainParameters> {
        let read = |type_: CK_ATTRIBUTE_TYPE, name: &str| -> HResult<Vec<u8>> {
            self.get_attribute_bytes(handle, type_)?.ok_or_else(|| {
                HError::Default(format!("The DSA domain parameters have no {name}"))
            })
        };
        Ok(DsaDomainParameters {
            prime: read(CKA_PRIME, "prime")?,
            subprime: read(CKA_SUBPRIME, "subprime")?,
            base: read(CKA_BASE, "base")?,
        })
    }

    /// Generate a DSA key pair labelled `label` on new domain parameters, and
    /// return the public and private key handles in this order.
    pub fn generate_dsa_key_pair(
        &self,
        key_size: DsaKeySize,
        label: &str,
        token: bool,
    ) -> HResult<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let parameters = self.generate_dsa_domain_parameters(key_size)?;
        let public_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PUBLIC_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_DSA)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bytes(CKA_PRIME, &parameters.prime)
            .with_bytes(CKA_SUBPRIME, &parameters.subprime)
            .with_bytes(CKA_BASE, &parameters.base)
            .with_bool(CKA_VERIFY, true);
        let private_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PRIVATE_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_DSA)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, true)
            .with_bool(CKA_SENSITIVE, true)
            .with_bool(CKA_EXTRACTABLE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bool(CKA_SIGN, true);
        self.generate_key_pair(CKM_DSA_KEY_PAIR_GEN, &public_template, &private_template)
    }
}

#[cfg(test)]
mod tests {
    use pkcs11_sys::{CKA_BASE, CKA_PRIME, CKA_SUBPRIME, CKO_DOMAIN_PARAMETERS};

    use super::DsaKeySize;
    use crate::{KeyClass, mock_cryptoki};

    #[test]
    fn dsa_key_sizes() {
        assert_eq!(DsaKeySize::try_from(2048).unwrap(), DsaKeySize::Dsa2048);
        assert_eq!(DsaKeySize::Dsa3072.bits(), 3072);
        for bits in [0, 512, 2047, 4096] {
            assert!(DsaKeySize::try_from(bits).is_err(), "{bits} accepted");
        }
    }

    #[test]
    fn key_pair_uses_the_generated_domain_parameters() {
        let session = mock_cryptoki::session(false);
        let (public_key, private_key) = session
            .generate_dsa_key_pair(DsaKeySize::Dsa2048, "myDsaKey", true)
            .unwrap();

        let prime = session.get_attribute_bytes(public_key, CKA_PRIME).unwrap();
        assert_eq!(prime.map(|p| p.len()), Some(2048 / 8));
        assert!(
            session
                .get_attribute_bytes(public_key, CKA_SUBPRIME)
                .unwrap()
                .is_some()
        );
        assert!(
            session
                .get_attribute_bytes(public_key, CKA_BASE)
                .unwrap()
                .is_some()
        );

        // the domain parameters object does not outlive the generation
        assert!(!mock_cryptoki::with_token(|token| {
            token.has_object_of_class(CKO_DOMAIN_PARAMETERS)
        }));
        assert_eq!(
            session.find_key("myDsaKey", KeyClass::Public).unwrap(),
            public_key
        );
        assert_eq!(
            session.find_key("myDsaKey", KeyClass::Private).unwrap(),
            private_key
        );
    }
}
