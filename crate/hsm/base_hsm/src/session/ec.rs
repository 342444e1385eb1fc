use std::str::FromStr;

use der::{Encode, asn1::ObjectIdentifier};
use pkcs11_sys::{
    CK_OBJECT_HANDLE, CKA_CLASS, CKA_ECDSA_PARAMS, CKA_EXTRACTABLE, CKA_KEY_TYPE, CKA_LABEL,
    CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN, CKA_VERIFY, CKK_EC, CKM_EC_KEY_PAIR_GEN,
    CKO_PRIVATE_KEY, CKO_PUBLIC_KEY,
};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{HError, HResult, session::Session, template::Template};

/// Named elliptic curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum EcCurve {
    #[strum(to_string = "secp256r1", serialize = "prime256v1", serialize = "P-256")]
    Secp256r1,
    #[strum(to_string = "secp384r1", serialize = "P-384")]
    Secp384r1,
    #[strum(to_string = "secp521r1", serialize = "P-521")]
    Secp521r1,
    #[strum(to_string = "secp256k1")]
    Secp256k1,
}

impl EcCurve {
    /// Parse a curve name such as `secp256r1` or `P-384`
    pub fn from_name(name: &str) -> HResult<Self> {
        Self::from_str(name).map_err(|_| {
            let known = Self::iter().map(|c| c.to_string()).collect::<Vec<_>>();
            HError::InvalidInput(format!(
                "unknown curve: {name}. Known curves: {}",
                known.join(", ")
            ))
        })
    }

    #[must_use]
    pub const fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Secp256r1 => ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7"),
            Self::Secp384r1 => ObjectIdentifier::new_unwrap("1.3.132.0.34"),
            Self::Secp521r1 => ObjectIdentifier::new_unwrap("1.3.132.0.35"),
            Self::Secp256k1 => ObjectIdentifier::new_unwrap("1.3.132.0.10"),
        }
    }

    /// DER encoded named curve OID: the value of `CKA_ECDSA_PARAMS`
    pub fn ec_params(&self) -> HResult<Vec<u8>> {
        Ok(self.oid().to_der()?)
    }
}

impl Session {
    /// Generate an EC key pair on `curve`, and return the public and private key
    /// handles in this order.
    pub fn generate_ec_key_pair(
        &self,
        curve: EcCurve,
        label: &str,
        token: bool,
    ) -> HResult<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let ec_params = curve.ec_params()?;
        let public_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PUBLIC_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_EC)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bytes(CKA_ECDSA_PARAMS, &ec_params)
            .with_bool(CKA_VERIFY, true);
        let private_template = Template::new()
            .with_ulong(CKA_CLASS, CKO_PRIVATE_KEY)
            .with_ulong(CKA_KEY_TYPE, CKK_EC)
            .with_bool(CKA_TOKEN, token)
            .with_bool(CKA_PRIVATE, true)
            .with_bool(CKA_SENSITIVE, true)
            .with_bool(CKA_EXTRACTABLE, false)
            .with_bytes(CKA_LABEL, label.as_bytes())
            .with_bool(CKA_SIGN, true);

        self.generate_key_pair(CKM_EC_KEY_PAIR_GEN, &public_template, &private_template)
    }
}
