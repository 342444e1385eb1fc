use std::ptr;

use pkcs11_sys::{
    CK_MECHANISM, CK_MECHANISM_TYPE, CK_RSA_PKCS_OAEP_PARAMS, CK_RSA_PKCS_PSS_PARAMS, CK_ULONG,
    CKG_MGF1_SHA1, CKG_MGF1_SHA256, CKM_AES_CBC_PAD, CKM_AES_ECB, CKM_AES_KEY_WRAP,
    CKM_DES3_CMAC, CKM_ECDSA_SHA256, CKM_RSA_PKCS, CKM_RSA_PKCS_OAEP, CKM_SHA_1,
    CKM_SHA_1_HMAC, CKM_SHA256, CKM_SHA256_RSA_PKCS, CKM_SHA256_RSA_PKCS_PSS,
    CKZ_DATA_SPECIFIED,
};
use strum::Display;

use crate::{HResult, session::rsa::RsaOaepDigest};

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// Salt length of the RSA-PSS signatures: the SHA-256 digest length
const PSS_SALT_LENGTH: CK_ULONG = 32;

/// The PKCS#11 mechanisms used by the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Mechanism {
    #[strum(to_string = "CKM_AES_ECB")]
    AesEcb,
    #[strum(to_string = "CKM_AES_CBC_PAD")]
    AesCbcPad { iv: [u8; AES_BLOCK_SIZE] },
    #[strum(to_string = "CKM_AES_KEY_WRAP")]
    AesKeyWrap,
    #[strum(to_string = "CKM_RSA_PKCS")]
    RsaPkcs,
    #[strum(to_string = "CKM_RSA_PKCS_OAEP")]
    RsaPkcsOaep(RsaOaepDigest),
    #[strum(to_string = "CKM_SHA256_RSA_PKCS")]
    Sha256RsaPkcs,
    #[strum(to_string = "CKM_SHA256_RSA_PKCS_PSS")]
    Sha256RsaPkcsPss,
    #[strum(to_string = "CKM_ECDSA_SHA256")]
    EcdsaSha256,
    #[strum(to_string = "CKM_SHA_1_HMAC")]
    Sha1Hmac,
    #[strum(to_string = "CKM_DES3_CMAC")]
    Des3Cmac,
}

impl Mechanism {
    #[must_use]
    pub const fn mechanism_type(&self) -> CK_MECHANISM_TYPE {
        match self {
            Self::AesEcb => CKM_AES_ECB,
            Self::AesCbcPad { .. } => CKM_AES_CBC_PAD,
            Self::AesKeyWrap => CKM_AES_KEY_WRAP,
            Self::RsaPkcs => CKM_RSA_PKCS,
            Self::RsaPkcsOaep(_) => CKM_RSA_PKCS_OAEP,
            Self::Sha256RsaPkcs => CKM_SHA256_RSA_PKCS,
            Self::Sha256RsaPkcsPss => CKM_SHA256_RSA_PKCS_PSS,
            Self::EcdsaSha256 => CKM_ECDSA_SHA256,
            Self::Sha1Hmac => CKM_SHA_1_HMAC,
            Self::Des3Cmac => CKM_DES3_CMAC,
        }
    }

    pub(crate) fn parameters(&self) -> MechanismParameters {
        let parameters = match self {
            Self::AesCbcPad { iv } => Parameters::Iv(*iv),
            Self::RsaPkcsOaep(digest) => {
                let (hashAlg, mgf) = match digest {
                    RsaOaepDigest::SHA1 => (CKM_SHA_1, CKG_MGF1_SHA1),
                    RsaOaepDigest::SHA256 => (CKM_SHA256, CKG_MGF1_SHA256),
                };
                Parameters::Oaep(CK_RSA_PKCS_OAEP_PARAMS {
                    hashAlg,
                    mgf,
                    source: CKZ_DATA_SPECIFIED,
                    pSourceData: ptr::null_mut(),
                    ulSourceDataLen: 0,
                })
            }
            Self::Sha256RsaPkcsPss => Parameters::Pss(CK_RSA_PKCS_PSS_PARAMS {
                hashAlg: CKM_SHA256,
                mgf: CKG_MGF1_SHA256,
                sLen: PSS_SALT_LENGTH,
            }),
            Self::AesEcb
            | Self::AesKeyWrap
            | Self::RsaPkcs
            | Self::Sha256RsaPkcs
            | Self::EcdsaSha256
            | Self::Sha1Hmac
            | Self::Des3Cmac => Parameters::None,
        };
        MechanismParameters {
            mechanism_type: self.mechanism_type(),
            parameters,
        }
    }
}

enum Parameters {
    None,
    Iv([u8; AES_BLOCK_SIZE]),
    Oaep(CK_RSA_PKCS_OAEP_PARAMS),
    Pss(CK_RSA_PKCS_PSS_PARAMS),
}

/// Owns the parameter block of a mechanism.
///
/// The `CK_MECHANISM` built by `ck_mechanism` points into this struct,
/// which must stay in place until the PKCS#11 call returns.
pub(crate) struct MechanismParameters {
    mechanism_type: CK_MECHANISM_TYPE,
    parameters: Parameters,
}

impl MechanismParameters {
    pub(crate) fn ck_mechanism(&mut self) -> HResult<CK_MECHANISM> {
        let (pParameter, len) = match &mut self.parameters {
            Parameters::None => (ptr::null_mut(), 0),
            Parameters::Iv(iv) => (iv.as_mut_ptr().cast::<std::ffi::c_void>(), iv.len()),
            Parameters::Oaep(params) => (
                (params as *mut CK_RSA_PKCS_OAEP_PARAMS).cast::<std::ffi::c_void>(),
                size_of::<CK_RSA_PKCS_OAEP_PARAMS>(),
            ),
            Parameters::Pss(params) => (
                (params as *mut CK_RSA_PKCS_PSS_PARAMS).cast::<std::ffi::c_void>(),
                size_of::<CK_RSA_PKCS_PSS_PARAMS>(),
            ),
        };
        Ok(CK_MECHANISM {
            mechanism: self.mechanism_type,
            pParameter,
            ulParameterLen: CK_ULONG::try_from(len)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pkcs11_sys::{
        CK_RSA_PKCS_OAEP_PARAMS, CK_RSA_PKCS_PSS_PARAMS, CKG_MGF1_SHA256, CKM_AES_CBC_PAD,
        CKM_AES_KEY_WRAP, CKM_SHA256,
    };

    use super::Mechanism;
    use crate::RsaOaepDigest;

    #[test]
    fn mechanisms_without_parameters() {
        let mut params = Mechanism::AesKeyWrap.parameters();
        let ck = params.ck_mechanism().unwrap();
        assert_eq!(ck.mechanism, CKM_AES_KEY_WRAP);
        assert!(ck.pParameter.is_null());
        assert_eq!(ck.ulParameterLen, 0);
    }

    #[test]
    fn cbc_pad_carries_the_iv() {
        let iv = [7_u8; 16];
        let mut params = Mechanism::AesCbcPad { iv }.parameters();
        let ck = params.ck_mechanism().unwrap();
        assert_eq!(ck.mechanism, CKM_AES_CBC_PAD);
        assert_eq!(ck.ulParameterLen, 16);
        #[allow(unsafe_code)]
        let bytes = unsafe { std::slice::from_raw_parts(ck.pParameter.cast::<u8>(), 16) };
        assert_eq!(bytes, &iv);
    }

    #[test]
    fn oaep_sha256_uses_mgf1_sha256() {
        let mut params = Mechanism::RsaPkcsOaep(RsaOaepDigest::SHA256).parameters();
        let ck = params.ck_mechanism().unwrap();
        assert_eq!(
            ck.ulParameterLen as usize,
            size_of::<CK_RSA_PKCS_OAEP_PARAMS>()
        );
        #[allow(unsafe_code)]
        let oaep = unsafe { &*ck.pParameter.cast::<CK_RSA_PKCS_OAEP_PARAMS>() };
        assert_eq!(oaep.hashAlg, CKM_SHA256);
        assert_eq!(oaep.mgf, CKG_MGF1_SHA256);
        assert_eq!(oaep.ulSourceDataLen, 0);
    }

    #[test]
    fn pss_salt_is_the_digest_length() {
        let mut params = Mechanism::Sha256RsaPkcsPss.parameters();
        let ck = params.ck_mechanism().unwrap();
        #[allow(unsafe_code)]
        let pss = unsafe { &*ck.pParameter.cast::<CK_RSA_PKCS_PSS_PARAMS>() };
        assert_eq!(pss.hashAlg, CKM_SHA256);
        assert_eq!(pss.sLen, 32);
    }

    #[test]
    fn display_uses_pkcs11_names() {
        assert_eq!(Mechanism::AesEcb.to_string(), "CKM_AES_ECB");
        assert_eq!(
            Mechanism::RsaPkcsOaep(RsaOaepDigest::SHA256).to_string(),
            "CKM_RSA_PKCS_OAEP"
        );
    }
}
