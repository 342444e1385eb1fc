use std::ptr;

use libloading::Library;
use p11_samples_logger::{debug, warn};
use pkcs11_sys::{
    CK_C_CloseSession, CK_C_Decrypt, CK_C_DecryptInit, CK_C_DestroyObject, CK_C_Encrypt,
    CK_C_EncryptInit, CK_C_Finalize, CK_C_FindObjects, CK_C_FindObjectsFinal,
    CK_C_FindObjectsInit, CK_C_GenerateKey, CK_C_GenerateKeyPair, CK_C_GenerateRandom,
    CK_C_GetAttributeValue, CK_C_GetInfo, CK_C_GetSlotInfo, CK_C_GetSlotList,
    CK_C_GetTokenInfo, CK_C_INITIALIZE_ARGS, CK_C_Initialize, CK_C_Login, CK_C_Logout,
    CK_C_OpenSession, CK_C_Sign, CK_C_SignInit, CK_C_UnwrapKey, CK_C_Verify, CK_C_VerifyInit,
    CK_C_WrapKey, CK_VOID_PTR, CKF_OS_LOCKING_OK, CKR_CRYPTOKI_ALREADY_INITIALIZED, CKR_OK,
};

use crate::{HError, HResult};

/// The PKCS#11 library loaded from disk.
///
/// Every Cryptoki entry point used by the samples is resolved once, when the library is
/// loaded, and kept as a function pointer. The library is initialized with
/// `CKF_OS_LOCKING_OK` on load and finalized when this struct is dropped.
///
/// The function pointers are only reachable from within the crate, through the
/// `hsm_call!` macro, which turns a missing entry point or a failed return value
/// into an `HError`.
pub struct HsmLib {
    // keeps the shared object mapped for as long as the function pointers live
    _library: Option<Library>,
    pub(crate) C_Initialize: CK_C_Initialize,
    pub(crate) C_Finalize: CK_C_Finalize,
    pub(crate) C_GetInfo: CK_C_GetInfo,

    pub(crate) C_GetSlotList: CK_C_GetSlotList,
    pub(crate) C_GetSlotInfo: CK_C_GetSlotInfo,
    pub(crate) C_GetTokenInfo: CK_C_GetTokenInfo,

    pub(crate) C_OpenSession: CK_C_OpenSession,
    pub(crate) C_CloseSession: CK_C_CloseSession,
    pub(crate) C_Login: CK_C_Login,
    pub(crate) C_Logout: CK_C_Logout,

    pub(crate) C_GenerateKey: CK_C_GenerateKey,
    pub(crate) C_GenerateKeyPair: CK_C_GenerateKeyPair,
    pub(crate) C_GenerateRandom: CK_C_GenerateRandom,

    pub(crate) C_FindObjectsInit: CK_C_FindObjectsInit,
    pub(crate) C_FindObjects: CK_C_FindObjects,
    pub(crate) C_FindObjectsFinal: CK_C_FindObjectsFinal,
    pub(crate) C_GetAttributeValue: CK_C_GetAttributeValue,
    pub(crate) C_DestroyObject: CK_C_DestroyObject,

    pub(crate) C_EncryptInit: CK_C_EncryptInit,
    pub(crate) C_Encrypt: CK_C_Encrypt,
    pub(crate) C_DecryptInit: CK_C_DecryptInit,
    pub(crate) C_Decrypt: CK_C_Decrypt,

    pub(crate) C_SignInit: CK_C_SignInit,
    pub(crate) C_Sign: CK_C_Sign,
    pub(crate) C_VerifyInit: CK_C_VerifyInit,
    pub(crate) C_Verify: CK_C_Verify,

    pub(crate) C_WrapKey: CK_C_WrapKey,
    pub(crate) C_UnwrapKey: CK_C_UnwrapKey,
}

impl HsmLib {
    pub(crate) fn instantiate<P>(path: P) -> HResult<Self>
    where
        P: AsRef<std::ffi::OsStr>,
    {
        debug!("Loading PKCS#11 library {:?}", path.as_ref());
        #[allow(unsafe_code)]
        let hsm_lib = unsafe {
            let library = Library::new(path)?;
            Self {
                C_Initialize: Some(*library.get(b"C_Initialize")?),
                C_Finalize: Some(*library.get(b"C_Finalize")?),
                C_GetInfo: Some(*library.get(b"C_GetInfo")?),
                C_GetSlotList: Some(*library.get(b"C_GetSlotList")?),
                C_GetSlotInfo: Some(*library.get(b"C_GetSlotInfo")?),
                C_GetTokenInfo: Some(*library.get(b"C_GetTokenInfo")?),
                C_OpenSession: Some(*library.get(b"C_OpenSession")?),
                C_CloseSession: Some(*library.get(b"C_CloseSession")?),
                C_Login: Some(*library.get(b"C_Login")?),
                C_Logout: Some(*library.get(b"C_Logout")?),
                C_GenerateKey: Some(*library.get(b"C_GenerateKey")?),
                C_GenerateKeyPair: Some(*library.get(b"C_GenerateKeyPair")?),
                C_GenerateRandom: Some(*library.get(b"C_GenerateRandom")?),
                C_FindObjectsInit: Some(*library.get(b"C_FindObjectsInit")?),
                C_FindObjects: Some(*library.get(b"C_FindObjects")?),
                C_FindObjectsFinal: Some(*library.get(b"C_FindObjectsFinal")?),
                C_GetAttributeValue: Some(*library.get(b"C_GetAttributeValue")?),
                C_DestroyObject: Some(*library.get(b"C_DestroyObject")?),
                C_EncryptInit: Some(*library.get(b"C_EncryptInit")?),
                C_Encrypt: Some(*library.get(b"C_Encrypt")?),
                C_DecryptInit: Some(*library.get(b"C_DecryptInit")?),
                C_Decrypt: Some(*library.get(b"C_Decrypt")?),
                C_SignInit: Some(*library.get(b"C_SignInit")?),
                C_Sign: Some(*library.get(b"C_Sign")?),
                C_VerifyInit: Some(*library.get(b"C_VerifyInit")?),
                C_Verify: Some(*library.get(b"C_Verify")?),
                C_WrapKey: Some(*library.get(b"C_WrapKey")?),
                C_UnwrapKey: Some(*library.get(b"C_UnwrapKey")?),
                _library: Some(library),
            }
        };
        hsm_lib.initialize()?;
        Ok(hsm_lib)
    }

    /// A library without any entry point, for tests to fill in
    #[cfg(test)]
    pub(crate) const fn unloaded() -> Self {
        Self {
            _library: None,
            C_Initialize: None,
            C_Finalize: None,
            C_GetInfo: None,
            C_GetSlotList: None,
            C_GetSlotInfo: None,
            C_GetTokenInfo: None,
            C_OpenSession: None,
            C_CloseSession: None,
            C_Login: None,
            C_Logout: None,
            C_GenerateKey: None,
            C_GenerateKeyPair: None,
            C_GenerateRandom: None,
            C_FindObjectsInit: None,
            C_FindObjects: None,
            C_FindObjectsFinal: None,
            C_GetAttributeValue: None,
            C_DestroyObject: None,
            C_EncryptInit: None,
            C_Encrypt: None,
            C_DecryptInit: None,
            C_Decrypt: None,
            C_SignInit: None,
            C_Sign: None,
            C_VerifyInit: None,
            C_Verify: None,
            C_WrapKey: None,
            C_UnwrapKey: None,
        }
    }

    fn initialize(&self) -> HResult<()> {
        let mut init_args = CK_C_INITIALIZE_ARGS {
            CreateMutex: None,
            DestroyMutex: None,
            LockMutex: None,
            UnlockMutex: None,
            flags: CKF_OS_LOCKING_OK,
            pReserved: ptr::null_mut(),
        };
        #[allow(unsafe_code)]
        let rv = unsafe {
            self.C_Initialize.ok_or_else(|| {
                HError::Default("C_Initialize not available on library".to_owned())
            })?((&raw mut init_args).cast::<std::ffi::c_void>() as CK_VOID_PTR)
        };
        if rv == CKR_CRYPTOKI_ALREADY_INITIALIZED {
            warn!("PKCS#11 library already initialized in this process");
        } else if rv != CKR_OK {
            return Err(HError::from_rv("Failed initializing the PKCS#11 library", rv));
        }
        Ok(())
    }

    fn finalize(&self) -> HResult<()> {
        #[allow(unsafe_code)]
        let rv = unsafe {
            self.C_Finalize
                .ok_or_else(|| HError::Default("C_Finalize not available on library".to_owned()))?(
                ptr::null_mut(),
            )
        };
        if rv != CKR_OK {
            return Err(HError::from_rv("Failed to finalize the PKCS#11 library", rv));
        }
        Ok(())
    }
}

impl Drop for HsmLib {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!("{e}");
        }
    }
}
