use std::ptr;

use p11_samples_logger::debug;
use pkcs11_sys::{
    CK_OBJECT_HANDLE, CK_ULONG, CKR_OK, CKR_SIGNATURE_INVALID, CKR_SIGNATURE_LEN_RANGE,
};

use crate::{
    HError, HResult,
    session::{Session, mechanism::Mechanism},
};

impl Session {
    /// Sign `data` with the private (or secret) key `key`, using a single-part operation.
    pub fn sign(
        &self,
        key: CK_OBJECT_HANDLE,
        mechanism: &Mechanism,
        data: &[u8],
    ) -> HResult<Vec<u8>> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;
        let mut data = data.to_vec();
        hsm_call!(
            self.hsm(),
            format!("Failed to initialize {mechanism} signature"),
            C_SignInit,
            self.session_handle(),
            &raw mut ck_mechanism,
            key
        );

        let mut signature_len: CK_ULONG = 0;
        hsm_call!(
            self.hsm(),
            "Failed to get the signature length",
            C_Sign,
            self.session_handle(),
            data.as_mut_ptr(),
            CK_ULONG::try_from(data.len())?,
            ptr::null_mut(),
            &raw mut signature_len
        );

        let mut signature = vec![0_u8; usize::try_from(signature_len)?];
        hsm_call!(
            self.hsm(),
            "Failed to sign data",
            C_Sign,
            self.session_handle(),
            data.as_mut_ptr(),
            CK_ULONG::try_from(data.len())?,
            signature.as_mut_ptr(),
            &raw mut signature_len
        );
        signature.truncate(usize::try_from(signature_len)?);
        debug!("{mechanism}: signed {} bytes", data.len());
        Ok(signature)
    }

    /// Verify `signature` over `data` with the public (or secret) key `key`.
    ///
    /// Returns `Ok(false)` when the library reports an invalid signature.
    pub fn verify(
        &self,
        key: CK_OBJECT_HANDLE,
        mechanism: &Mechanism,
        data: &[u8],
        signature: &[u8],
    ) -> HResult<bool> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;
        let mut data = data.to_vec();
        let mut signature = signature.to_vec();
        hsm_call!(
            self.hsm(),
            format!("Failed to initialize {mechanism} verification"),
            C_VerifyInit,
            self.session_handle(),
            &raw mut ck_mechanism,
            key
        );
        let data_len = CK_ULONG::try_from(data.len())?;
        let signature_len = CK_ULONG::try_from(signature.len())?;
        #[allow(unsafe_code)]
        let rv = unsafe {
            self.hsm()
                .C_Verify
                .ok_or_else(|| HError::Default("C_Verify not available on library".to_owned()))?(
                self.session_handle(),
                data.as_mut_ptr(),
                data_len,
                signature.as_mut_ptr(),
                signature_len,
            )
        };
        match rv {
            CKR_OK => Ok(true),
            CKR_SIGNATURE_INVALID | CKR_SIGNATURE_LEN_RANGE => Ok(false),
            rv => Err(HError::from_rv("Failed to verify the signature", rv)),
        }
    }
}
