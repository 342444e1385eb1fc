//! A PKCS#11 session and its core operations
//!
//! The session exposes single-part operations only: every output of unknown length
//! is obtained with the two-call convention, a first call with a NULL buffer
//! returning the length, a second call filling the buffer.
//!
//! Decrypted data is returned in `Zeroizing` buffers.

use std::{
    ptr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use p11_samples_logger::{debug, warn};
use pkcs11_sys::{
    CK_ATTRIBUTE, CK_ATTRIBUTE_TYPE, CK_MECHANISM, CK_MECHANISM_TYPE, CK_OBJECT_HANDLE,
    CK_SESSION_HANDLE, CK_ULONG, CKA_LABEL, CKR_ATTRIBUTE_SENSITIVE, CKR_ATTRIBUTE_TYPE_INVALID,
    CKR_OBJECT_HANDLE_INVALID, CKR_OK,
};
use zeroize::Zeroizing;

use crate::{
    HError, HResult, ObjectHandlesCache, hsm_capabilities::HsmCapabilities,
    hsm_lib::HsmLib, session::mechanism::Mechanism, template::Template,
};

/// A session with a token of the PKCS#11 library.
///
/// The session is closed when dropped. A session that performed the login logs
/// out first.
pub struct Session {
    hsm: Arc<HsmLib>,
    handle: CK_SESSION_HANDLE,
    object_handles_cache: Arc<ObjectHandlesCache>,
    logging_in: bool,
    closed: AtomicBool,
    hsm_capabilities: HsmCapabilities,
}

impl Session {
    pub(crate) fn new(
        hsm: Arc<HsmLib>,
        session_handle: CK_SESSION_HANDLE,
        object_handles_cache: Arc<ObjectHandlesCache>,
        logging_in: bool,
        hsm_capabilities: HsmCapabilities,
    ) -> Self {
        debug!("Creating new session: {session_handle}. Logging in? {logging_in}");
        Self {
            hsm,
            handle: session_handle,
            object_handles_cache,
            logging_in,
            closed: AtomicBool::new(false),
            hsm_capabilities,
        }
    }

    /// Get the HSM library interface
    pub(crate) fn hsm(&self) -> Arc<HsmLib> {
        self.hsm.clone()
    }

    /// Get the PKCS#11 session handle
    pub(crate) const fn session_handle(&self) -> CK_SESSION_HANDLE {
        self.handle
    }

    /// Get the object handles cache
    pub(crate) fn object_handles_cache(&self) -> Arc<ObjectHandlesCache> {
        self.object_handles_cache.clone()
    }

    pub(crate) const fn hsm_capabilities(&self) -> &HsmCapabilities {
        &self.hsm_capabilities
    }

    /// Close the session and log out if this session logged in.
    /// Closing an already closed session does nothing.
    ///
    /// The session handle is released even when the logout fails; the logout
    /// error is returned in that case.
    pub fn close(&self) -> HResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let logout = if self.logging_in {
            self.logout()
        } else {
            Ok(())
        };
        let close = self.close_session();
        logout.and(close)
    }

    fn logout(&self) -> HResult<()> {
        hsm_call!(self.hsm, "Failed logging out", C_Logout, self.handle);
        debug!("Logged out of session {}", self.handle);
        Ok(())
    }

    fn close_session(&self) -> HResult<()> {
        hsm_call!(
            self.hsm,
            "Failed closing a session",
            C_CloseSession,
            self.handle
        );
        Ok(())
    }

    pub fn generate_random(&self, len: usize) -> HResult<Vec<u8>> {
        let mut values = vec![0_u8; len];
        hsm_call!(
            self.hsm,
            "Failed generating random data",
            C_GenerateRandom,
            self.handle,
            values.as_mut_ptr(),
            CK_ULONG::try_from(len)?
        );
        Ok(values)
    }

    pub(crate) fn generate_key(
        &self,
        mechanism_type: CK_MECHANISM_TYPE,
        template: &Template,
    ) -> HResult<CK_OBJECT_HANDLE> {
        let mut mechanism = CK_MECHANISM {
            mechanism: mechanism_type,
            pParameter: ptr::null_mut(),
            ulParameterLen: 0,
        };
        let mut attributes = template.ck_attributes()?;
        let mut handle = CK_OBJECT_HANDLE::default();
        hsm_call!(
            self.hsm,
            "Failed generating key",
            C_GenerateKey,
            self.handle,
            &raw mut mechanism,
            attributes.as_mut_ptr(),
            CK_ULONG::try_from(attributes.len())?,
            &raw mut handle
        );
        self.forget_cached_label(template)?;
        Ok(handle)
    }

    /// Generate a key pair and return the public and private key handles in this order
    pub(crate) fn generate_key_pair(
        &self,
        mechanism_type: CK_MECHANISM_TYPE,
        public_template: &Template,
        private_template: &Template,
    ) -> HResult<(CK_OBJECT_HANDLE, CK_OBJECT_HANDLE)> {
        let mut mechanism = CK_MECHANISM {
            mechanism: mechanism_type,
            pParameter: ptr::null_mut(),
            ulParameterLen: 0,
        };
        let mut public_attributes = public_template.ck_attributes()?;
        let mut private_attributes = private_template.ck_attributes()?;
        let mut public_key = CK_OBJECT_HANDLE::default();
        let mut private_key = CK_OBJECT_HANDLE::default();
        hsm_call!(
            self.hsm,
            "Failed generating key pair",
            C_GenerateKeyPair,
            self.handle,
            &raw mut mechanism,
            public_attributes.as_mut_ptr(),
            CK_ULONG::try_from(public_attributes.len())?,
            private_attributes.as_mut_ptr(),
            CK_ULONG::try_from(private_attributes.len())?,
            &raw mut public_key,
            &raw mut private_key
        );
        self.forget_cached_label(public_template)?;
        self.forget_cached_label(private_template)?;
        Ok((public_key, private_key))
    }

    /// A new object makes the cached lookups of its label ambiguous, so they are
    /// dropped and the next lookup searches the token.
    pub(crate) fn forget_cached_label(&self, template: &Template) -> HResult<()> {
        match template.value(CKA_LABEL) {
            Some(label) => self.object_handles_cache.remove_label(label),
            None => Ok(()),
        }
    }

    /// Destroy an object and forget its cached handle
    pub fn destroy_object(&self, object_handle: CK_OBJECT_HANDLE) -> HResult<()> {
        hsm_call!(
            self.hsm,
            "Failed to destroy object",
            C_DestroyObject,
            self.handle,
            object_handle
        );
        self.object_handles_cache.remove_handle(object_handle)
    }

    /// Encrypt `data` with `key`, using a single-part operation
    pub fn encrypt(
        &self,
        key: CK_OBJECT_HANDLE,
        mechanism: &Mechanism,
        data: &[u8],
    ) -> HResult<Vec<u8>> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;
        let mut data = data.to_vec();
        hsm_call!(
            self.hsm,
            format!("Failed to initialize {mechanism} encryption"),
            C_EncryptInit,
            self.handle,
            &raw mut ck_mechanism,
            key
        );

        let mut encrypted_data_len: CK_ULONG = 0;
        hsm_call!(
            self.hsm,
            format!(
                "Failed to allocate encrypted data length. Data to encrypt is likely too big: {} \
                 bytes. Error code",
                data.len()
            ),
            C_Encrypt,
            self.handle,
            data.as_mut_ptr(),
            CK_ULONG::try_from(data.len())?,
            ptr::null_mut(),
            &raw mut encrypted_data_len
        );

        let mut encrypted_data = vec![0_u8; usize::try_from(encrypted_data_len)?];
        hsm_call!(
            self.hsm,
            "Failed to encrypt data",
            C_Encrypt,
            self.handle,
            data.as_mut_ptr(),
            CK_ULONG::try_from(data.len())?,
            encrypted_data.as_mut_ptr(),
            &raw mut encrypted_data_len
        );

        encrypted_data.truncate(usize::try_from(encrypted_data_len)?);
        Ok(encrypted_data)
    }

    /// Decrypt `encrypted_data` with `key`, using a single-part operation
    pub fn decrypt(
        &self,
        key: CK_OBJECT_HANDLE,
        mechanism: &Mechanism,
        encrypted_data: &[u8],
    ) -> HResult<Zeroizing<Vec<u8>>> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;
        let mut encrypted_data = encrypted_data.to_vec();
        hsm_call!(
            self.hsm,
            format!("Failed to initialize {mechanism} decryption"),
            C_DecryptInit,
            self.handle,
            &raw mut ck_mechanism,
            key
        );

        let mut decrypted_data_len: CK_ULONG = 0;
        hsm_call!(
            self.hsm,
            "Failed to get decrypted data length",
            C_Decrypt,
            self.handle,
            encrypted_data.as_mut_ptr(),
            CK_ULONG::try_from(encrypted_data.len())?,
            ptr::null_mut(),
            &raw mut decrypted_data_len
        );

        let mut decrypted_data =
            Zeroizing::new(vec![0_u8; usize::try_from(decrypted_data_len)?]);
        hsm_call!(
            self.hsm,
            "Failed to decrypt data",
            C_Decrypt,
            self.handle,
            encrypted_data.as_mut_ptr(),
            CK_ULONG::try_from(encrypted_data.len())?,
            decrypted_data.as_mut_ptr(),
            &raw mut decrypted_data_len
        );

        decrypted_data.truncate(usize::try_from(decrypted_data_len)?);
        Ok(decrypted_data)
    }

    fn call_get_attributes(
        &self,
        object_handle: CK_OBJECT_HANDLE,
        template: &mut [CK_ATTRIBUTE],
    ) -> HResult<Option<()>> {
        #[allow(unsafe_code)]
        let rv = match self.hsm.C_GetAttributeValue {
            Some(func) => unsafe {
                func(
                    self.handle,
                    object_handle,
                    template.as_mut_ptr(),
                    CK_ULONG::try_from(template.len())?,
                )
            },
            None => {
                return Err(HError::Default(
                    "C_GetAttributeValue not available on library".to_owned(),
                ));
            }
        };
        match rv {
            CKR_OK => Ok(Some(())),
            // the object or the attribute does not exist
            CKR_OBJECT_HANDLE_INVALID | CKR_ATTRIBUTE_TYPE_INVALID => Ok(None),
            CKR_ATTRIBUTE_SENSITIVE => Err(HError::Default(format!(
                "The attributes of object {object_handle} are sensitive and cannot be read."
            ))),
            rv => Err(HError::from_rv(
                format!("Failed to get the attributes of object {object_handle}"),
                rv,
            )),
        }
    }

    /// Read a variable length attribute of an object
    pub(crate) fn get_attribute_bytes(
        &self,
        object_handle: CK_OBJECT_HANDLE,
        type_: CK_ATTRIBUTE_TYPE,
    ) -> HResult<Option<Vec<u8>>> {
        let mut template = [CK_ATTRIBUTE {
            type_,
            pValue: ptr::null_mut(),
            ulValueLen: 0,
        }];
        if self
            .call_get_attributes(object_handle, &mut template)?
            .is_none()
        {
            return Ok(None);
        }
        let value_len = template[0].ulValueLen;
        if value_len == CK_ULONG::MAX {
            // CK_UNAVAILABLE_INFORMATION
            return Ok(None);
        }
        let mut value = vec![0_u8; usize::try_from(value_len)?];
        if value.is_empty() {
            return Ok(Some(value));
        }
        let mut template = [CK_ATTRIBUTE {
            type_,
            pValue: value.as_mut_ptr().cast::<std::ffi::c_void>(),
            ulValueLen: value_len,
        }];
        if self
            .call_get_attributes(object_handle, &mut template)?
            .is_none()
        {
            return Ok(None);
        }
        value.truncate(usize::try_from(template[0].ulValueLen)?);
        Ok(Some(value))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed closing session {}: {e}", self.handle);
        }
    }
}
