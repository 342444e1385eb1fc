use std::ptr;

use p11_samples_logger::debug;
use pkcs11_sys::{CK_OBJECT_HANDLE, CK_ULONG};

use crate::{
    HResult,
    session::{Session, mechanism::Mechanism},
    template::Template,
};

impl Session {
    /// Wrap `key` with `wrapping_key` and return the raw wrapped blob
    pub fn wrap_key(
        &self,
        wrapping_key: CK_OBJECT_HANDLE,
        key: CK_OBJECT_HANDLE,
        mechanism: &Mechanism,
    ) -> HResult<Vec<u8>> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;

        // Determine the length of the wrapped key
        let mut wrapped_key_len: CK_ULONG = 0;
        hsm_call!(
            self.hsm(),
            format!("Failed to get the {mechanism} wrapped key length"),
            C_WrapKey,
            self.session_handle(),
            &raw mut ck_mechanism,
            wrapping_key,
            key,
            ptr::null_mut(),
            &raw mut wrapped_key_len
        );

        let mut wrapped_key = vec![0_u8; usize::try_from(wrapped_key_len)?];
        hsm_call!(
            self.hsm(),
            format!("Failed to wrap the key with {mechanism}"),
            C_WrapKey,
            self.session_handle(),
            &raw mut ck_mechanism,
            wrapping_key,
            key,
            wrapped_key.as_mut_ptr(),
            &raw mut wrapped_key_len
        );

        // Truncate the buffer to the actual size of the wrapped key
        wrapped_key.truncate(usize::try_from(wrapped_key_len)?);
        debug!("{mechanism}: wrapped key is {} bytes", wrapped_key.len());
        Ok(wrapped_key)
    }

    /// Unwrap `wrapped_key` with `unwrapping_key` into a new object described by `template`
    pub(crate) fn unwrap_key(
        &self,
        unwrapping_key: CK_OBJECT_HANDLE,
        wrapped_key: &[u8],
        mechanism: &Mechanism,
        template: &Template,
    ) -> HResult<CK_OBJECT_HANDLE> {
        let mut params = mechanism.parameters();
        let mut ck_mechanism = params.ck_mechanism()?;
        let mut wrapped_key = wrapped_key.to_vec();
        let mut attributes = template.ck_attributes()?;
        let mut handle: CK_OBJECT_HANDLE = 0;
        hsm_call!(
            self.hsm(),
            format!("Failed to unwrap the key with {mechanism}"),
            C_UnwrapKey,
            self.session_handle(),
            &raw mut ck_mechanism,
            unwrapping_key,
            wrapped_key.as_mut_ptr(),
            CK_ULONG::try_from(wrapped_key.len())?,
            attributes.as_mut_ptr(),
            CK_ULONG::try_from(attributes.len())?,
            &raw mut handle
        );
        self.forget_cached_label(template)?;
        Ok(handle)
    }
}
