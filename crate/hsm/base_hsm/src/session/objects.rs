use std::fmt;

use p11_samples_logger::{debug, trace};
use pkcs11_sys::{
    CK_OBJECT_CLASS, CK_OBJECT_HANDLE, CK_ULONG, CKA_CLASS, CKA_EXTRACTABLE, CKA_KEY_TYPE,
    CKA_LABEL, CKA_MODIFIABLE, CKA_TOKEN, CKK_EC, CKK_RSA, CKO_CERTIFICATE, CKO_PRIVATE_KEY,
    CKO_PUBLIC_KEY, CKO_SECRET_KEY,
};

use crate::{HError, HResult, session::Session, template::Template};

/// Class of the objects looked up by label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Secret,
    Private,
    Public,
    Certificate,
}

impl KeyClass {
    #[must_use]
    pub const fn object_class(&self) -> CK_OBJECT_CLASS {
        match self {
            Self::Secret => CKO_SECRET_KEY,
            Self::Private => CKO_PRIVATE_KEY,
            Self::Public => CKO_PUBLIC_KEY,
            Self::Certificate => CKO_CERTIFICATE,
        }
    }
}

impl fmt::Display for KeyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Secret => "secret key",
            Self::Private => "private key",
            Self::Public => "public key",
            Self::Certificate => "certificate",
        })
    }
}

/// Token object searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFilter {
    /// Every token object of a class
    Class(KeyClass),
    /// Every token object
    All,
    /// RSA private keys
    RsaPrivateKeys,
    /// EC public keys
    EcPublicKeys,
    /// Secret keys that can neither be extracted nor modified
    LockedSecretKeys,
}

impl ObjectFilter {
    fn template(self) -> Template {
        let template = Template::new().with_bool(CKA_TOKEN, true);
        match self {
            Self::Class(class) => template.with_ulong(CKA_CLASS, class.object_class()),
            Self::All => template,
            Self::RsaPrivateKeys => template
                .with_ulong(CKA_CLASS, CKO_PRIVATE_KEY)
                .with_ulong(CKA_KEY_TYPE, CKK_RSA),
            Self::EcPublicKeys => template
                .with_ulong(CKA_CLASS, CKO_PUBLIC_KEY)
                .with_ulong(CKA_KEY_TYPE, CKK_EC),
            Self::LockedSecretKeys => template
                .with_ulong(CKA_CLASS, CKO_SECRET_KEY)
                .with_bool(CKA_EXTRACTABLE, false)
                .with_bool(CKA_MODIFIABLE, false),
        }
    }
}

impl fmt::Display for ObjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class} objects"),
            Self::All => f.write_str("token objects"),
            Self::RsaPrivateKeys => f.write_str("RSA private keys"),
            Self::EcPublicKeys => f.write_str("EC public keys"),
            Self::LockedSecretKeys => f.write_str("non-extractable, non-modifiable secret keys"),
        }
    }
}

impl Session {
    fn find_object_handles(&self, template: &Template) -> HResult<Vec<CK_OBJECT_HANDLE>> {
        let mut attributes = template.ck_attributes()?;
        let mut object_handles: Vec<CK_OBJECT_HANDLE> = Vec::new();
        hsm_call!(
            self.hsm(),
            "Failed to initialize object search: C_FindObjectsInit failed",
            C_FindObjectsInit,
            self.session_handle(),
            attributes.as_mut_ptr(),
            CK_ULONG::try_from(attributes.len())?
        );

        // the search is finalized whatever the outcome of the collection
        let collected = self.collect_found_objects(&mut object_handles);
        let finalized = self.find_objects_final();
        collected.and(finalized)?;
        Ok(object_handles)
    }

    fn collect_found_objects(&self, object_handles: &mut Vec<CK_OBJECT_HANDLE>) -> HResult<()> {
        let max_object_count = self.hsm_capabilities().find_max_object_count;
        let mut handles_buf =
            vec![CK_OBJECT_HANDLE::default(); usize::try_from(max_object_count)?];
        let mut object_count: CK_ULONG = 0;
        loop {
            hsm_call!(
                self.hsm(),
                "Failed to find objects",
                C_FindObjects,
                self.session_handle(),
                handles_buf.as_mut_ptr(),
                max_object_count,
                &raw mut object_count
            );
            if object_count == 0 {
                return Ok(());
            }
            trace!("Found {object_count} objects");
            object_handles.extend_from_slice(
                handles_buf
                    .get(..usize::try_from(object_count)?)
                    .ok_or_else(|| {
                        HError::Default("More objects returned than requested".to_owned())
                    })?,
            );
        }
    }

    fn find_objects_final(&self) -> HResult<()> {
        hsm_call!(
            self.hsm(),
            "Failed to finalize object search",
            C_FindObjectsFinal,
            self.session_handle()
        );
        Ok(())
    }

    /// Find the single object of class `class` labelled `label`.
    ///
    /// A handle is cached once a token search returned it as the only match.
    /// Creating an object through a session drops the cached handles of its label.
    ///
    /// # Errors
    /// * `HError::NoSuchKey` when no object matches
    /// * `HError::MultipleObjectsReturned` when several objects match
    pub fn find_key(&self, label: &str, class: KeyClass) -> HResult<CK_OBJECT_HANDLE> {
        let object_class = class.object_class();
        if let Some(handle) = self
            .object_handles_cache()
            .get(label.as_bytes(), object_class)?
        {
            return Ok(handle);
        }
        let template = Template::new()
            .with_ulong(CKA_CLASS, object_class)
            .with_bytes(CKA_LABEL, label.as_bytes());
        match self.find_object_handles(&template)?.as_slice() {
            [] => Err(HError::NoSuchKey(label.to_owned())),
            [handle] => {
                debug!("{class} '{label}' has handle {handle}");
                self.object_handles_cache()
                    .insert(label.as_bytes(), object_class, *handle)?;
                Ok(*handle)
            }
            handles => {
                debug!("Found {} {class}s labelled '{label}'", handles.len());
                Err(HError::MultipleObjectsReturned(label.to_owned()))
            }
        }
    }

    /// List the handles of the token objects matching `filter`
    pub fn find_objects(&self, filter: ObjectFilter) -> HResult<Vec<CK_OBJECT_HANDLE>> {
        let handles = self.find_object_handles(&filter.template())?;
        debug!("Found {} {filter}", handles.len());
        Ok(handles)
    }

    /// Count the token objects matching `filter`
    pub fn count_objects(&self, filter: ObjectFilter) -> HResult<usize> {
        Ok(self.find_objects(filter)?.len())
    }

    /// Get the label of an object; an object without label has an empty one.
    pub fn get_label(&self, object_handle: CK_OBJECT_HANDLE) -> HResult<String> {
        let label = self
            .get_attribute_bytes(object_handle, CKA_LABEL)?
            .unwrap_or_default();
        Ok(String::from_utf8_lossy(&label).into_owned())
    }
}
