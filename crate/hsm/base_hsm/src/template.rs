use pkcs11_sys::{CK_ATTRIBUTE, CK_ATTRIBUTE_TYPE, CK_BBOOL, CK_FALSE, CK_TRUE, CK_ULONG};

use crate::HResult;

/// An attribute template that owns the storage of its values.
///
/// The `CK_ATTRIBUTE` array handed to the library points into this struct,
/// so the template must outlive the PKCS#11 call that uses the array.
#[derive(Debug, Default, Clone)]
pub(crate) struct Template {
    attributes: Vec<(CK_ATTRIBUTE_TYPE, Vec<u8>)>,
}

impl Template {
    pub(crate) const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn with_bool(mut self, type_: CK_ATTRIBUTE_TYPE, value: bool) -> Self {
        let value: CK_BBOOL = if value { CK_TRUE } else { CK_FALSE };
        self.attributes.push((type_, vec![value]));
        self
    }

    #[must_use]
    pub(crate) fn with_ulong(mut self, type_: CK_ATTRIBUTE_TYPE, value: CK_ULONG) -> Self {
        self.attributes.push((type_, value.to_ne_bytes().to_vec()));
        self
    }

    #[must_use]
    pub(crate) fn with_bytes(mut self, type_: CK_ATTRIBUTE_TYPE, value: &[u8]) -> Self {
        self.attributes.push((type_, value.to_vec()));
        self
    }

    /// Value of the first attribute of type `type_`
    pub(crate) fn value(&self, type_: CK_ATTRIBUTE_TYPE) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|(t, _)| *t == type_)
            .map(|(_, value)| value.as_slice())
    }

    /// Raw attributes pointing into this template
    pub(crate) fn ck_attributes(&self) -> HResult<Vec<CK_ATTRIBUTE>> {
        self.attributes
            .iter()
            .map(|(type_, value)| {
                Ok(CK_ATTRIBUTE {
                    type_: *type_,
                    pValue: value.as_ptr().cast::<std::ffi::c_void>().cast_mut(),
                    ulValueLen: CK_ULONG::try_from(value.len())?,
                })
            })
            .collect()
    }
}
