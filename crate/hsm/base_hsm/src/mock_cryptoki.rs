//! An in-memory Cryptoki token for unit tests.
//!
//! Only the entry points needed to create, search, read and destroy objects and
//! to tear a session down are provided. Each test thread gets its own token, and
//! the flags of `Token` make chosen calls fail.
#![allow(unsafe_code)]

use std::{cell::RefCell, slice, sync::Arc};

use pkcs11_sys::{
    CK_ATTRIBUTE, CK_ATTRIBUTE_PTR, CK_ATTRIBUTE_TYPE, CK_BYTE_PTR, CK_MECHANISM_PTR,
    CK_OBJECT_CLASS, CK_OBJECT_HANDLE, CK_OBJECT_HANDLE_PTR, CK_RV, CK_SESSION_HANDLE, CK_ULONG,
    CK_ULONG_PTR, CK_VOID_PTR, CKA_BASE, CKA_CLASS, CKA_PRIME, CKA_PRIME_BITS, CKA_SUBPRIME,
    CKM_DSA_PARAMETER_GEN, CKO_SECRET_KEY, CKR_ATTRIBUTE_TYPE_INVALID, CKR_BUFFER_TOO_SMALL,
    CKR_DEVICE_ERROR, CKR_OBJECT_HANDLE_INVALID, CKR_OK, CKR_OPERATION_ACTIVE,
    CKR_OPERATION_NOT_INITIALIZED,
};

use crate::{HsmCapabilities, ObjectHandlesCache, Session, hsm_lib::HsmLib};

pub(crate) const SESSION_HANDLE: CK_SESSION_HANDLE = 1;

/// Handles returned per `C_FindObjects` call, small enough to need several calls
const FIND_BATCH: CK_ULONG = 2;

/// Length of the DSA subprime `q`
const SUBPRIME_LEN: usize = 32;

struct MockObject {
    handle: CK_OBJECT_HANDLE,
    attributes: Vec<(CK_ATTRIBUTE_TYPE, Vec<u8>)>,
}

impl MockObject {
    fn value(&self, type_: CK_ATTRIBUTE_TYPE) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|(t, _)| *t == type_)
            .map(|(_, v)| v.as_slice())
    }

    /// Whether every attribute of the search template has the same value here
    fn matches(&self, criteria: &[(CK_ATTRIBUTE_TYPE, Vec<u8>)]) -> bool {
        criteria
            .iter()
            .all(|(type_, value)| self.value(*type_) == Some(value.as_slice()))
    }
}

#[derive(Default)]
pub(crate) struct Token {
    objects: Vec<MockObject>,
    last_handle: CK_OBJECT_HANDLE,
    search: Option<Vec<CK_OBJECT_HANDLE>>,
    pub(crate) fail_find_objects: bool,
    pub(crate) fail_logout: bool,
    pub(crate) finalized_searches: usize,
    pub(crate) closed_sessions: Vec<CK_SESSION_HANDLE>,
}

impl Token {
    fn create(&mut self, attributes: Vec<(CK_ATTRIBUTE_TYPE, Vec<u8>)>) -> CK_OBJECT_HANDLE {
        self.last_handle += 1;
        self.objects.push(MockObject {
            handle: self.last_handle,
            attributes,
        });
        self.last_handle
    }

    pub(crate) fn search_active(&self) -> bool {
        self.search.is_some()
    }

    pub(crate) fn has_object_of_class(&self, class: CK_OBJECT_CLASS) -> bool {
        self.objects
            .iter()
            .any(|o| o.value(CKA_CLASS) == Some(class.to_ne_bytes().as_slice()))
    }
}

thread_local! {
    static TOKEN: RefCell<Token> = RefCell::new(Token::default());
}

pub(crate) fn with_token<R>(f: impl FnOnce(&mut Token) -> R) -> R {
    TOKEN.with(|token| f(&mut token.borrow_mut()))
}

/// A session on the token of the current thread
pub(crate) fn session(logging_in: bool) -> Session {
    let mut hsm = HsmLib::unloaded();
    hsm.C_Initialize = Some(initialize);
    hsm.C_Finalize = Some(finalize);
    hsm.C_Logout = Some(logout);
    hsm.C_CloseSession = Some(close_session);
    hsm.C_GenerateKey = Some(generate_key);
    hsm.C_GenerateKeyPair = Some(generate_key_pair);
    hsm.C_UnwrapKey = Some(unwrap_key);
    hsm.C_FindObjectsInit = Some(find_objects_init);
    hsm.C_FindObjects = Some(find_objects);
    hsm.C_FindObjectsFinal = Some(find_objects_final);
    hsm.C_GetAttributeValue = Some(get_attribute_value);
    hsm.C_DestroyObject = Some(destroy_object);
    Session::new(
        Arc::new(hsm),
        SESSION_HANDLE,
        Arc::new(ObjectHandlesCache::new()),
        logging_in,
        HsmCapabilities {
            find_max_object_count: FIND_BATCH,
        },
    )
}

fn ulong_len(len: CK_ULONG) -> usize {
    usize::try_from(len).unwrap_or_default()
}

/// Copy the attributes of a template handed over by the caller
unsafe fn read_template(
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
) -> Vec<(CK_ATTRIBUTE_TYPE, Vec<u8>)> {
    if template.is_null() || count == 0 {
        return Vec::new();
    }
    let attributes: &[CK_ATTRIBUTE] = unsafe { slice::from_raw_parts(template, ulong_len(count)) };
    attributes
        .iter()
        .map(|attribute| {
            let len = ulong_len(attribute.ulValueLen);
            let value = if attribute.pValue.is_null() || len == 0 {
                Vec::new()
            } else {
                unsafe { slice::from_raw_parts(attribute.pValue.cast::<u8>(), len) }.to_vec()
            };
            (attribute.type_, value)
        })
        .collect()
}

unsafe extern "C" fn initialize(_init_args: CK_VOID_PTR) -> CK_RV {
    CKR_OK
}

unsafe extern "C" fn finalize(_reserved: CK_VOID_PTR) -> CK_RV {
    CKR_OK
}

unsafe extern "C" fn logout(_session: CK_SESSION_HANDLE) -> CK_RV {
    with_token(|token| {
        if token.fail_logout {
            CKR_DEVICE_ERROR
        } else {
            CKR_OK
        }
    })
}

unsafe extern "C" fn close_session(session: CK_SESSION_HANDLE) -> CK_RV {
    with_token(|token| token.closed_sessions.push(session));
    CKR_OK
}

unsafe extern "C" fn generate_key(
    _session: CK_SESSION_HANDLE,
    mechanism: CK_MECHANISM_PTR,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
    key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    let mut attributes = unsafe { read_template(template, count) };
    if !attributes.iter().any(|(t, _)| *t == CKA_CLASS) {
        attributes.push((CKA_CLASS, CKO_SECRET_KEY.to_ne_bytes().to_vec()));
    }
    if unsafe { (*mechanism).mechanism } == CKM_DSA_PARAMETER_GEN {
        let prime_bits = attributes
            .iter()
            .find(|(t, _)| *t == CKA_PRIME_BITS)
            .and_then(|(_, v)| <[u8; size_of::<CK_ULONG>()]>::try_from(v.as_slice()).ok())
            .map_or(0, CK_ULONG::from_ne_bytes);
        let prime_len = ulong_len(prime_bits) / 8;
        attributes.push((CKA_PRIME, vec![0xC5; prime_len]));
        attributes.push((CKA_SUBPRIME, vec![0xA3; SUBPRIME_LEN]));
        attributes.push((CKA_BASE, vec![0x02; prime_len]));
    }
    let handle = with_token(|token| token.create(attributes));
    unsafe { *key = handle };
    CKR_OK
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn generate_key_pair(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    public_template: CK_ATTRIBUTE_PTR,
    public_count: CK_ULONG,
    private_template: CK_ATTRIBUTE_PTR,
    private_count: CK_ULONG,
    public_key: CK_OBJECT_HANDLE_PTR,
    private_key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    let public_attributes = unsafe { read_template(public_template, public_count) };
    let private_attributes = unsafe { read_template(private_template, private_count) };
    let (public, private) = with_token(|token| {
        (
            token.create(public_attributes),
            token.create(private_attributes),
        )
    });
    unsafe {
        *public_key = public;
        *private_key = private;
    }
    CKR_OK
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn unwrap_key(
    _session: CK_SESSION_HANDLE,
    _mechanism: CK_MECHANISM_PTR,
    _unwrapping_key: CK_OBJECT_HANDLE,
    _wrapped_key: CK_BYTE_PTR,
    _wrapped_key_len: CK_ULONG,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
    key: CK_OBJECT_HANDLE_PTR,
) -> CK_RV {
    let attributes = unsafe { read_template(template, count) };
    let handle = with_token(|token| token.create(attributes));
    unsafe { *key = handle };
    CKR_OK
}

unsafe extern "C" fn find_objects_init(
    _session: CK_SESSION_HANDLE,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
) -> CK_RV {
    let criteria = unsafe { read_template(template, count) };
    with_token(|token| {
        if token.search.is_some() {
            return CKR_OPERATION_ACTIVE;
        }
        token.search = Some(
            token
                .objects
                .iter()
                .filter(|o| o.matches(&criteria))
                .map(|o| o.handle)
                .collect(),
        );
        CKR_OK
    })
}

unsafe extern "C" fn find_objects(
    _session: CK_SESSION_HANDLE,
    handles: CK_OBJECT_HANDLE_PTR,
    max_count: CK_ULONG,
    count: CK_ULONG_PTR,
) -> CK_RV {
    with_token(|token| {
        if token.fail_find_objects {
            return CKR_DEVICE_ERROR;
        }
        let Some(found) = token.search.as_mut() else {
            return CKR_OPERATION_NOT_INITIALIZED;
        };
        let n = found.len().min(ulong_len(max_count));
        for (i, handle) in found.drain(..n).enumerate() {
            unsafe { *handles.add(i) = handle };
        }
        unsafe { *count = CK_ULONG::try_from(n).unwrap_or_default() };
        CKR_OK
    })
}

unsafe extern "C" fn find_objects_final(_session: CK_SESSION_HANDLE) -> CK_RV {
    with_token(|token| {
        if token.search.take().is_none() {
            return CKR_OPERATION_NOT_INITIALIZED;
        }
        token.finalized_searches += 1;
        CKR_OK
    })
}

unsafe extern "C" fn get_attribute_value(
    _session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
    template: CK_ATTRIBUTE_PTR,
    count: CK_ULONG,
) -> CK_RV {
    let attributes: &mut [CK_ATTRIBUTE] =
        unsafe { slice::from_raw_parts_mut(template, ulong_len(count)) };
    with_token(|token| {
        let Some(object) = token.objects.iter().find(|o| o.handle == object) else {
            return CKR_OBJECT_HANDLE_INVALID;
        };
        let mut rv = CKR_OK;
        for attribute in attributes.iter_mut() {
            let Some(value) = object.value(attribute.type_) else {
                // CK_UNAVAILABLE_INFORMATION
                attribute.ulValueLen = CK_ULONG::MAX;
                rv = CKR_ATTRIBUTE_TYPE_INVALID;
                continue;
            };
            if !attribute.pValue.is_null() {
                if ulong_len(attribute.ulValueLen) < value.len() {
                    rv = CKR_BUFFER_TOO_SMALL;
                } else {
                    unsafe {
                        attribute
                            .pValue
                            .cast::<u8>()
                            .copy_from_nonoverlapping(value.as_ptr(), value.len());
                    }
                }
            }
            attribute.ulValueLen = CK_ULONG::try_from(value.len()).unwrap_or_default();
        }
        rv
    })
}

unsafe extern "C" fn destroy_object(
    _session: CK_SESSION_HANDLE,
    object: CK_OBJECT_HANDLE,
) -> CK_RV {
    with_token(|token| {
        let before = token.objects.len();
        token.objects.retain(|o| o.handle != object);
        if token.objects.len() == before {
            CKR_OBJECT_HANDLE_INVALID
        } else {
            CKR_OK
        }
    })
}
