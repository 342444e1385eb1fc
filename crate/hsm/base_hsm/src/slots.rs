use std::{
    num::NonZeroUsize,
    ptr,
    sync::{Arc, Mutex, MutexGuard},
};

use lru::LruCache;
use p11_samples_logger::{debug, warn};
use pkcs11_sys::{
    CK_FLAGS, CK_OBJECT_CLASS, CK_OBJECT_HANDLE, CK_SESSION_HANDLE, CK_SLOT_ID, CK_ULONG,
    CK_UTF8CHAR_PTR, CKF_RW_SESSION, CKF_SERIAL_SESSION, CKR_OK, CKR_USER_ALREADY_LOGGED_IN,
    CKU_USER,
};
use zeroize::Zeroizing;

use crate::{
    HError, HResult, Session, hsm_capabilities::HsmCapabilities, hsm_lib::HsmLib,
};

const OBJECT_HANDLES_CACHE_SIZE: usize = 100;

/// A cache of object handles, keyed by label and object class.
///
/// Handles are only valid for the lifetime of the library instance, so the cache
/// lives in the `SlotManager` and is shared by the sessions it opens.
pub struct ObjectHandlesCache(Mutex<LruCache<Vec<u8>, CK_OBJECT_HANDLE>>);

impl Default for ObjectHandlesCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectHandlesCache {
    #[must_use]
    pub fn new() -> Self {
        let max = NonZeroUsize::new(OBJECT_HANDLES_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self(Mutex::new(LruCache::new(max)))
    }

    fn key(label: &[u8], class: CK_OBJECT_CLASS) -> Vec<u8> {
        let mut key = class.to_be_bytes().to_vec();
        key.extend_from_slice(label);
        key
    }

    fn lock(&self) -> HResult<MutexGuard<'_, LruCache<Vec<u8>, CK_OBJECT_HANDLE>>> {
        self.0
            .lock()
            .map_err(|e| HError::Default(format!("Failed to lock the handles cache: {e}")))
    }

    /// Get the object handle for the specified label and class.
    pub fn get(&self, label: &[u8], class: CK_OBJECT_CLASS) -> HResult<Option<CK_OBJECT_HANDLE>> {
        Ok(self.lock()?.get(&Self::key(label, class)).copied())
    }

    /// Insert a new object handle into the cache.
    pub fn insert(
        &self,
        label: &[u8],
        class: CK_OBJECT_CLASS,
        value: CK_OBJECT_HANDLE,
    ) -> HResult<()> {
        self.lock()?.put(Self::key(label, class), value);
        Ok(())
    }

    /// Remove every entry pointing to the given handle.
    pub fn remove_handle(&self, handle: CK_OBJECT_HANDLE) -> HResult<()> {
        self.remove_where(|_, h| h == handle)
    }

    /// Remove the entries of `label`, whatever their class.
    pub fn remove_label(&self, label: &[u8]) -> HResult<()> {
        let class_len = size_of::<CK_OBJECT_CLASS>();
        self.remove_where(|key, _| key.get(class_len..) == Some(label))
    }

    fn remove_where(&self, stale: impl Fn(&[u8], CK_OBJECT_HANDLE) -> bool) -> HResult<()> {
        let mut cache = self.lock()?;
        let keys: Vec<Vec<u8>> = cache
            .iter()
            .filter(|(k, h)| stale(k.as_slice(), **h))
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            cache.pop(&key);
        }
        Ok(())
    }
}

/// A slot of the PKCS#11 library.
///
/// When opened with a PIN, the slot keeps a logged-in session alive: PKCS#11 login
/// state is shared by every session of the application on that token, so the
/// sessions opened afterwards are authenticated too.
pub struct SlotManager {
    hsm_lib: Arc<HsmLib>,
    slot_id: CK_SLOT_ID,
    object_handles_cache: Arc<ObjectHandlesCache>,
    hsm_capabilities: HsmCapabilities,
    login_session: Option<Session>,
}

impl SlotManager {
    /// Create a new SlotManager instance for the specified slot.
    /// If a PIN is provided, the slot is authenticated as `CKU_USER`.
    ///
    /// # Errors
    /// * `HError::PinIncorrect` if the token rejects the PIN
    /// * any other failure to open the session or log in
    pub(crate) fn instantiate(
        hsm_lib: Arc<HsmLib>,
        slot_id: CK_SLOT_ID,
        login_pin: Option<&str>,
        hsm_capabilities: HsmCapabilities,
    ) -> HResult<Self> {
        let object_handles_cache = Arc::new(ObjectHandlesCache::new());
        let login_session = match login_pin {
            Some(pin) => Some(Self::open_session_(
                &hsm_lib,
                slot_id,
                false,
                object_handles_cache.clone(),
                Some(pin),
                hsm_capabilities.clone(),
            )?),
            None => None,
        };
        Ok(Self {
            hsm_lib,
            slot_id,
            object_handles_cache,
            hsm_capabilities,
            login_session,
        })
    }

    #[must_use]
    pub const fn slot_id(&self) -> CK_SLOT_ID {
        self.slot_id
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.login_session.is_some()
    }

    /// Open a new session with the slot, read-only or read-write.
    /// The session is closed when dropped.
    pub fn open_session(&self, read_write: bool) -> HResult<Session> {
        Self::open_session_(
            &self.hsm_lib,
            self.slot_id,
            read_write,
            self.object_handles_cache.clone(),
            None,
            self.hsm_capabilities.clone(),
        )
    }

    /// Log out of the token and close the login session.
    pub fn logout(&mut self) -> HResult<()> {
        match self.login_session.take() {
            Some(session) => session.close(),
            None => Err(HError::Default("The slot is not logged in".to_owned())),
        }
    }

    fn open_session_(
        hsm_lib: &Arc<HsmLib>,
        slot_id: CK_SLOT_ID,
        read_write: bool,
        object_handles_cache: Arc<ObjectHandlesCache>,
        login_pin: Option<&str>,
        hsm_capabilities: HsmCapabilities,
    ) -> HResult<Session> {
        let flags: CK_FLAGS = if read_write {
            CKF_RW_SESSION | CKF_SERIAL_SESSION
        } else {
            CKF_SERIAL_SESSION
        };
        let mut session_handle: CK_SESSION_HANDLE = 0;
        hsm_call!(
            hsm_lib,
            format!("Failed opening a session on slot {slot_id}"),
            C_OpenSession,
            slot_id,
            flags,
            ptr::null_mut(),
            None,
            &raw mut session_handle
        );
        debug!("Opened session {session_handle} on slot {slot_id}");
        let mut logged_in = false;
        if let Some(pin) = login_pin {
            let mut pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
            let pin_len = CK_ULONG::try_from(pin_bytes.len())?;
            #[allow(unsafe_code)]
            let rv = unsafe {
                hsm_lib
                    .C_Login
                    .ok_or_else(|| HError::Default("C_Login not available on library".to_owned()))?(
                    session_handle,
                    CKU_USER,
                    pin_bytes.as_mut_ptr() as CK_UTF8CHAR_PTR,
                    pin_len,
                )
            };
            if rv == CKR_USER_ALREADY_LOGGED_IN {
                warn!("user already logged in, ignoring logging");
            } else if rv != CKR_OK {
                // the session is useless without the login
                drop(Session::new(
                    hsm_lib.clone(),
                    session_handle,
                    object_handles_cache,
                    false,
                    hsm_capabilities,
                ));
                return Err(HError::from_rv("Failed logging in", rv));
            } else {
                logged_in = true;
            }
        }
        Ok(Session::new(
            hsm_lib.clone(),
            session_handle,
            object_handles_cache,
            logged_in,
            hsm_capabilities,
        ))
    }
}
