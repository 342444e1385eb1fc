use std::{
    fmt,
    fmt::{Display, Formatter},
    marker::PhantomData,
    sync::Arc,
};

use p11_samples_logger::debug;
use pkcs11_sys::{
    CK_BBOOL, CK_FALSE, CK_INFO, CK_SLOT_ID, CK_SLOT_INFO, CK_TOKEN_INFO, CK_TRUE, CK_ULONG,
    CK_VERSION, CKF_HW_SLOT, CKF_LOGIN_REQUIRED, CKF_REMOVABLE_DEVICE, CKF_TOKEN_INITIALIZED,
    CKF_TOKEN_PRESENT, CKF_USER_PIN_INITIALIZED,
};

use crate::{
    HError, HResult, SlotManager,
    hsm_capabilities::{HsmCapabilities, HsmProvider},
    hsm_lib::HsmLib,
};

pub struct DefaultCapabilityProvider;
impl HsmProvider for DefaultCapabilityProvider {
    fn capabilities() -> HsmCapabilities {
        HsmCapabilities::default()
    }
}

/// A loaded PKCS#11 library and the slots it exposes.
pub struct BaseHsm<P: HsmProvider = DefaultCapabilityProvider> {
    hsm_lib: Arc<HsmLib>,
    _provider: PhantomData<P>,
}

impl<P: HsmProvider> BaseHsm<P> {
    /// Load the PKCS#11 library at `path` and initialize it.
    pub fn instantiate<Pth: AsRef<std::ffi::OsStr>>(path: Pth) -> HResult<Self> {
        debug!("Using PKCS#11 library with {:?}", P::capabilities());
        let hsm_lib = Arc::new(HsmLib::instantiate(path)?);
        Ok(Self {
            hsm_lib,
            _provider: PhantomData,
        })
    }

    pub fn get_info(&self) -> HResult<Info> {
        let mut info = CK_INFO::default();
        hsm_call!(
            self.hsm_lib,
            "Failed getting the library info",
            C_GetInfo,
            &raw mut info
        );
        Ok(info.into())
    }

    /// List the slot ids, optionally only those with a token present.
    pub fn get_slot_list(&self, token_present: bool) -> HResult<Vec<CK_SLOT_ID>> {
        let token_present: CK_BBOOL = if token_present { CK_TRUE } else { CK_FALSE };
        let mut count: CK_ULONG = 0;
        hsm_call!(
            self.hsm_lib,
            "Failed to count the slots",
            C_GetSlotList,
            token_present,
            std::ptr::null_mut(),
            &raw mut count
        );
        let mut slots: Vec<CK_SLOT_ID> = vec![0; usize::try_from(count)?];
        if slots.is_empty() {
            return Ok(slots);
        }
        hsm_call!(
            self.hsm_lib,
            "Failed to list the slots",
            C_GetSlotList,
            token_present,
            slots.as_mut_ptr(),
            &raw mut count
        );
        slots.truncate(usize::try_from(count)?);
        Ok(slots)
    }

    pub fn get_slot_description(&self, slot_id: CK_SLOT_ID) -> HResult<SlotDescription> {
        let mut info = CK_SLOT_INFO {
            slotDescription: [0; 64],
            manufacturerID: [0; 32],
            flags: 0,
            hardwareVersion: CK_VERSION { major: 0, minor: 0 },
            firmwareVersion: CK_VERSION { major: 0, minor: 0 },
        };
        hsm_call!(
            self.hsm_lib,
            format!("Failed getting the info of slot {slot_id}"),
            C_GetSlotInfo,
            slot_id,
            &raw mut info
        );
        Ok(SlotDescription::new(slot_id, &info))
    }

    pub fn get_token_description(&self, slot_id: CK_SLOT_ID) -> HResult<TokenDescription> {
        let mut info = CK_TOKEN_INFO::default();
        hsm_call!(
            self.hsm_lib,
            format!("Failed getting the token info of slot {slot_id}"),
            C_GetTokenInfo,
            slot_id,
            &raw mut info
        );
        Ok(TokenDescription::new(slot_id, &info))
    }

    /// Find the first slot holding a token with this exact label.
    ///
    /// # Errors
    /// `HError::NoSuchToken` when no present token carries the label
    pub fn find_slot_by_token_label(&self, label: &str) -> HResult<CK_SLOT_ID> {
        for slot_id in self.get_slot_list(true)? {
            let token = self.get_token_description(slot_id)?;
            debug!("slot {slot_id} holds token '{}'", token.label);
            if token.label == label {
                return Ok(slot_id);
            }
        }
        Err(HError::NoSuchToken(label.to_owned()))
    }

    /// Open a slot, logging in as the crypto officer (`CKU_USER`) when a PIN is given.
    pub fn open_slot(&self, slot_id: CK_SLOT_ID, pin: Option<&str>) -> HResult<SlotManager> {
        SlotManager::instantiate(self.hsm_lib.clone(), slot_id, pin, P::capabilities())
    }
}

/// Decode a fixed-width, blank padded PKCS#11 string.
pub(crate) fn padded_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches([' ', '\0'])
        .to_owned()
}

fn version(v: CK_VERSION) -> (u8, u8) {
    (v.major, v.minor)
}

pub struct Info {
    pub cryptokiVersion: (u8, u8),
    pub manufacturerID: String,
    pub libraryDescription: String,
    pub libraryVersion: (u8, u8),
}

impl From<CK_INFO> for Info {
    fn from(info: CK_INFO) -> Self {
        Self {
            cryptokiVersion: version(info.cryptokiVersion),
            manufacturerID: padded_to_string(&info.manufacturerID),
            libraryDescription: padded_to_string(&info.libraryDescription),
            libraryVersion: version(info.libraryVersion),
        }
    }
}

impl Display for Info {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cryptoki Version : {}.{}\nManufacturer ID : {}\nLibrary Description : {}\nLibrary \
             Version : {}.{}",
            self.cryptokiVersion.0,
            self.cryptokiVersion.1,
            self.manufacturerID,
            self.libraryDescription,
            self.libraryVersion.0,
            self.libraryVersion.1
        )
    }
}

pub struct SlotDescription {
    pub slot_id: CK_SLOT_ID,
    pub description: String,
    pub manufacturer_id: String,
    pub token_present: bool,
    pub removable_device: bool,
    pub hardware_slot: bool,
    pub hardware_version: (u8, u8),
    pub firmware_version: (u8, u8),
}

impl SlotDescription {
    fn new(slot_id: CK_SLOT_ID, info: &CK_SLOT_INFO) -> Self {
        Self {
            slot_id,
            description: padded_to_string(&info.slotDescription),
            manufacturer_id: padded_to_string(&info.manufacturerID),
            token_present: info.flags & CKF_TOKEN_PRESENT != 0,
            removable_device: info.flags & CKF_REMOVABLE_DEVICE != 0,
            hardware_slot: info.flags & CKF_HW_SLOT != 0,
            hardware_version: version(info.hardwareVersion),
            firmware_version: version(info.firmwareVersion),
        }
    }
}

impl Display for SlotDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slot ID : {}\nSlot Description : {}\nManufacturer : {}\nHardware Version : \
             {}.{}\nFirmware Version : {}.{}",
            self.slot_id,
            self.description,
            self.manufacturer_id,
            self.hardware_version.0,
            self.hardware_version.1,
            self.firmware_version.0,
            self.firmware_version.1
        )
    }
}

pub struct TokenDescription {
    pub slot_id: CK_SLOT_ID,
    pub label: String,
    pub manufacturer_id: String,
    pub model: String,
    pub serial_number: String,
    pub initialized: bool,
    pub login_required: bool,
    pub user_pin_initialized: bool,
}

impl TokenDescription {
    fn new(slot_id: CK_SLOT_ID, info: &CK_TOKEN_INFO) -> Self {
        Self {
            slot_id,
            label: padded_to_string(&info.label),
            manufacturer_id: padded_to_string(&info.manufacturerID),
            model: padded_to_string(&info.model),
            serial_number: padded_to_string(&info.serialNumber),
            initialized: info.flags & CKF_TOKEN_INITIALIZED != 0,
            login_required: info.flags & CKF_LOGIN_REQUIRED != 0,
            user_pin_initialized: info.flags & CKF_USER_PIN_INITIALIZED != 0,
        }
    }
}

impl Display for TokenDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token Label : {}\nManufacturer : {}\nModel : {}\nSerial Number : {}",
            self.label, self.manufacturer_id, self.model, self.serial_number
        )
    }
}
