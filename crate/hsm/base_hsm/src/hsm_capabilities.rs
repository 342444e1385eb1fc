use pkcs11_sys::CK_ULONG;

/// Vendor specific limits of a PKCS#11 library
#[derive(Debug, Clone)]
pub struct HsmCapabilities {
    /// Maximum number of handles requested per `C_FindObjects` call
    pub find_max_object_count: CK_ULONG,
}

impl Default for HsmCapabilities {
    fn default() -> Self {
        Self {
            find_max_object_count: 64,
        }
    }
}

pub trait HsmProvider: Send + Sync + 'static {
    fn capabilities() -> HsmCapabilities;
}
