//! SoftHSM2 support: the library is fully supported by `BaseHsm`, only the
//! default library location and the search batch size are specific.

use p11_samples_hsm::{BaseHsm, HsmCapabilities, HsmProvider};

#[cfg(test)]
#[cfg(feature = "softhsm2")]
mod tests;

/// Default location of the SoftHSM2 PKCS#11 library on Debian based distributions
pub const SOFTHSM2_PKCS11_LIB: &str = "/usr/lib/softhsm/libsofthsm2.so";

pub struct SofthsmCapabilityProvider;

impl HsmProvider for SofthsmCapabilityProvider {
    fn capabilities() -> HsmCapabilities {
        HsmCapabilities {
            find_max_object_count: 32,
        }
    }
}

pub type Softhsm2 = BaseHsm<SofthsmCapabilityProvider>;
