use pkcs11_sys::CK_SLOT_ID;

use crate::{HError, HResult};

pub fn get_hsm_password() -> HResult<String> {
    std::env::var("HSM_USER_PASSWORD").map_err(|_| {
        HError::Default(
            "The user password for the HSM is not set. Please set the HSM_USER_PASSWORD \
             environment variable"
                .to_owned(),
        )
    })
}

pub fn get_hsm_slot_id() -> HResult<CK_SLOT_ID> {
    let slot_id = std::env::var("HSM_SLOT_ID").map_err(|_| {
        HError::Default("The HSM_SLOT_ID environment variable is not set".to_owned())
    })?;
    slot_id
        .parse::<CK_SLOT_ID>()
        .map_err(|e| HError::Default(format!("Invalid HSM_SLOT_ID {slot_id}: {e}")))
}

/// Optional label of the token in the tested slot
#[must_use]
pub fn get_hsm_token_label() -> Option<String> {
    std::env::var("HSM_TOKEN_LABEL").ok()
}
