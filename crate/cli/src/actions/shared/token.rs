use std::path::Path;

use p11_samples_hsm::{BaseHsm, Session, SlotManager};
use p11_samples_logger::debug;

use crate::{config::ClientConf, error::result::CliResult};

/// A token found by label, with a logged in crypto officer session
pub struct LoggedInToken {
    slot: SlotManager,
}

impl LoggedInToken {
    /// Load the library, find the token labelled `token_label` and log in.
    ///
    /// Each step prints a progress line once it succeeded.
    pub fn login(lib_path: &Path, pin: &str, token_label: &str) -> CliResult<Self> {
        let hsm: BaseHsm = BaseHsm::instantiate(lib_path)?;
        println!("PKCS11 library found at : {}", lib_path.display());

        let slot_id = hsm.find_slot_by_token_label(token_label)?;
        println!("Token found : {token_label}");
        debug!("token {token_label} is in slot {slot_id}");

        let slot = hsm.open_slot(slot_id, Some(pin))?;
        println!("Login success.");
        Ok(Self { slot })
    }

    /// Read the library path and the PIN from `conf`, then log in
    pub fn connect(conf: &ClientConf, token_label: &str) -> CliResult<Self> {
        let lib_path = conf.library_path()?;
        let pin = conf.pin()?;
        Self::login(lib_path, &pin, token_label)
    }

    /// Open a read-write session on the token
    pub fn session(&self) -> CliResult<Session> {
        Ok(self.slot.open_session(true)?)
    }

    pub fn logout(mut self) -> CliResult<()> {
        self.slot.logout()?;
        Ok(())
    }
}
