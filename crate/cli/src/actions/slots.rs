use clap::{Parser, Subcommand};
use p11_samples_hsm::BaseHsm;
use p11_samples_logger::debug;

use crate::{actions::shared::LoggedInToken, config::ClientConf, error::result::CliResult};

/// Enumerate slots, show the library information and log in and out of a token
#[derive(Subcommand, Debug)]
pub enum SlotsCommands {
    List(ListSlotsAction),
    Info(LibraryInfoAction),
    LoginLogout(LoginLogoutAction),
}

impl SlotsCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::List(action) => action.process(conf),
            Self::Info(action) => action.process(conf),
            Self::LoginLogout(action) => action.process(conf),
        }
    }
}

/// List the slots holding a token.
#[derive(Parser, Debug)]
pub struct ListSlotsAction;

impl ListSlotsAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let hsm: BaseHsm = BaseHsm::instantiate(conf.library_path()?)?;
        let slots = hsm.get_slot_list(true)?;
        if slots.is_empty() {
            println!("No slots were found.\n");
            return Ok(());
        }
        println!();
        for slot_id in slots {
            let slot = hsm.get_slot_description(slot_id)?;
            debug!(
                "slot {slot_id}: removable: {}, hardware: {}",
                slot.removable_device, slot.hardware_slot
            );
            println!("{slot}");
            println!("{}", hsm.get_token_description(slot_id)?);
            println!("-----------------\n");
        }
        Ok(())
    }
}

/// Show the Cryptoki version and the description of the PKCS#11 library.
#[derive(Parser, Debug)]
pub struct LibraryInfoAction;

impl LibraryInfoAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let lib_path = conf.library_path()?;
        let hsm: BaseHsm = BaseHsm::instantiate(lib_path)?;
        println!("PKCS11 library found at : {}\n", lib_path.display());
        println!("{}\n", hsm.get_info()?);
        Ok(())
    }
}

/// Log in as crypto officer (`CKU_USER`), then log out.
#[derive(Parser, Debug)]
pub struct LoginLogoutAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,
}

impl LoginLogoutAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        token.logout()?;
        println!("Logout success.\n");
        Ok(())
    }
}
