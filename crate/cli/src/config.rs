use std::path::{Path, PathBuf};

use p11_samples_logger::debug;
use zeroize::Zeroizing;

use crate::error::{CliError, result::CliResult};

/// Environment variable holding the path of the PKCS#11 library
pub const P11_LIB_ENV: &str = "P11_LIB";
/// Environment variable holding the crypto officer PIN
pub const P11_PIN_ENV: &str = "P11_PIN";

const P11_LIB_EXAMPLE: &str = "/usr/safenet/lunaclient/lib/libCryptoki2_64.so";
const PIN_PROMPT: &str = "Crypto officer password: ";

/// Library location and credentials, gathered from the command line and the environment
#[derive(Debug, Default)]
pub struct ClientConf {
    lib_path: Option<PathBuf>,
    pin: Option<Zeroizing<String>>,
}

impl ClientConf {
    #[must_use]
    pub fn new(lib_path: Option<PathBuf>, pin: Option<String>) -> Self {
        Self {
            lib_path,
            pin: pin.map(Zeroizing::new),
        }
    }

    /// The path of the PKCS#11 library.
    ///
    /// # Errors
    /// Fails with a hint on how to set `P11_LIB` when no path was given.
    pub fn library_path(&self) -> CliResult<&Path> {
        match self.lib_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(CliError::Configuration(format!(
                "*** {P11_LIB_ENV} environment variable not set. ***\n> export \
                 {P11_LIB_ENV}={P11_LIB_EXAMPLE}"
            ))),
        }
    }

    /// The crypto officer PIN, prompted for on the terminal when it was not given
    pub fn pin(&self) -> CliResult<Zeroizing<String>> {
        if let Some(pin) = &self.pin {
            debug!("Using the PIN from the command line or {P11_PIN_ENV}");
            return Ok(pin.clone());
        }
        Ok(Zeroizing::new(rpassword::prompt_password(PIN_PROMPT)?))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::ClientConf;
    use crate::error::CliError;

    #[test]
    fn missing_library_path_gives_the_export_hint() {
        let conf = ClientConf::new(None, None);
        match conf.library_path() {
            Err(CliError::Configuration(msg)) => {
                assert!(msg.contains("P11_LIB environment variable not set"));
                assert!(msg.contains("> export P11_LIB="));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let conf = ClientConf::new(Some(PathBuf::new()), None);
        assert!(conf.library_path().is_err());
    }

    #[test]
    fn given_pin_is_not_prompted_for() {
        let conf = ClientConf::new(Some(PathBuf::from("/tmp/libsofthsm2.so")), Some("1234".to_owned()));
        assert_eq!(conf.library_path().unwrap(), PathBuf::from("/tmp/libsofthsm2.so"));
        assert_eq!(conf.pin().unwrap().as_str(), "1234");
    }
}
