use std::path::PathBuf;

use clap::{Parser, Subcommand};
use p11_samples_logger::{info, log_init};

use crate::{
    actions::{
        aes::AesCommands, dsa::DsaCommands, ec::EcCommands, mac::MacCommands,
        objects::ObjectsCommands, rng::RngAction, rsa::RsaCommands, slots::SlotsCommands,
    },
    config::{ClientConf, P11_LIB_ENV, P11_PIN_ENV},
    error::result::CliResult,
};

#[derive(Parser, Debug)]
#[command(name = "p11-samples", author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the PKCS#11 library
    ///
    /// e.g. `/usr/safenet/lunaclient/lib/libCryptoki2_64.so`
    #[arg(long = "lib", env = P11_LIB_ENV, global = true)]
    pub lib_path: Option<PathBuf>,

    /// The crypto officer PIN. Prompted for when absent.
    #[arg(long, env = P11_PIN_ENV, hide_env_values = true, global = true)]
    pub pin: Option<String>,

    #[command(subcommand)]
    pub command: CliCommands,
}

#[derive(Subcommand, Debug)]
pub enum CliCommands {
    /// Enumerate slots, show the library information, log in and out
    #[command(subcommand)]
    Slots(SlotsCommands),
    /// List and search token objects
    #[command(subcommand)]
    Objects(ObjectsCommands),
    /// Generate random data
    Rng(RngAction),
    /// AES key generation, encryption and key wrapping
    #[command(subcommand)]
    Aes(AesCommands),
    /// RSA key generation, encryption, signature and key wrapping
    #[command(subcommand)]
    Rsa(RsaCommands),
    /// DSA key generation
    #[command(subcommand)]
    Dsa(DsaCommands),
    /// EC key generation and ECDSA signature
    #[command(subcommand)]
    Ec(EcCommands),
    /// HMAC and CMAC computation
    #[command(subcommand)]
    Mac(MacCommands),
}

impl CliCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::Slots(commands) => commands.process(conf),
            Self::Objects(commands) => commands.process(conf),
            Self::Rng(action) => action.process(conf),
            Self::Aes(commands) => commands.process(conf),
            Self::Rsa(commands) => commands.process(conf),
            Self::Dsa(commands) => commands.process(conf),
            Self::Ec(commands) => commands.process(conf),
            Self::Mac(commands) => commands.process(conf),
        }
    }
}

/// Main function of the `p11-samples` CLI.
///
/// Logging goes to stderr and defaults to `warn`, so that the demonstration
/// output on stdout stays readable.
///
/// # Errors
///
/// This function will return an error if:
/// - The command-line arguments cannot be parsed.
/// - The library path is not set.
/// - The subcommand fails.
pub fn p11_samples_main() -> CliResult<()> {
    log_init(None);
    let cli = Cli::parse();
    info!("Starting the PKCS#11 samples CLI");

    let conf = ClientConf::new(cli.lib_path, cli.pin);
    cli.command.process(&conf)
}
