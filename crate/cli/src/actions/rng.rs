use clap::Parser;

use crate::{
    actions::{console, shared::LoggedInToken},
    config::ClientConf,
    error::result::CliResult,
};

/// Generate random data with the token's random number generator.
#[derive(Parser, Debug)]
pub struct RngAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The number of random bytes
    #[clap(required = true)]
    pub data_size: usize,
}

impl RngAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let random_data = token.session()?.generate_random(self.data_size)?;
        let mut stdout = console::Stdout::new(&format!(
            "{} bytes of random data generated.",
            random_data.len()
        ));
        stdout.add_hex("Random Data (hex)", &random_data);
        stdout.write()
    }
}
