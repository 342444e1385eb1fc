use clap::{Parser, Subcommand, ValueEnum};
use p11_samples_hsm::{KeyClass, ObjectFilter};
use strum::Display;

use crate::{
    actions::{console, shared::LoggedInToken},
    config::ClientConf,
    error::result::CliResult,
};

/// Search the objects stored on a token
#[derive(Subcommand, Debug)]
pub enum ObjectsCommands {
    List(ListObjectsAction),
    Find(FindObjectsAction),
}

impl ObjectsCommands {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        match self {
            Self::List(action) => action.process(conf),
            Self::Find(action) => action.process(conf),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ObjectType {
    #[strum(to_string = "Secret Keys")]
    Secret,
    #[strum(to_string = "Private Keys")]
    Private,
    #[strum(to_string = "Public Keys")]
    Public,
    #[strum(to_string = "Certificates")]
    Cert,
    #[strum(to_string = "All objects")]
    All,
}

impl From<ObjectType> for ObjectFilter {
    fn from(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Secret => Self::Class(KeyClass::Secret),
            ObjectType::Private => Self::Class(KeyClass::Private),
            ObjectType::Public => Self::Class(KeyClass::Public),
            ObjectType::Cert => Self::Class(KeyClass::Certificate),
            ObjectType::All => Self::All,
        }
    }
}

/// List the labels of the token objects of a type.
#[derive(Parser, Debug)]
pub struct ListObjectsAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,

    /// The type of the objects to list
    #[clap(long = "type", short = 't', value_enum, default_value_t = ObjectType::All)]
    pub object_type: ObjectType,
}

impl ListObjectsAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;
        println!("{}:", self.object_type);
        for handle in session.find_objects(self.object_type.into())? {
            println!("  - {}", session.get_label(handle)?);
        }
        println!();
        Ok(())
    }
}

/// Count token objects with four searches: every object, the RSA private keys,
/// the EC public keys and the secret keys that can neither be extracted nor modified.
#[derive(Parser, Debug)]
pub struct FindObjectsAction {
    /// The label of the token
    #[clap(required = true)]
    pub slot_label: String,
}

impl FindObjectsAction {
    pub fn process(&self, conf: &ClientConf) -> CliResult<()> {
        let token = LoggedInToken::connect(conf, &self.slot_label)?;
        let session = token.session()?;
        let mut stdout = console::Stdout::new("Token objects searched.");
        for filter in [
            ObjectFilter::All,
            ObjectFilter::RsaPrivateKeys,
            ObjectFilter::EcPublicKeys,
            ObjectFilter::LockedSecretKeys,
        ] {
            stdout.add_field(
                &capitalize(&filter.to_string()),
                session.count_objects(filter)?.to_string(),
            );
        }
        stdout.write()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use p11_samples_hsm::{KeyClass, ObjectFilter};

    use super::{ObjectType, capitalize};

    #[test]
    fn object_types() {
        assert_eq!(
            ObjectFilter::from(ObjectType::Cert),
            ObjectFilter::Class(KeyClass::Certificate)
        );
        assert_eq!(ObjectFilter::from(ObjectType::All), ObjectFilter::All);
        assert_eq!(ObjectType::Secret.to_string(), "Secret Keys");
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("token objects"), "Token objects");
        assert_eq!(capitalize("RSA private keys"), "RSA private keys");
        assert_eq!(capitalize(""), "");
    }
}
