use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::{
    actions::{
        aes::AesCommands,
        dsa::DsaCommands,
        objects::{ObjectType, ObjectsCommands},
        rsa::RsaCommands,
    },
    commands::{Cli, CliCommands},
};

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn global_options_come_before_or_after_the_subcommand() {
    let cli = Cli::try_parse_from([
        "p11-samples",
        "--lib",
        "/usr/lib/softhsm/libsofthsm2.so",
        "rng",
        "SEHSM2",
        "32",
        "--pin",
        "1234",
    ])
    .unwrap();
    assert_eq!(
        cli.lib_path,
        Some(PathBuf::from("/usr/lib/softhsm/libsofthsm2.so"))
    );
    assert_eq!(cli.pin.as_deref(), Some("1234"));
    match cli.command {
        CliCommands::Rng(action) => {
            assert_eq!(action.slot_label, "SEHSM2");
            assert_eq!(action.data_size, 32);
        }
        _ => panic!("expected the rng subcommand"),
    }
}

#[test]
fn aes_keygen_arguments() {
    let cli = Cli::try_parse_from([
        "p11-samples",
        "aes",
        "keygen",
        "SP_SKS_SEHSM3",
        "myAesKey",
        "128",
        "--full-template",
    ])
    .unwrap();
    match cli.command {
        CliCommands::Aes(AesCommands::Keygen(action)) => {
            assert_eq!(action.slot_label, "SP_SKS_SEHSM3");
            assert_eq!(action.key_label, "myAesKey");
            assert_eq!(action.key_size, 128);
            assert!(action.full_template);
        }
        _ => panic!("expected aes keygen"),
    }

    // the key size is a number
    Cli::try_parse_from(["p11-samples", "aes", "keygen", "SEHSM3", "k", "big"]).unwrap_err();
    // every positional argument is required
    Cli::try_parse_from(["p11-samples", "aes", "keygen", "SEHSM3", "k"]).unwrap_err();
}

#[test]
fn wrap_arguments() {
    let cli = Cli::try_parse_from([
        "p11-samples",
        "rsa",
        "wrap",
        "SP_SKS_SEHSM3",
        "aws-public-key",
        "BYOK-AWS-AES",
        "BYOK.dat",
    ])
    .unwrap();
    match cli.command {
        CliCommands::Rsa(RsaCommands::Wrap(action)) => {
            assert_eq!(action.public_key_label, "aws-public-key");
            assert_eq!(action.aes_key_label, "BYOK-AWS-AES");
            assert_eq!(action.output_file, PathBuf::from("BYOK.dat"));
        }
        _ => panic!("expected rsa wrap"),
    }
}

#[test]
fn object_types() {
    let cli =
        Cli::try_parse_from(["p11-samples", "objects", "list", "SEHSM3", "--type", "cert"]).unwrap();
    match cli.command {
        CliCommands::Objects(ObjectsCommands::List(action)) => {
            assert_eq!(action.object_type, ObjectType::Cert);
        }
        _ => panic!("expected objects list"),
    }

    let cli = Cli::try_parse_from(["p11-samples", "objects", "list", "SEHSM3"]).unwrap();
    match cli.command {
        CliCommands::Objects(ObjectsCommands::List(action)) => {
            assert_eq!(action.object_type, ObjectType::All);
        }
        _ => panic!("expected objects list"),
    }

    Cli::try_parse_from(["p11-samples", "objects", "list", "SEHSM3", "-t", "keys"]).unwrap_err();
}

#[test]
fn plaintext_is_optional() {
    let cli = Cli::try_parse_from(["p11-samples", "rsa", "sign-pss", "SEHSM3"]).unwrap();
    match cli.command {
        CliCommands::Rsa(RsaCommands::SignPss(action)) => {
            assert!(action.plaintext.plaintext.is_none());
        }
        _ => panic!("expected rsa sign-pss"),
    }
}

#[test]
fn dsa_key_size_defaults_to_2048() {
    let cli =
        Cli::try_parse_from(["p11-samples", "dsa", "keygen", "SEHSM3", "myDsaKey"]).unwrap();
    match cli.command {
        CliCommands::Dsa(DsaCommands::Keygen(action)) => {
            assert_eq!(action.keypair_label, "myDsaKey");
            assert_eq!(action.key_size, 2048);
        }
        _ => panic!("expected dsa keygen"),
    }

    let cli = Cli::try_parse_from([
        "p11-samples",
        "dsa",
        "keygen",
        "SEHSM3",
        "myDsaKey",
        "-s",
        "3072",
    ])
    .unwrap();
    match cli.command {
        CliCommands::Dsa(DsaCommands::Keygen(action)) => assert_eq!(action.key_size, 3072),
        _ => panic!("expected dsa keygen"),
    }
}

#[test]
fn parsed_commands_are_printable() {
    let cli = Cli::try_parse_from(["p11-samples", "aes", "keygen", "SEHSM3", "myAesKey", "256"])
        .unwrap();
    let printed = format!("{cli:?}");
    assert!(printed.contains("Aes(Keygen("), "{printed}");
    assert!(printed.contains("myAesKey"), "{printed}");
}
