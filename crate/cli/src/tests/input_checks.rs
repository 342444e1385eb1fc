//! Inputs are checked before the PKCS#11 library is loaded: these runs fail
//! with the check message even though no library is available.
use std::process::Command;

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::{PredicateBooleanExt, predicate};
use tempfile::TempDir;

use super::{MISSING_LIB, PROG_NAME};
use crate::{actions::shared::utils::write_bytes_to_file, error::result::CliResult};

fn cmd() -> CliResult<Command> {
    let mut cmd = Command::cargo_bin(PROG_NAME)?;
    cmd.env_remove("P11_LIB").env_remove("P11_PIN");
    Ok(cmd)
}

#[test]
fn missing_library_prints_the_export_hint() -> CliResult<()> {
    cmd()?
        .args(["slots", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "*** P11_LIB environment variable not set. ***",
        ))
        .stderr(predicate::str::contains(
            "> export P11_LIB=/usr/safenet/lunaclient/lib/libCryptoki2_64.so",
        ));
    Ok(())
}

#[test]
fn library_path_is_read_from_the_environment() -> CliResult<()> {
    cmd()?
        .env("P11_LIB", MISSING_LIB)
        .args(["slots", "info"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("ERROR:"))
        .stderr(predicate::str::contains("P11_LIB environment variable not set").not());
    Ok(())
}

#[test]
fn invalid_aes_key_size() -> CliResult<()> {
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["aes", "keygen", "SEHSM3", "myAesKey", "512"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AES key size invalid."));
    Ok(())
}

#[test]
fn invalid_rsa_key_size() -> CliResult<()> {
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["rsa", "keygen", "SEHSM3", "testRSA", "16384"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RSA keypair size invalid."));
    Ok(())
}

#[test]
fn invalid_dsa_key_size() -> CliResult<()> {
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["dsa", "keygen", "SEHSM3", "myDsaKey", "--size", "512"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DSA keypair size invalid."));
    Ok(())
}

#[test]
fn unknown_curve() -> CliResult<()> {
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["ec", "keygen", "SEHSM3", "testECDSA", "curve25519"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown curve: curve25519"));
    Ok(())
}

#[test]
fn aes_ecb_plaintext_must_be_whole_blocks() -> CliResult<()> {
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["aes", "encrypt-ecb", "SEHSM3", "--plaintext", "Hello World"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Text too small/big for AES-ECB"));
    Ok(())
}

#[test]
fn rsa_oaep_plaintext_too_long() -> CliResult<()> {
    let plaintext = "a".repeat(191);
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["rsa", "encrypt-oaep", "SEHSM3", "--plaintext", &plaintext])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plaintext too long"));
    Ok(())
}

#[test]
fn truncated_aes_wrapped_key_is_rejected() -> CliResult<()> {
    let tmp_dir = TempDir::new()?;
    let wrapped_key_file = tmp_dir.path().join("DataKey.dat");
    write_bytes_to_file(&[0_u8; 20], &wrapped_key_file)?;
    cmd()?
        .args(["--lib", MISSING_LIB, "--pin", "1234"])
        .args(["aes", "unwrap", "SEHSM3", "KEK", "myEncryptionKey2"])
        .arg(&wrapped_key_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid wrapped key length: 20 bytes"));
    Ok(())
}
