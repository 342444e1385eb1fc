//! These tests require a SoftHSM2 token and are gated behind the `softhsm2` feature.
//! To run a test, cd into the crate directory and run (replace the PIN with the actual one):
//! ```
//! HSM_USER_PASSWORD=12345678 cargo test --features softhsm2 -- --ignored tests::test_hsm_softhsm2_all
//! ```
use p11_samples_hsm::{
    CK_SLOT_ID, HResult, RsaOaepDigest,
    test_helpers::{get_hsm_password, get_hsm_slot_id, get_hsm_token_label},
    tests_shared as shared,
};

use crate::{SOFTHSM2_PKCS11_LIB, SofthsmCapabilityProvider};

const SLOT_ID: CK_SLOT_ID = 0x00; // SoftHSM2 first slot if HSM_SLOT_ID is not set

fn cfg() -> HResult<shared::HsmTestConfig> {
    Ok(shared::HsmTestConfig {
        lib_path: shared::lib_path("SOFTHSM2_PKCS11_LIB", SOFTHSM2_PKCS11_LIB),
        slot_id: get_hsm_slot_id().unwrap_or(SLOT_ID),
        token_label: get_hsm_token_label(),
        user_password: get_hsm_password()?,
        supports_ecdsa_sha256: true,
        // SoftHSM2 does not implement CKM_DES3_CMAC
        supports_des3_cmac: false,
    })
}

fn slot() -> HResult<p11_samples_hsm::SlotManager> {
    shared::instantiate_and_open_slot::<SofthsmCapabilityProvider>(&cfg()?)
}

/// To run all the tests, try something like
/// ```sh
///  RUST_LOG=info \
///  HSM_USER_PASSWORD="12345678" \
///  HSM_SLOT_ID=1842164345 \
///  cargo test test_hsm_softhsm2_all --features softhsm2 -- --ignored
/// ```
/// WARNING: SoftHSM2 reassigns initialized tokens to another slot (based on the token serial
/// number), so list the slots first to find the slot ID to use
#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_all() -> HResult<()> {
    test_hsm_softhsm2_get_info()?;
    test_hsm_softhsm2_enumerate_slots()?;
    test_hsm_softhsm2_find_slot_by_token_label()?;
    test_hsm_softhsm2_wrong_pin()?;
    test_hsm_softhsm2_login_logout()?;
    test_hsm_softhsm2_destroy_all()?;
    test_hsm_softhsm2_generate_random()?;
    test_hsm_softhsm2_generate_aes_key()?;
    test_hsm_softhsm2_generate_rsa_keypair()?;
    test_hsm_softhsm2_generate_ec_keypair()?;
    test_hsm_softhsm2_generate_dsa_keypair()?;
    test_hsm_softhsm2_aes_ecb_encrypt()?;
    test_hsm_softhsm2_aes_cbc_pad_encrypt()?;
    test_hsm_softhsm2_rsa_pkcs_encrypt()?;
    test_hsm_softhsm2_rsa_oaep_encrypt()?;
    test_hsm_softhsm2_rsa_sign()?;
    test_hsm_softhsm2_ecdsa_sign()?;
    test_hsm_softhsm2_hmac_sha1()?;
    test_hsm_softhsm2_cmac_des3()?;
    test_hsm_softhsm2_aes_key_wrap()?;
    test_hsm_softhsm2_rsa_oaep_key_wrap()?;
    test_hsm_softhsm2_list_objects()?;
    test_hsm_softhsm2_destroy_all()?;
    Ok(())
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_low_level_test() -> HResult<()> {
    shared::low_level_init_test(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_get_info() -> HResult<()> {
    shared::get_info::<SofthsmCapabilityProvider>(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_enumerate_slots() -> HResult<()> {
    shared::enumerate_slots::<SofthsmCapabilityProvider>(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_find_slot_by_token_label() -> HResult<()> {
    shared::find_slot_by_token_label::<SofthsmCapabilityProvider>(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_wrong_pin() -> HResult<()> {
    shared::wrong_pin::<SofthsmCapabilityProvider>(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_login_logout() -> HResult<()> {
    shared::login_logout::<SofthsmCapabilityProvider>(&cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_generate_random() -> HResult<()> {
    shared::generate_random(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_generate_aes_key() -> HResult<()> {
    shared::generate_aes_key(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_generate_rsa_keypair() -> HResult<()> {
    shared::generate_rsa_keypair(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_generate_ec_keypair() -> HResult<()> {
    shared::generate_ec_keypair(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_generate_dsa_keypair() -> HResult<()> {
    shared::generate_dsa_keypair(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_aes_ecb_encrypt() -> HResult<()> {
    shared::aes_ecb_encrypt(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_aes_cbc_pad_encrypt() -> HResult<()> {
    shared::aes_cbc_pad_encrypt(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_rsa_pkcs_encrypt() -> HResult<()> {
    shared::rsa_pkcs_encrypt(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_rsa_oaep_encrypt() -> HResult<()> {
    let slot = slot()?;
    shared::rsa_oaep_encrypt(&slot, RsaOaepDigest::SHA1)?;
    shared::rsa_oaep_encrypt(&slot, RsaOaepDigest::SHA256)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_rsa_sign() -> HResult<()> {
    shared::rsa_sign(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_ecdsa_sign() -> HResult<()> {
    shared::ecdsa_sign(&slot()?, &cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_hmac_sha1() -> HResult<()> {
    shared::hmac_sha1(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_cmac_des3() -> HResult<()> {
    shared::cmac_des3(&slot()?, &cfg()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_aes_key_wrap() -> HResult<()> {
    shared::aes_key_wrap(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_rsa_oaep_key_wrap() -> HResult<()> {
    shared::rsa_oaep_key_wrap(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_list_objects() -> HResult<()> {
    shared::list_objects(&slot()?)
}

#[test]
#[ignore = "Requires Linux, SoftHSM2 library, and an initialized token"]
fn test_hsm_softhsm2_destroy_all() -> HResult<()> {
    shared::destroy_all(&slot()?)
}
