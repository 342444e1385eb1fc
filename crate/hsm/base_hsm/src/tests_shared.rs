//! Shared HSM test suite used by the vendor crates to avoid duplication.
//! Each vendor crate provides a small config and delegates to these helpers.
#![allow(clippy::panic_in_result_fn)]
#![allow(clippy::missing_panics_doc)]

use std::ptr;

use libloading::Library;
use p11_samples_logger::{debug, info, log_init};
use pkcs11_sys::{CK_C_INITIALIZE_ARGS, CK_OBJECT_HANDLE, CK_RV, CK_SLOT_ID, CK_VOID_PTR, CKF_OS_LOCKING_OK, CKR_OK};
use rand::{TryRngCore, rngs::OsRng};
use uuid::Uuid;

use crate::{
    AES_BLOCK_SIZE, AesKeySize, BaseHsm, DsaKeySize, EcCurve, HError, HResult, KeyClass, Mechanism,
    ObjectFilter, RsaKeySize, RsaOaepDigest, SecretKeyTemplate, Session, SlotManager,
    hsm_capabilities::HsmProvider,
};

/// Per-HSM configuration for shared tests
#[derive(Debug, Clone)]
pub struct HsmTestConfig {
    pub lib_path: String,
    pub slot_id: CK_SLOT_ID,
    pub token_label: Option<String>,
    pub user_password: String,
    /// whether `CKM_ECDSA_SHA256` is available, some libraries only offer raw `CKM_ECDSA`
    pub supports_ecdsa_sha256: bool,
    pub supports_des3_cmac: bool,
}

/// Resolve the library path from an environment variable, with a fallback
#[must_use]
pub fn lib_path(env_var: &str, default: &str) -> String {
    std::env::var(env_var).unwrap_or_else(|_| default.to_owned())
}

fn generate_random_data<const T: usize>() -> HResult<[u8; T]> {
    let mut bytes = [0_u8; T];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| HError::Default(format!("Error generating random data: {e}")))?;
    Ok(bytes)
}

fn random_label() -> String {
    Uuid::new_v4().to_string()
}

/// The token secret keys labelled `label`, from a token search
fn secret_keys_labelled(session: &Session, label: &str) -> HResult<Vec<CK_OBJECT_HANDLE>> {
    let mut labelled = Vec::new();
    for handle in session.find_objects(ObjectFilter::Class(KeyClass::Secret))? {
        if session.get_label(handle)? == label {
            labelled.push(handle);
        }
    }
    Ok(labelled)
}

#[allow(unsafe_code)]
pub fn low_level_init_test(cfg: &HsmTestConfig) -> HResult<()> {
    let library = unsafe { Library::new(&cfg.lib_path) }?;
    let init = unsafe {
        library.get::<unsafe extern "C" fn(p_init_args: CK_VOID_PTR) -> CK_RV>(b"C_Initialize")
    }?;

    let mut p_init_args = CK_C_INITIALIZE_ARGS {
        CreateMutex: None,
        DestroyMutex: None,
        LockMutex: None,
        UnlockMutex: None,
        flags: CKF_OS_LOCKING_OK,
        pReserved: ptr::null_mut(),
    };
    let rv = unsafe { init((&raw mut p_init_args).cast::<std::ffi::c_void>()) };
    assert_eq!(rv, CKR_OK);
    Ok(())
}

pub fn instantiate<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<BaseHsm<P>> {
    info!("instantiating hsm");
    BaseHsm::<P>::instantiate(&cfg.lib_path)
}

/// Instantiate the HSM and log into the configured slot
pub fn instantiate_and_open_slot<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<SlotManager> {
    let hsm: BaseHsm<P> = instantiate(cfg)?;
    hsm.open_slot(cfg.slot_id, Some(&cfg.user_password))
}

pub fn get_info<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    let hsm = instantiate::<P>(cfg)?;
    let info = hsm.get_info()?;
    info!("Connected to the HSM: {info}");
    assert_eq!(info.cryptokiVersion.0, 2);
    Ok(())
}

pub fn enumerate_slots<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    let hsm = instantiate::<P>(cfg)?;
    let slots = hsm.get_slot_list(true)?;
    info!("Slots with a token: {slots:?}");
    assert!(slots.contains(&cfg.slot_id), "slot {} not listed", cfg.slot_id);
    for slot_id in slots {
        let slot = hsm.get_slot_description(slot_id)?;
        assert!(slot.token_present);
        let token = hsm.get_token_description(slot_id)?;
        debug!("{slot}\n{token}");
    }
    Ok(())
}

pub fn find_slot_by_token_label<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    let hsm = instantiate::<P>(cfg)?;
    let label = match &cfg.token_label {
        Some(label) => label.clone(),
        None => hsm.get_token_description(cfg.slot_id)?.label,
    };
    assert_eq!(hsm.find_slot_by_token_label(&label)?, cfg.slot_id);
    let err = hsm.find_slot_by_token_label(&random_label()).unwrap_err();
    assert!(matches!(err, HError::NoSuchToken(_)));
    Ok(())
}

pub fn wrong_pin<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    let hsm = instantiate::<P>(cfg)?;
    let wrong = format!("{}-wrong", cfg.user_password);
    match hsm.open_slot(cfg.slot_id, Some(&wrong)) {
        Err(HError::PinIncorrect) => Ok(()),
        Err(e) => Err(e),
        Ok(_) => Err(HError::Default("login with a wrong PIN succeeded".to_owned())),
    }
}

pub fn login_logout<P: HsmProvider>(cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    let mut slot = instantiate_and_open_slot::<P>(cfg)?;
    assert!(slot.is_logged_in());
    slot.logout()?;
    assert!(!slot.is_logged_in());
    // a second logout has nothing to close
    slot.logout().unwrap_err();
    info!("Logged in and out of slot {}", slot.slot_id());
    Ok(())
}

pub fn generate_random(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(false)?;
    let random = session.generate_random(64)?;
    assert_eq!(random.len(), 64);
    assert_ne!(random, session.generate_random(64)?);
    assert!(session.generate_random(0)?.is_empty());
    Ok(())
}

pub fn destroy_all(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    for object in session.find_objects(ObjectFilter::All)? {
        session.destroy_object(object)?;
    }
    assert_eq!(session.count_objects(ObjectFilter::All)?, 0);
    info!("Destroyed all objects");
    Ok(())
}

pub fn generate_aes_key(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    for size in [AesKeySize::Aes128, AesKeySize::Aes192, AesKeySize::Aes256] {
        let label = random_label();
        let handle = session.generate_aes_key(size, &SecretKeyTemplate::new(&label))?;
        info!("Generated AES-{} key: {label}", size.bits());
        assert_eq!(handle, session.find_key(&label, KeyClass::Secret)?);
        assert_eq!(session.get_label(handle)?, label);
    }

    let label = random_label();
    let handle = session.generate_aes_key(AesKeySize::Aes256, &SecretKeyTemplate::full(&label))?;
    assert_eq!(handle, session.find_key(&label, KeyClass::Secret)?);

    // a second key with the same label makes the cached lookup ambiguous
    session.generate_aes_key(AesKeySize::Aes128, &SecretKeyTemplate::new(&label))?;
    let err = session.find_key(&label, KeyClass::Secret).unwrap_err();
    assert!(matches!(err, HError::MultipleObjectsReturned(_)));

    let err = session
        .find_key(&random_label(), KeyClass::Secret)
        .unwrap_err();
    assert!(matches!(err, HError::NoSuchKey(_)));
    Ok(())
}

pub fn generate_rsa_keypair(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let label = random_label();
    let (pk, sk) = session.generate_rsa_key_pair(RsaKeySize::try_from(2048)?, &label, true)?;
    info!("Generated RSA key pair: {label}");
    assert_eq!(pk, session.find_key(&label, KeyClass::Public)?);
    assert_eq!(sk, session.find_key(&label, KeyClass::Private)?);
    Ok(())
}

pub fn generate_ec_keypair(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    for curve in [EcCurve::Secp256r1, EcCurve::Secp384r1, EcCurve::Secp521r1] {
        let label = random_label();
        let (pk, sk) = session.generate_ec_key_pair(curve, &label, true)?;
        info!("Generated {curve} key pair: {label}");
        assert_eq!(pk, session.find_key(&label, KeyClass::Public)?);
        assert_eq!(sk, session.find_key(&label, KeyClass::Private)?);
    }
    Ok(())
}

pub fn generate_dsa_keypair(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let label = random_label();
    let (pk, sk) = session.generate_dsa_key_pair(DsaKeySize::Dsa2048, &label, true)?;
    info!("Generated DSA-2048 key pair: {label}");
    assert_eq!(pk, session.find_key(&label, KeyClass::Public)?);
    assert_eq!(sk, session.find_key(&label, KeyClass::Private)?);
    Ok(())
}

pub fn aes_ecb_encrypt(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let key = session.generate_aes_key(
        AesKeySize::Aes256,
        &SecretKeyTemplate::encryption_session_key("ecb"),
    )?;
    let data = generate_random_data::<64>()?;
    let ciphertext = session.encrypt(key, &Mechanism::AesEcb, &data)?;
    assert_eq!(ciphertext.len(), data.len());
    let plaintext = session.decrypt(key, &Mechanism::AesEcb, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), data);
    Ok(())
}

pub fn aes_cbc_pad_encrypt(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let key = session.generate_aes_key(
        AesKeySize::Aes256,
        &SecretKeyTemplate::encryption_session_key("cbc"),
    )?;
    let iv: [u8; AES_BLOCK_SIZE] = session
        .generate_random(AES_BLOCK_SIZE)?
        .try_into()
        .map_err(|_| HError::Default("invalid IV length".to_owned()))?;
    let mechanism = Mechanism::AesCbcPad { iv };
    let data = b"Hello, World!";
    let ciphertext = session.encrypt(key, &mechanism, data)?;
    assert_eq!(ciphertext.len(), AES_BLOCK_SIZE);
    let plaintext = session.decrypt(key, &mechanism, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), data);
    Ok(())
}

pub fn rsa_pkcs_encrypt(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let (pk, sk) = session.generate_rsa_key_pair(RsaKeySize::try_from(2048)?, "pkcs1", false)?;
    let data = [0x42_u8; 245];
    let ciphertext = session.encrypt(pk, &Mechanism::RsaPkcs, &data)?;
    assert_eq!(ciphertext.len(), 2048 / 8);
    let plaintext = session.decrypt(sk, &Mechanism::RsaPkcs, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), data);
    Ok(())
}

pub fn rsa_oaep_encrypt(slot: &SlotManager, digest: RsaOaepDigest) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let (pk, sk) = session.generate_rsa_key_pair(RsaKeySize::try_from(2048)?, "oaep", false)?;
    let mechanism = Mechanism::RsaPkcsOaep(digest);
    let data = generate_random_data::<128>()?;
    let ciphertext = session.encrypt(pk, &mechanism, &data)?;
    assert_eq!(ciphertext.len(), 2048 / 8);
    let plaintext = session.decrypt(sk, &mechanism, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), data);
    Ok(())
}

fn sign_and_verify(
    session: &Session,
    sk: CK_OBJECT_HANDLE,
    pk: CK_OBJECT_HANDLE,
    mechanism: &Mechanism,
) -> HResult<()> {
    let data = b"Earth is the third planet of our Solar System.";
    let signature = session.sign(sk, mechanism, data)?;
    info!("{mechanism}: {} bytes signature", signature.len());
    assert!(session.verify(pk, mechanism, data, &signature)?);
    assert!(!session.verify(pk, mechanism, b"tampered", &signature)?);
    Ok(())
}

pub fn rsa_sign(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let (pk, sk) = session.generate_rsa_key_pair(RsaKeySize::try_from(2048)?, "sign", false)?;
    sign_and_verify(&session, sk, pk, &Mechanism::Sha256RsaPkcs)?;
    sign_and_verify(&session, sk, pk, &Mechanism::Sha256RsaPkcsPss)
}

pub fn ecdsa_sign(slot: &SlotManager, cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    if !cfg.supports_ecdsa_sha256 {
        info!("CKM_ECDSA_SHA256 not supported, skipping");
        return Ok(());
    }
    let session = slot.open_session(true)?;
    let (pk, sk) = session.generate_ec_key_pair(EcCurve::Secp384r1, "ecdsa", false)?;
    sign_and_verify(&session, sk, pk, &Mechanism::EcdsaSha256)
}

pub fn hmac_sha1(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let key =
        session.generate_generic_secret_key(256, &SecretKeyTemplate::mac_session_key("hmac"))?;
    let data = b"Hello World, I've been waiting for the chance to see your face.";
    let mac = session.sign(key, &Mechanism::Sha1Hmac, data)?;
    assert_eq!(mac.len(), 20);
    assert!(session.verify(key, &Mechanism::Sha1Hmac, data, &mac)?);
    Ok(())
}

pub fn cmac_des3(slot: &SlotManager, cfg: &HsmTestConfig) -> HResult<()> {
    log_init(None);
    if !cfg.supports_des3_cmac {
        info!("CKM_DES3_CMAC not supported, skipping");
        return Ok(());
    }
    let session = slot.open_session(true)?;
    let key = session.generate_des3_key(&SecretKeyTemplate::mac_session_key("cmac"))?;
    let data = b"Hello World, I've been waiting for the chance to see your face.";
    let mac = session.sign(key, &Mechanism::Des3Cmac, data)?;
    assert_eq!(mac.len(), 8);
    assert!(session.verify(key, &Mechanism::Des3Cmac, data, &mac)?);
    Ok(())
}

pub fn aes_key_wrap(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let wrapping_label = random_label();
    let wrapping_key =
        session.generate_aes_key(AesKeySize::Aes256, &SecretKeyTemplate::new(&wrapping_label))?;
    let key =
        session.generate_aes_key(AesKeySize::Aes128, &SecretKeyTemplate::new(&random_label()))?;
    let wrapped = session.wrap_key_with_aes_key_wrap(wrapping_key, key)?;
    assert_eq!(wrapped.len(), 24);

    let unwrapped_label = random_label();
    let unwrapped =
        session.unwrap_aes_key_with_aes_key_wrap(wrapping_key, &wrapped, &unwrapped_label)?;
    assert_eq!(secret_keys_labelled(&session, &unwrapped_label)?, vec![unwrapped]);

    // the unwrapped key decrypts what the original key encrypts
    let data = generate_random_data::<32>()?;
    let ciphertext = session.encrypt(key, &Mechanism::AesEcb, &data)?;
    let plaintext = session.decrypt(unwrapped, &Mechanism::AesEcb, &ciphertext)?;
    assert_eq!(plaintext.as_slice(), data);

    let err = session
        .unwrap_aes_key_with_aes_key_wrap(wrapping_key, &wrapped[..20], "too-short")
        .unwrap_err();
    assert!(matches!(err, HError::InvalidInput(_)));
    Ok(())
}

pub fn rsa_oaep_key_wrap(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let rsa_label = random_label();
    session.generate_rsa_key_pair(RsaKeySize::try_from(2048)?, &rsa_label, true)?;
    let aes_label = random_label();
    let key = session.generate_aes_key(AesKeySize::Aes256, &SecretKeyTemplate::new(&aes_label))?;

    let pk = session.find_key(&rsa_label, KeyClass::Public)?;
    let wrapped = session.wrap_key_with_rsa_oaep(pk, key, RsaOaepDigest::SHA256)?;
    assert_eq!(wrapped.len(), 2048 / 8);

    let sk = session.find_key(&rsa_label, KeyClass::Private)?;
    let unwrapped_label = random_label();
    let unwrapped = session.unwrap_aes_key_with_rsa_oaep(
        sk,
        &wrapped,
        &unwrapped_label,
        RsaOaepDigest::SHA256,
    )?;
    info!("Unwrapped symmetric key with handle: {unwrapped}");
    assert_eq!(secret_keys_labelled(&session, &unwrapped_label)?, vec![unwrapped]);
    Ok(())
}

pub fn list_objects(slot: &SlotManager) -> HResult<()> {
    log_init(None);
    let session = slot.open_session(true)?;
    let before = session.count_objects(ObjectFilter::Class(KeyClass::Secret))?;
    let label = random_label();
    session.generate_aes_key(AesKeySize::Aes128, &SecretKeyTemplate::new(&label))?;
    let secrets = session.find_objects(ObjectFilter::Class(KeyClass::Secret))?;
    assert_eq!(secrets.len(), before + 1);
    let labels = secrets
        .iter()
        .map(|h| session.get_label(*h))
        .collect::<HResult<Vec<_>>>()?;
    assert!(labels.contains(&label));

    for filter in [
        ObjectFilter::All,
        ObjectFilter::RsaPrivateKeys,
        ObjectFilter::EcPublicKeys,
        ObjectFilter::LockedSecretKeys,
    ] {
        info!("{filter}: {}", session.count_objects(filter)?);
    }
    assert!(session.count_objects(ObjectFilter::All)? >= secrets.len());
    Ok(())
}
