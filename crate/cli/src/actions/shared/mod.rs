mod plaintext;
mod token;
pub mod utils;

pub use plaintext::{
    AES_ECB_PLAINTEXT_ERROR, PlaintextArgs, RSA_OAEP_SHA256_MAX_PLAINTEXT_LEN,
    RSA_PKCS1_MAX_PLAINTEXT_LEN, ensure_aes_ecb_plaintext, ensure_max_plaintext_len,
};
pub use token::LoggedInToken;
