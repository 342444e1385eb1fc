pub mod actions;
pub mod commands;
pub mod config;
pub mod error;

pub use commands::p11_samples_main;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic_in_result_fn, clippy::panic)]
mod tests;
