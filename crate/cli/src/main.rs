use std::process;

use p11_samples_cli::p11_samples_main;

fn main() {
    if let Some(err) = p11_samples_main().err() {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}
