mod cli_parsing;
mod input_checks;

const PROG_NAME: &str = "p11-samples";

/// A path that cannot hold a PKCS#11 library
const MISSING_LIB: &str = "/nonexistent/libcryptoki.so";
