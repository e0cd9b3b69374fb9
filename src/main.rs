//! Binary entry point for `batchmv`.

use batchmv::BatchError;
use std::process;

fn main() {
    if let Err(e) = batchmv::run() {
        eprintln!("Error: {}", e);
        let code = match e {
            BatchError::Aborted { .. } => 2,
            _ => 1,
        };
        process::exit(code);
    }
}
