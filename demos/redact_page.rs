//! Redact a logo from a single page image.
//!
//! Usage:
//! ```sh
//! cargo run --example redact_page -- logo.png page.png page_redacted.png
//! ```

use std::env;
use std::process;

use logo_redaction::{RedactOptions, RedactionEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <template> <input> <output>", args[0]);
        process::exit(1);
    }

    let engine = RedactionEngine::from_path(&args[1], RedactOptions::default())
        .expect("failed to load template");
    let result = engine.process_file(args[2].as_ref(), args[3].as_ref());

    if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
