pub mod disassemble;
pub mod inspect;
pub mod run;

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use tracing::debug;
use vm::ProgramImage;

/// Reads and validates a `.trnb` image.
pub fn load_program(path: &str) -> Result<ProgramImage> {
    let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
    let image = vm::load_image(&mut BufReader::new(file))
        .with_context(|| format!("failed to load {path}"))?;
    debug!(
        path,
        functions = image.functions.len(),
        code_len = image.code.len(),
        "image loaded"
    );
    Ok(image)
}
