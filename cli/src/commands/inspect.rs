use anyhow::Result;
use vm::{disasm, ProgramImage};

use super::load_program;

pub fn inspect_file(path: &str) -> Result<()> {
    let image = load_program(path)?;
    print!("{}", summary(&image));
    Ok(())
}

pub fn summary(image: &ProgramImage) -> String {
    let entry = image
        .entry()
        .map_or("<missing>", |f| f.name.as_str());
    let mut out = format!(
        "entry: #{} {}\nfunctions: {}\ncode: {} bytes\n",
        image.entry_function,
        entry,
        image.functions.len(),
        image.code.len()
    );
    for line in disasm::function_table(image) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}
