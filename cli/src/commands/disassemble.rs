use anyhow::Result;
use vm::disasm;

use super::load_program;

pub fn disassemble_file(path: &str) -> Result<()> {
    let image = load_program(path)?;
    print!("{}", listing(path, &image));
    Ok(())
}

/// Function table followed by the instruction listing.
pub fn listing(path: &str, image: &vm::ProgramImage) -> String {
    let mut out = format!("== Disassembly of {} ==\n", path);
    for line in disasm::function_table(image) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&disasm::render(image));
    out
}
