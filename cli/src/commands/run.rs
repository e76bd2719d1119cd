use anyhow::{Context, Result};
use memory::StackEntry;
use tracing::debug;
use vm::VM;

use super::load_program;
use crate::config;

/// `tarn run` options after clap parsing.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub args: Vec<String>,
    pub config: Option<String>,
    pub max_call_depth: Option<usize>,
    pub max_steps: Option<u64>,
}

/// `42` is an Int, `42b` a Byte.
pub fn parse_arg(text: &str) -> Result<StackEntry> {
    if let Some(digits) = text.strip_suffix('b') {
        let byte = digits
            .parse::<u8>()
            .with_context(|| format!("invalid byte argument '{text}'"))?;
        return Ok(StackEntry::Byte(byte));
    }
    let int = text
        .parse::<i32>()
        .with_context(|| format!("invalid int argument '{text}'"))?;
    Ok(StackEntry::Int(int))
}

/// Loads and runs the image at `path`.
///
/// A fault comes back as an error whose source is the [`vm::Fault`].
pub fn execute(path: &str, options: &RunOptions) -> Result<Option<StackEntry>> {
    let mut vm_config = config::load(options.config.as_deref())?;
    if let Some(depth) = options.max_call_depth {
        vm_config.max_call_depth = depth;
    }
    if options.max_steps.is_some() {
        vm_config.max_steps = options.max_steps;
    }

    let args = options
        .args
        .iter()
        .map(|a| parse_arg(a))
        .collect::<Result<Vec<_>>>()?;
    let image = load_program(path)?;

    let mut machine = VM::new(vm_config);
    let result = machine.run(image, &args);
    debug!(steps = machine.steps_executed(), "run complete");
    result.map_err(|fault| anyhow::Error::new(fault).context("fault"))
}

pub fn run_file(path: &str, options: &RunOptions) -> Result<()> {
    if let Some(value) = execute(path, options)? {
        println!("{value}");
    }
    Ok(())
}
