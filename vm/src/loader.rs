use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memory::SlotKind;
use thiserror::Error;

use crate::program::{FunctionInfo, ImageError, ProgramImage};
use crate::specs::{IMAGE_MAGIC, MAX_CODE_LEN, MAX_FUNCTIONS, MAX_NAME_LEN, SER_VOID};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("security limit: {0}")]
    Security(String),
}

impl From<ImageError> for LoaderError {
    fn from(e: ImageError) -> Self {
        LoaderError::Format(e.to_string())
    }
}

fn read_kind<R: Read>(reader: &mut R) -> Result<SlotKind, LoaderError> {
    let byte = reader.read_u8()?;
    SlotKind::from_u8(byte).ok_or_else(|| LoaderError::Format(format!("Unknown slot kind: {}", byte)))
}

/// Load a binary image (.trnb).
///
/// # Security
/// Counts and lengths are checked against fixed limits before anything is
/// allocated, so a malformed header cannot trigger a huge pre-allocation.
pub fn load_image<R: Read>(reader: &mut R) -> Result<ProgramImage, LoaderError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != IMAGE_MAGIC {
        return Err(LoaderError::Format("Invalid binary magic or version".to_string()));
    }

    let entry_function = reader.read_u16::<LittleEndian>()?;

    // --- Function Table ---
    let fn_count = reader.read_u32::<LittleEndian>()?;
    if fn_count > MAX_FUNCTIONS {
        return Err(LoaderError::Security(format!("Function count too large: {}", fn_count)));
    }

    let mut functions = Vec::with_capacity(fn_count as usize);
    for _ in 0..fn_count {
        let name_len = reader.read_u32::<LittleEndian>()?;
        if name_len > MAX_NAME_LEN {
            return Err(LoaderError::Security(format!(
                "Function name length exceeds limit of {}: {}",
                MAX_NAME_LEN, name_len
            )));
        }
        let mut name_bytes = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|_| LoaderError::Format("Invalid UTF-8 in function name".to_string()))?;

        let entry = reader.read_u32::<LittleEndian>()?;

        let param_count = reader.read_u8()?;
        let mut params = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            params.push(read_kind(reader)?);
        }

        let returns = match reader.read_u8()? {
            SER_VOID => None,
            byte => Some(SlotKind::from_u8(byte).ok_or_else(|| {
                LoaderError::Format(format!("Unknown return kind: {}", byte))
            })?),
        };

        functions.push(FunctionInfo {
            name,
            entry,
            params,
            returns,
        });
    }

    // --- Code Section ---
    let code_len = reader.read_u32::<LittleEndian>()?;
    if code_len > MAX_CODE_LEN {
        return Err(LoaderError::Security(format!("Code length too large: {}", code_len)));
    }
    let mut code = vec![0u8; code_len as usize];
    reader.read_exact(&mut code)?;

    let image = ProgramImage {
        functions,
        code,
        entry_function,
    };
    image.validate()?;
    Ok(image)
}

/// Convenience wrapper over [`load_image`] for in-memory buffers.
pub fn load_bytes(mut bytes: &[u8]) -> Result<ProgramImage, LoaderError> {
    load_image(&mut bytes)
}

/// Serialize an image in the format [`load_image`] reads.
pub fn write_image<W: Write>(writer: &mut W, image: &ProgramImage) -> Result<(), LoaderError> {
    if image.functions.len() > MAX_FUNCTIONS as usize {
        return Err(LoaderError::Security(format!(
            "Function count too large: {}",
            image.functions.len()
        )));
    }
    if image.code.len() > MAX_CODE_LEN as usize {
        return Err(LoaderError::Security(format!("Code length too large: {}", image.code.len())));
    }
    for f in &image.functions {
        if f.name.len() > MAX_NAME_LEN as usize {
            return Err(LoaderError::Security(format!("Function name too long: {}", f.name)));
        }
        if f.params.len() > u8::MAX as usize {
            return Err(LoaderError::Format(format!("Too many parameters in '{}'", f.name)));
        }
    }

    // Nothing is written unless the whole image fits the format.
    writer.write_all(IMAGE_MAGIC)?;
    writer.write_u16::<LittleEndian>(image.entry_function)?;
    writer.write_u32::<LittleEndian>(image.functions.len() as u32)?;

    for f in &image.functions {
        writer.write_u32::<LittleEndian>(f.name.len() as u32)?;
        writer.write_all(f.name.as_bytes())?;
        writer.write_u32::<LittleEndian>(f.entry)?;
        writer.write_u8(f.params.len() as u8)?;
        for p in &f.params {
            writer.write_u8(p.as_u8())?;
        }
        writer.write_u8(f.returns.map_or(SER_VOID, SlotKind::as_u8))?;
    }

    writer.write_u32::<LittleEndian>(image.code.len() as u32)?;
    writer.write_all(&image.code)?;
    Ok(())
}

/// Serialize into a fresh buffer.
pub fn to_bytes(image: &ProgramImage) -> Result<Vec<u8>, LoaderError> {
    let mut out = Vec::with_capacity(16 + image.code.len());
    write_image(&mut out, image)?;
    Ok(out)
}
