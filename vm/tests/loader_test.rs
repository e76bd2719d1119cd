mod common;

use common::*;
use vm::specs::{IMAGE_MAGIC, MAX_CODE_LEN, MAX_NAME_LEN};
use vm::{load_bytes, to_bytes, write_image, FunctionInfo, LoaderError, SlotKind, StackEntry, VM};

#[test]
fn test_written_image_loads_and_runs() {
    let image = recursive_fib();
    let bytes = to_bytes(&image).unwrap();
    assert_eq!(&bytes[..4], IMAGE_MAGIC);

    let loaded = load_bytes(&bytes).unwrap();
    assert_eq!(loaded, image);
    assert_eq!(
        VM::default().run(loaded, &[StackEntry::Int(10)]),
        Ok(Some(StackEntry::Int(89)))
    );
}

#[test]
fn test_bad_magic() {
    let mut bytes = to_bytes(&iterative_fib()).unwrap();
    bytes[0] = b'X';
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Format(_))));
}

#[test]
fn test_truncated_file() {
    let bytes = to_bytes(&iterative_fib()).unwrap();
    let cut = &bytes[..bytes.len() - 3];
    assert!(matches!(load_bytes(cut), Err(LoaderError::Io(_))));
}

#[test]
fn test_function_count_limit() {
    let mut bytes = IMAGE_MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Security(_))));
}

#[test]
fn test_name_length_limit() {
    let mut bytes = IMAGE_MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&(MAX_NAME_LEN + 1).to_le_bytes());
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Security(_))));
}

#[test]
fn test_code_length_limit() {
    let mut bytes = IMAGE_MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&(MAX_CODE_LEN + 1).to_le_bytes());
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Security(_))));
}

#[test]
fn test_unknown_param_kind() {
    let mut bytes = IMAGE_MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.push(b'f');
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.push(1);
    bytes.push(9);
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Format(_))));
}

#[test]
fn test_entry_outside_code_is_rejected() {
    let mut image = iterative_fib();
    image.functions[0].entry = image.code.len() as u32 + 10;
    let bytes = to_bytes(&image).unwrap();
    assert!(matches!(load_bytes(&bytes), Err(LoaderError::Format(_))));
}

#[test]
fn test_rejected_image_writes_nothing() {
    let mut image = iterative_fib();
    image.functions.push(FunctionInfo::new(
        "x".repeat(MAX_NAME_LEN as usize + 1),
        0,
        vec![],
        None,
    ));

    let mut out = Vec::new();
    assert!(matches!(write_image(&mut out, &image), Err(LoaderError::Security(_))));
    assert!(out.is_empty());

    let mut image = iterative_fib();
    image.functions[0].params = vec![SlotKind::Int; 256];
    assert!(matches!(write_image(&mut out, &image), Err(LoaderError::Format(_))));
    assert!(out.is_empty());
}
