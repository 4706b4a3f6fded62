//! On-disk form of a compiled program: a 4-byte magic, a format version byte,
//! then the postcard encoding of [`ProgramBc`].

use thiserror::Error;

use crate::bytecode::ProgramBc;

pub const MAGIC: &[u8; 4] = b"MYCB";
pub const VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageError {
    #[error("image error: not a bytecode image (bad magic)")]
    BadMagic,

    #[error("image error: unsupported format version {found} (expected {VERSION})")]
    UnsupportedVersion { found: u8 },

    #[error("image error: encoding failed: {0}")]
    Encode(String),

    #[error("image error: decoding failed: {0}")]
    Decode(String),
}

pub fn encode(program: &ProgramBc) -> Result<Vec<u8>, ImageError> {
    let body = postcard::to_allocvec(program).map_err(|e| ImageError::Encode(e.to_string()))?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + 1 + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(VERSION);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<ProgramBc, ImageError> {
    let body = bytes.strip_prefix(MAGIC.as_slice()).ok_or(ImageError::BadMagic)?;
    let (&version, body) = body.split_first().ok_or(ImageError::BadMagic)?;
    if version != VERSION {
        return Err(ImageError::UnsupportedVersion { found: version });
    }

    let program: ProgramBc =
        postcard::from_bytes(body).map_err(|e| ImageError::Decode(e.to_string()))?;
    log::debug!(
        "decoded image: {} instructions, {} cells",
        program.ops.len(),
        program.cells.len()
    );
    Ok(program)
}

/// True if `bytes` start with the image magic.
pub fn is_image(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}
