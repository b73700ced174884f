//! Invite link codes.
//!
//! An invite code is the pregnancy id XORed with a fixed mask and written as
//! eight lowercase hex digits. It obfuscates the id in shared URLs; it is
//! trivially reversible and grants nothing on its own.
use thiserror::Error;

const INVITE_MASK: u32 = 0x4020_2024;
const CODE_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("invalid or expired invite")]
    InvalidToken,
    #[error("pregnancy id {0} cannot be encoded as an invite code")]
    IdOutOfRange(i64),
}

pub fn encode(pregnancy_id: i64) -> Result<String, InviteError> {
    let id = u32::try_from(pregnancy_id).map_err(|_| InviteError::IdOutOfRange(pregnancy_id))?;
    Ok(format!("{:08x}", id ^ INVITE_MASK))
}

/// Recover the pregnancy id from a code.
///
/// Only the format is checked here; whether the id names an active
/// pregnancy is up to the caller.
pub fn decode(code: &str) -> Result<i64, InviteError> {
    if code.len() != CODE_LEN || !code.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InviteError::InvalidToken);
    }
    let masked = u32::from_str_radix(code, 16).map_err(|_| InviteError::InvalidToken)?;
    Ok(i64::from(masked ^ INVITE_MASK))
}
