//! Decoding of inbound text frames.
//!
//! A roll request looks like `R20*`: the marker, a decimal bound and the
//! terminator. Everything else is [`Command::Unrecognized`].

use crate::Error;

pub const ROLL_MARKER: u8 = b'R';
pub const TERMINATOR: u8 = b'*';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Roll { bound: u32 },
    Unrecognized,
}

impl Command {
    /// Encodes the command the way a client sends it.
    pub fn to_frame(&self) -> Option<String> {
        match self {
            Command::Roll { bound } => Some(format!(
                "{}{}{}",
                ROLL_MARKER as char, bound, TERMINATOR as char
            )),
            Command::Unrecognized => None,
        }
    }
}

pub fn parse(frame: &[u8]) -> Result<Command, Error> {
    let rest = match frame.split_first() {
        Some((&ROLL_MARKER, rest)) => rest,
        _ => return Ok(Command::Unrecognized),
    };
    let end = rest
        .iter()
        .position(|&b| b == TERMINATOR)
        .ok_or(Error::TruncatedCommand)?;
    Ok(Command::Roll {
        bound: numeral(&rest[..end]),
    })
}

/// Permissive decimal conversion: anything that is not a plain `u32`
/// numeral becomes 0.
fn numeral(digits: &[u8]) -> u32 {
    digits
        .iter()
        .try_fold(0u32, |acc, &b| {
            if !b.is_ascii_digit() {
                return None;
            }
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        })
        .unwrap_or(0)
}
