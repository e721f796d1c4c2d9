//! Wire format of the `WM_COPYDATA` handoff between launches.
//!
//! `dwData` carries [`APP_LINK_MESSAGE`], `lpData` a null-terminated UTF-16
//! string and `cbData` its size in bytes including the terminator.

use crate::error::PayloadError;

/// `WM_USER + 2`; the link-handling plugin of the main window listens on it.
pub const APP_LINK_MESSAGE: usize = 0x0400 + 2;

const UNIT: usize = std::mem::size_of::<u16>();

/// Wide, null-terminated buffer ready to be pointed at by a `COPYDATASTRUCT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDataPayload {
    tag: usize,
    wide: Vec<u16>,
}

impl CopyDataPayload {
    pub fn from_uri(tag: usize, uri: &str) -> Self {
        let wide = uri.encode_utf16().chain(std::iter::once(0)).collect();
        Self { tag, wide }
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    /// UTF-16 units including the trailing NUL.
    pub fn as_wide(&self) -> &[u16] {
        &self.wide
    }

    /// `(characters + 1) * 2`, checked against the 32-bit `cbData` field.
    pub fn byte_len(&self) -> Result<u32, PayloadError> {
        let bytes = self.wide.len() * UNIT;
        u32::try_from(bytes).map_err(|_| PayloadError::TooLarge(bytes))
    }
}

/// Reads a URI back out of a received data-copy buffer.
///
/// `bytes` is the `cbData`-long region at `lpData`. The string ends at the
/// first NUL; anything after it is ignored.
pub fn decode_uri(expected_tag: usize, tag: usize, bytes: &[u8]) -> Result<String, PayloadError> {
    if tag != expected_tag {
        return Err(PayloadError::ForeignTag {
            expected: expected_tag,
            found: tag,
        });
    }
    if bytes.len() % UNIT != 0 {
        return Err(PayloadError::OddLength(bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(UNIT)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    let end = units
        .iter()
        .position(|&u| u == 0)
        .ok_or(PayloadError::MissingTerminator)?;
    String::from_utf16(&units[..end]).map_err(|_| PayloadError::InvalidUtf16)
}

/// What a window procedure should do with an incoming data-copy message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Someone else's `dwData`: hand the message to the default procedure.
    Foreign,
    Uri(String),
    /// Our tag, unusable buffer.
    Malformed(PayloadError),
}

/// Sorts a received `WM_COPYDATA` into [`Received`].
pub fn classify_copy_data(expected_tag: usize, tag: usize, bytes: &[u8]) -> Received {
    if tag != expected_tag {
        return Received::Foreign;
    }
    match decode_uri(expected_tag, tag, bytes) {
        Ok(uri) => Received::Uri(uri),
        Err(e) => Received::Malformed(e),
    }
}
