//! Key lookup
//!
//! Translate a key code plus modifier mask into UTF-8 text.
//! - `xim`: live lookup through the X input method (libX11, loaded at runtime)
//! - `xkb`: offline lookup against an xkbcommon keymap
//!
//! Both backends fill a fixed 32-byte buffer and report one of the
//! `Xutf8LookupString` status codes, which `LookupStatus` turns into a
//! tagged result.

pub mod xim;
pub mod xkb;
pub mod xlib;

use log::debug;
use smol_str::SmolStr;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{Result, TranslateError};
use crate::input::ModifierMask;

pub use xim::{InputMethodApi, XimTranslator};
pub use xkb::XkbTranslator;

/// Capacity of the lookup buffer in bytes
pub const LOOKUP_BUFFER_LEN: usize = 32;

/// Buffer a single lookup writes into
pub type LookupBuffer = [u8; LOOKUP_BUFFER_LEN];

/// Raw status values of `Xutf8LookupString`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusCode {
    /// Text did not fit; returned length is the size required
    BufferOverflow = -1,
    /// No text and no keysym
    LookupNone = 1,
    /// Text only
    LookupChars = 2,
    /// Keysym only
    LookupKeySym = 3,
    /// Text and keysym
    LookupBoth = 4,
}

impl StatusCode {
    /// Map the numeric status returned by libX11
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            -1 => Ok(Self::BufferOverflow),
            1 => Ok(Self::LookupNone),
            2 => Ok(Self::LookupChars),
            3 => Ok(Self::LookupKeySym),
            4 => Ok(Self::LookupBoth),
            other => Err(TranslateError::UnknownStatus(other)),
        }
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self as i32
    }
}

/// Undecoded result of one lookup
///
/// `len` is the number of bytes written to the buffer, or the number of
/// bytes that would have been needed when `status` is `BufferOverflow`.
/// `keysym` is only meaningful for `LookupKeySym` and `LookupBoth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLookup {
    pub status: StatusCode,
    pub len: usize,
    pub keysym: u32,
}

/// Decoded result of one lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    /// The key produced text (with its keysym when the method reported one)
    Composed { text: SmolStr, keysym: Option<u32> },
    /// The key has a keysym but produces no text (modifiers, arrows, ...)
    KeySymOnly { keysym: u32 },
    /// Nothing is bound to the key
    None,
    /// The text did not fit the lookup buffer
    Error { required: usize },
}

impl LookupStatus {
    /// Decode a raw lookup against the buffer it filled
    pub fn decode(raw: RawLookup, buffer: &[u8]) -> Result<Self> {
        let status = match raw.status {
            StatusCode::BufferOverflow => Self::Error { required: raw.len },
            StatusCode::LookupNone => Self::None,
            StatusCode::LookupKeySym => Self::KeySymOnly { keysym: raw.keysym },
            StatusCode::LookupChars | StatusCode::LookupBoth => {
                let len = raw.len.min(buffer.len());
                let text = std::str::from_utf8(&buffer[..len])?;
                let keysym = (raw.status == StatusCode::LookupBoth).then_some(raw.keysym);
                Self::Composed {
                    text: SmolStr::new(text),
                    keysym,
                }
            }
        };
        Ok(status)
    }

    /// Composed text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Composed { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Keysym reported with the result, if any
    pub fn keysym(&self) -> Option<u32> {
        match self {
            Self::Composed { keysym, .. } => *keysym,
            Self::KeySymOnly { keysym } => Some(*keysym),
            Self::None | Self::Error { .. } => None,
        }
    }

    /// Whether the key produced text
    pub fn is_composed(&self) -> bool {
        matches!(self, Self::Composed { .. })
    }

    /// Status code this result was decoded from
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Composed { keysym: Some(_), .. } => StatusCode::LookupBoth,
            Self::Composed { keysym: None, .. } => StatusCode::LookupChars,
            Self::KeySymOnly { .. } => StatusCode::LookupKeySym,
            Self::None => StatusCode::LookupNone,
            Self::Error { .. } => StatusCode::BufferOverflow,
        }
    }
}

/// A source of key lookups
///
/// Implementations must not retain state between calls: the same key code
/// and mask always give the same result.
pub trait KeyTranslator {
    /// Look up one key press, writing at most `LOOKUP_BUFFER_LEN` bytes
    fn lookup(
        &self,
        keycode: u32,
        mask: ModifierMask,
        buffer: &mut LookupBuffer,
    ) -> Result<RawLookup>;

    /// Look up one key press and decode the result
    fn translate(&self, keycode: u32, mask: ModifierMask) -> Result<LookupStatus> {
        let mut buffer = [0u8; LOOKUP_BUFFER_LEN];
        let raw = self.lookup(keycode, mask, &mut buffer)?;
        debug!(
            "lookup keycode={} mask={:#x}: status={:?} len={} keysym={:#x}",
            keycode,
            mask.bits(),
            raw.status,
            raw.len,
            raw.keysym
        );
        LookupStatus::decode(raw, &buffer)
    }
}

/// First character typed by a key press, if it composed any text
pub fn keycode_to_char<T: KeyTranslator + ?Sized>(
    translator: &T,
    keycode: u32,
    mask: ModifierMask,
) -> Result<Option<char>> {
    let status = translator.translate(keycode, mask)?;
    Ok(status.text().and_then(|text| text.chars().next()))
}

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// X input method on a live display
    Xim,
    /// xkbcommon keymap, no display needed
    Xkb,
}

impl FromStr for BackendKind {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xim" | "x11" => Ok(Self::Xim),
            "xkb" => Ok(Self::Xkb),
            _ => Err(TranslateError::UnknownBackend(s.to_string())),
        }
    }
}

/// Translator chosen from configuration
pub enum Backend {
    Xim(XimTranslator),
    Xkb(XkbTranslator),
}

impl Backend {
    /// Build the backend named in `config.lookup.backend`
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.lookup.backend.parse::<BackendKind>()? {
            BackendKind::Xim => Ok(Self::Xim(XimTranslator::new(&config.display)?)),
            BackendKind::Xkb => Ok(Self::Xkb(XkbTranslator::from_names(&config.keyboard)?)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Xim(_) => BackendKind::Xim,
            Self::Xkb(_) => BackendKind::Xkb,
        }
    }
}

impl KeyTranslator for Backend {
    fn lookup(
        &self,
        keycode: u32,
        mask: ModifierMask,
        buffer: &mut LookupBuffer,
    ) -> Result<RawLookup> {
        match self {
            Self::Xim(t) => t.lookup(keycode, mask, buffer),
            Self::Xkb(t) => t.lookup(keycode, mask, buffer),
        }
    }
}
