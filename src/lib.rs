//! keytrans - X11 key code to UTF-8 translation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   translate(keycode, mask)               │
//! ├──────────────────────────────────────────┤
//! │  Backend: XIM (libX11)  |  xkbcommon     │
//! │                 ↓                        │
//! │   32-byte buffer + XLookup* status       │
//! │                 ↓                        │
//! │          LookupStatus                    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! A lookup opens its own display connection, input method and input
//! context, and closes them before returning. Nothing is cached.

pub mod config;
pub mod error;
pub mod input;
pub mod lookup;

pub use config::Config;
pub use error::{Result, TranslateError};
pub use input::ModifierMask;
pub use lookup::{
    keycode_to_char, Backend, BackendKind, KeyTranslator, LookupBuffer, LookupStatus, RawLookup,
    StatusCode, XimTranslator, XkbTranslator, LOOKUP_BUFFER_LEN,
};

/// Translate one key press on the default display ($DISPLAY)
///
/// Loads libX11, opens a connection, input method and input context,
/// performs the lookup and releases everything again.
pub fn translate(keycode: u32, mask: ModifierMask) -> Result<LookupStatus> {
    let translator = XimTranslator::new(&config::DisplayConfig::default())?;
    translator.translate(keycode, mask)
}
