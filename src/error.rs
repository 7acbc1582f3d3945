//! Error types
//!
//! Failures while setting up a lookup. A lookup that runs but yields
//! nothing (or overflows the buffer) is not an error; see `LookupStatus`.

use thiserror::Error;

/// Key translation failure
#[derive(Debug, Error)]
pub enum TranslateError {
    /// libX11 could not be loaded, or a required symbol is missing
    #[error("failed to load libX11: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// XOpenDisplay returned null
    #[error("cannot open display {name:?}")]
    DisplayUnavailable { name: String },

    /// Xlib does not support the current locale
    #[error("locale is not supported by Xlib")]
    LocaleUnsupported,

    /// Locale modifier string cannot be passed to Xlib
    #[error("invalid locale modifiers {0:?} (contains NUL)")]
    InvalidLocaleModifiers(String),

    /// XOpenIM returned null
    #[error("cannot open input method")]
    InputMethodUnavailable,

    /// XCreateIC returned null
    #[error("cannot create input context")]
    InputContextUnavailable,

    /// xkbcommon could not compile the keymap
    #[error("failed to compile xkb keymap: {0}")]
    Keymap(String),

    /// Lookup buffer does not hold valid UTF-8
    #[error("lookup returned invalid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Status value outside the XLookup* set
    #[error("unknown lookup status {0}")]
    UnknownStatus(i32),

    /// Backend name not recognized
    #[error("unknown backend {0:?} (expected \"xim\" or \"xkb\")")]
    UnknownBackend(String),
}

pub type Result<T> = std::result::Result<T, TranslateError>;
