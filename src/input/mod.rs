//! Input definitions
//!
//! Key codes and modifier masks in the X core event layout.

pub mod keycodes;
pub mod modifiers;

pub use modifiers::{ModifierMask, ParseModifierError};
