//! Modifier masks
//!
//! Bit layout of the X core key event `state` field.
//! Bits 0-7 are the eight real modifiers, bits 13-14 carry the keyboard group.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

bitflags! {
    /// Modifier state of a key event (X core layout)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierMask: u32 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

/// First bit of the keyboard group field
const GROUP_SHIFT: u32 = 13;

/// Keyboard group field (two bits)
const GROUP_BITS: u32 = 0b11 << GROUP_SHIFT;

/// Real modifier bits
const REAL_MODS: u32 = 0xff;

/// Unknown modifier name in a mask expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown modifier {0:?}")]
pub struct ParseModifierError(pub String);

impl ModifierMask {
    /// Alt is Mod1 on every common X keymap
    pub const ALT: Self = Self::MOD1;
    /// Super/Windows key is Mod4 on every common X keymap
    pub const SUPER: Self = Self::MOD4;

    /// Build from a raw `state` value, keeping bits outside the named flags
    #[inline]
    pub const fn from_raw(state: u32) -> Self {
        Self::from_bits_retain(state)
    }

    /// Only the eight real modifier bits
    #[inline]
    pub const fn real_mods(self) -> u32 {
        self.bits() & REAL_MODS
    }

    /// Keyboard group (0-3) encoded in bits 13-14
    #[inline]
    pub const fn group(self) -> u32 {
        (self.bits() & GROUP_BITS) >> GROUP_SHIFT
    }

    /// Same modifiers with the keyboard group replaced
    #[inline]
    pub const fn with_group(self, group: u32) -> Self {
        Self::from_bits_retain((self.bits() & !GROUP_BITS) | ((group & 0b11) << GROUP_SHIFT))
    }

    /// Parse a modifier expression such as "shift+ctrl"
    ///
    /// Accepted names: shift, lock/caps, ctrl/control, alt/mod1, mod2..mod5,
    /// super (mod4), none. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Result<Self, ParseModifierError> {
        let mut mask = Self::empty();
        for part in s.split('+') {
            let name = part.trim().to_lowercase();
            let flag = match name.as_str() {
                "none" | "" => Self::empty(),
                "shift" => Self::SHIFT,
                "lock" | "caps" => Self::LOCK,
                "ctrl" | "control" => Self::CONTROL,
                "alt" | "mod1" => Self::ALT,
                "mod2" => Self::MOD2,
                "mod3" => Self::MOD3,
                "super" | "mod4" => Self::SUPER,
                "mod5" => Self::MOD5,
                _ => return Err(ParseModifierError(part.trim().to_string())),
            };
            mask |= flag;
        }
        Ok(mask)
    }
}

impl FromStr for ModifierMask {
    type Err = ParseModifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModifierMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModifierMask, &str); 8] = [
            (ModifierMask::SHIFT, "shift"),
            (ModifierMask::LOCK, "lock"),
            (ModifierMask::CONTROL, "ctrl"),
            (ModifierMask::MOD1, "alt"),
            (ModifierMask::MOD2, "mod2"),
            (ModifierMask::MOD3, "mod3"),
            (ModifierMask::MOD4, "super"),
            (ModifierMask::MOD5, "mod5"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "none")?;
        } else {
            write!(f, "{}", names.join("+"))?;
        }
        if self.group() != 0 {
            write!(f, " (group {})", self.group())?;
        }
        Ok(())
    }
}
