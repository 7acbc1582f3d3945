//! X11 keycode constants
//!
//! X key codes are Linux evdev codes shifted by 8
//! (<linux/input-event-codes.h> + `KEYCODE_OFFSET`).

/// Offset between evdev and X key codes
pub const KEYCODE_OFFSET: u32 = 8;

/// Smallest key code the X protocol can carry
pub const MIN_KEYCODE: u32 = 8;

/// Largest key code the X protocol can carry
pub const MAX_KEYCODE: u32 = 255;

// ============================================================================
// Editing Keys
// ============================================================================

/// Escape key
pub const KEY_ESCAPE: u32 = 9;

/// Backspace key
pub const KEY_BACKSPACE: u32 = 22;

/// Tab key
pub const KEY_TAB: u32 = 23;

/// Return key
pub const KEY_RETURN: u32 = 36;

/// Space bar
pub const KEY_SPACE: u32 = 65;

/// Letter A (US layout position AC01)
pub const KEY_A: u32 = 38;

/// Digit 1 (US layout position AE01)
pub const KEY_1: u32 = 10;

// ============================================================================
// Modifier Keys
// ============================================================================

/// Left Control key
pub const KEY_LEFTCTRL: u32 = 37;

/// Right Control key
pub const KEY_RIGHTCTRL: u32 = 105;

/// Left Shift key
pub const KEY_LEFTSHIFT: u32 = 50;

/// Right Shift key
pub const KEY_RIGHTSHIFT: u32 = 62;

/// Left Alt key
pub const KEY_LEFTALT: u32 = 64;

/// Right Alt key (AltGr on some keyboards)
pub const KEY_RIGHTALT: u32 = 108;

// ============================================================================
// Navigation Keys
// ============================================================================

/// Up arrow key
pub const KEY_UP: u32 = 111;

/// Left arrow key
pub const KEY_LEFT: u32 = 113;

/// Right arrow key
pub const KEY_RIGHT: u32 = 114;

/// Down arrow key
pub const KEY_DOWN: u32 = 116;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert an evdev key code to an X key code
/// Returns None when the shifted code does not fit in u32
#[inline]
pub const fn from_evdev(code: u32) -> Option<u32> {
    code.checked_add(KEYCODE_OFFSET)
}

/// Convert an X key code back to evdev
/// Returns None below the offset
#[inline]
pub const fn to_evdev(keycode: u32) -> Option<u32> {
    keycode.checked_sub(KEYCODE_OFFSET)
}

/// Check if keycode fits the X protocol range
#[inline]
pub const fn is_valid(keycode: u32) -> bool {
    keycode >= MIN_KEYCODE && keycode <= MAX_KEYCODE
}

/// Check if keycode is a modifier key
#[inline]
pub const fn is_modifier_key(keycode: u32) -> bool {
    matches!(
        keycode,
        KEY_LEFTSHIFT | KEY_RIGHTSHIFT | KEY_LEFTCTRL | KEY_RIGHTCTRL | KEY_LEFTALT | KEY_RIGHTALT
    )
}
