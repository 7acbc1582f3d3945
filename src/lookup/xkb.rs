//! xkbcommon lookup
//!
//! Offline counterpart of the XIM translator. The keymap is compiled once;
//! each lookup starts from a fresh `xkb::State`, so no modifier or group
//! state leaks from one call into the next.

use log::info;
use xkbcommon::xkb;
use xkbcommon::xkb::keysyms;

use super::{KeyTranslator, LookupBuffer, RawLookup, StatusCode};
use crate::config::KeyboardConfig;
use crate::error::{Result, TranslateError};
use crate::input::ModifierMask;

/// Translator over a compiled xkb keymap
pub struct XkbTranslator {
    keymap: xkb::Keymap,
}

impl XkbTranslator {
    /// Compile a keymap from RMLVO names (empty fields use the system defaults)
    pub fn from_names(kb_config: &KeyboardConfig) -> Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);

        let options = if kb_config.xkb_options.is_empty() {
            None
        } else {
            Some(kb_config.xkb_options.clone())
        };

        let keymap = xkb::Keymap::new_from_names(
            &context,
            &kb_config.xkb_rules,
            &kb_config.xkb_model,
            &kb_config.xkb_layout,
            &kb_config.xkb_variant,
            options,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| {
            TranslateError::Keymap(format!(
                "rules={:?} model={:?} layout={:?} variant={:?} options={:?}",
                kb_config.xkb_rules,
                kb_config.xkb_model,
                kb_config.xkb_layout,
                kb_config.xkb_variant,
                kb_config.xkb_options
            ))
        })?;

        info!(
            "xkb translator ready (layout={})",
            if kb_config.xkb_layout.is_empty() { "default" } else { &kb_config.xkb_layout }
        );
        Ok(Self { keymap })
    }

    /// Compile a keymap from its text form (xkb_keymap { ... })
    pub fn from_keymap_string(text: &str) -> Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_string(
            &context,
            text.to_string(),
            xkb::KEYMAP_FORMAT_TEXT_V1,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| TranslateError::Keymap("invalid keymap text".to_string()))?;
        Ok(Self { keymap })
    }
}

impl KeyTranslator for XkbTranslator {
    fn lookup(
        &self,
        keycode: u32,
        mask: ModifierMask,
        buffer: &mut LookupBuffer,
    ) -> Result<RawLookup> {
        let mut state = xkb::State::new(&self.keymap);
        // X core real modifiers occupy the first eight xkb modifier indices
        state.update_mask(mask.real_mods(), 0, 0, 0, 0, mask.group());

        let xkb_keycode = xkb::Keycode::new(keycode);
        let sym = state.key_get_one_sym(xkb_keycode);
        let utf8 = state.key_get_utf8(xkb_keycode);

        Ok(fill_buffer(sym.raw(), &utf8, buffer))
    }
}

/// Copy lookup text into the buffer with Xutf8LookupString semantics
///
/// Text longer than the buffer is not copied; the result carries the
/// required length instead.
fn fill_buffer(keysym: u32, text: &str, buffer: &mut [u8]) -> RawLookup {
    let bytes = text.as_bytes();
    if bytes.len() > buffer.len() {
        return RawLookup {
            status: StatusCode::BufferOverflow,
            len: bytes.len(),
            keysym: keysyms::KEY_NoSymbol,
        };
    }
    buffer[..bytes.len()].copy_from_slice(bytes);

    let has_sym = keysym != keysyms::KEY_NoSymbol;
    let status = match (bytes.is_empty(), has_sym) {
        (false, true) => StatusCode::LookupBoth,
        (false, false) => StatusCode::LookupChars,
        (true, true) => StatusCode::LookupKeySym,
        (true, false) => StatusCode::LookupNone,
    };

    RawLookup {
        status,
        len: bytes.len(),
        keysym,
    }
}
