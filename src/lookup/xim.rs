//! X input method lookup
//!
//! Every lookup opens its own display connection, input method and input
//! context, feeds one synthesized key press through `Xutf8LookupString`
//! and releases everything again. Nothing survives the call, so there is
//! no state to carry dead keys or preedit between events.
//!
//! The handles are scoped: `DisplayHandle` > `InputMethod` > `InputContext`,
//! each borrowing its parent, so they are always released innermost first.

use log::{debug, info};
use std::ffi::{c_int, CStr, CString};
use std::ptr::NonNull;

use super::xlib::{self, Display, KeySym, XEvent, Xic, XicRec, Xim, XimRec, XimStyle, Xlib};
use super::{KeyTranslator, LookupBuffer, RawLookup, StatusCode};
use crate::config::DisplayConfig;
use crate::error::{Result, TranslateError};
use crate::input::ModifierMask;

/// Input style of the lookup context: no preedit, no status area
pub const LOOKUP_STYLE: XimStyle = xlib::XIM_PREEDIT_NOTHING | xlib::XIM_STATUS_NOTHING;

/// Entry points of the X input method library
///
/// Implemented by the runtime-loaded `Xlib`. Null return values mean failure.
pub trait InputMethodApi {
    /// XOpenDisplay; `None` uses $DISPLAY
    fn open_display(&self, name: Option<&CStr>) -> *mut Display;

    /// XCloseDisplay
    ///
    /// # Safety
    /// `display` must come from `open_display` and not be closed yet.
    unsafe fn close_display(&self, display: *mut Display);

    /// XOpenIM without resource database
    ///
    /// # Safety
    /// `display` must be an open display.
    unsafe fn open_im(&self, display: *mut Display) -> Xim;

    /// XCloseIM
    ///
    /// # Safety
    /// `im` must come from `open_im` and not be closed yet.
    unsafe fn close_im(&self, im: Xim);

    /// XCreateIC with `XNInputStyle`
    ///
    /// # Safety
    /// `im` must be an open input method.
    unsafe fn create_ic(&self, im: Xim, style: XimStyle) -> Xic;

    /// XDestroyIC
    ///
    /// # Safety
    /// `ic` must come from `create_ic` and not be destroyed yet.
    unsafe fn destroy_ic(&self, ic: Xic);

    /// Xutf8LookupString with `buffer.len()` as capacity
    ///
    /// # Safety
    /// `ic` must be a live input context and `event` a key press on its display.
    unsafe fn utf8_lookup(
        &self,
        ic: Xic,
        event: &mut XEvent,
        buffer: &mut [u8],
        keysym: &mut KeySym,
        status: &mut c_int,
    ) -> c_int;
}

/// Open display connection, closed on drop
struct DisplayHandle<'a, A: InputMethodApi> {
    api: &'a A,
    raw: NonNull<Display>,
}

impl<'a, A: InputMethodApi> DisplayHandle<'a, A> {
    fn open(api: &'a A, name: Option<&CStr>) -> Result<Self> {
        let raw = NonNull::new(api.open_display(name)).ok_or_else(|| {
            TranslateError::DisplayUnavailable {
                name: name.map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
            }
        })?;
        Ok(Self { api, raw })
    }
}

impl<A: InputMethodApi> Drop for DisplayHandle<'_, A> {
    fn drop(&mut self) {
        unsafe { self.api.close_display(self.raw.as_ptr()) };
    }
}

/// Open input method, closed on drop
struct InputMethod<'a, A: InputMethodApi> {
    display: &'a DisplayHandle<'a, A>,
    raw: NonNull<XimRec>,
}

impl<'a, A: InputMethodApi> InputMethod<'a, A> {
    fn open(display: &'a DisplayHandle<'a, A>) -> Result<Self> {
        let raw = unsafe { display.api.open_im(display.raw.as_ptr()) };
        let raw = NonNull::new(raw).ok_or(TranslateError::InputMethodUnavailable)?;
        Ok(Self { display, raw })
    }
}

impl<A: InputMethodApi> Drop for InputMethod<'_, A> {
    fn drop(&mut self) {
        unsafe { self.display.api.close_im(self.raw.as_ptr()) };
    }
}

/// Input context, destroyed on drop
struct InputContext<'a, A: InputMethodApi> {
    im: &'a InputMethod<'a, A>,
    raw: NonNull<XicRec>,
}

impl<'a, A: InputMethodApi> InputContext<'a, A> {
    fn create(im: &'a InputMethod<'a, A>, style: XimStyle) -> Result<Self> {
        let raw = unsafe { im.display.api.create_ic(im.raw.as_ptr(), style) };
        let raw = NonNull::new(raw).ok_or(TranslateError::InputContextUnavailable)?;
        Ok(Self { im, raw })
    }

    /// Run one key press through the context
    fn lookup(
        &self,
        keycode: u32,
        mask: ModifierMask,
        buffer: &mut LookupBuffer,
    ) -> Result<RawLookup> {
        let display = self.im.display;
        let mut event = XEvent::key_press(display.raw.as_ptr(), keycode, mask.bits());
        let mut keysym: KeySym = 0;
        let mut status: c_int = 0;

        let len = unsafe {
            display
                .api
                .utf8_lookup(self.raw.as_ptr(), &mut event, buffer, &mut keysym, &mut status)
        };

        Ok(RawLookup {
            status: StatusCode::from_raw(status)?,
            len: usize::try_from(len).unwrap_or(0),
            keysym: keysym as u32,
        })
    }
}

impl<A: InputMethodApi> Drop for InputContext<'_, A> {
    fn drop(&mut self) {
        unsafe { self.im.display.api.destroy_ic(self.raw.as_ptr()) };
    }
}

/// Translator backed by the X input method
pub struct XimTranslator<A: InputMethodApi = Xlib> {
    api: A,
    /// Display to connect to; None uses $DISPLAY
    display_name: Option<CString>,
}

impl XimTranslator<Xlib> {
    /// Load libX11 and prepare the locale for input methods
    pub fn new(config: &DisplayConfig) -> Result<Self> {
        let modifiers = CString::new(config.locale_modifiers.as_str()).map_err(|_| {
            TranslateError::InvalidLocaleModifiers(config.locale_modifiers.clone())
        })?;

        let xlib = Xlib::load()?;
        xlib.prepare_locale(&modifiers)?;

        let translator = Self::with_api(xlib, &config.name)?;
        info!(
            "XIM translator ready (display={})",
            if config.name.is_empty() { "$DISPLAY" } else { &config.name }
        );
        Ok(translator)
    }
}

impl<A: InputMethodApi> XimTranslator<A> {
    /// Translator over an explicit API; empty `display_name` uses $DISPLAY
    pub fn with_api(api: A, display_name: &str) -> Result<Self> {
        let display_name = if display_name.is_empty() {
            None
        } else {
            Some(CString::new(display_name).map_err(|_| TranslateError::DisplayUnavailable {
                name: display_name.to_string(),
            })?)
        };
        Ok(Self { api, display_name })
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: InputMethodApi> KeyTranslator for XimTranslator<A> {
    fn lookup(
        &self,
        keycode: u32,
        mask: ModifierMask,
        buffer: &mut LookupBuffer,
    ) -> Result<RawLookup> {
        let display = DisplayHandle::open(&self.api, self.display_name.as_deref())?;
        let im = InputMethod::open(&display)?;
        let ic = InputContext::create(&im, LOOKUP_STYLE)?;
        debug!("XIM context open for keycode {}", keycode);
        let raw = ic.lookup(keycode, mask, buffer)?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{LookupStatus, LOOKUP_BUFFER_LEN};
    use std::cell::{Cell, RefCell};

    /// Step at which the mock refuses to hand out a handle
    #[derive(Clone, Copy, PartialEq)]
    enum FailAt {
        Nothing,
        Display,
        InputMethod,
        InputContext,
    }

    /// Input method API that counts handles and answers from a fixed table
    struct MockApi {
        fail_at: FailAt,
        status: c_int,
        text: &'static str,
        keysym: KeySym,
        open_displays: Cell<i32>,
        open_ims: Cell<i32>,
        open_ics: Cell<i32>,
        close_log: RefCell<Vec<u8>>,
        last_state: Cell<u32>,
        last_keycode: Cell<u32>,
    }

    impl MockApi {
        fn new(status: c_int, text: &'static str, keysym: KeySym) -> Self {
            Self {
                fail_at: FailAt::Nothing,
                status,
                text,
                keysym,
                open_displays: Cell::new(0),
                open_ims: Cell::new(0),
                open_ics: Cell::new(0),
                close_log: RefCell::new(Vec::new()),
                last_state: Cell::new(0),
                last_keycode: Cell::new(0),
            }
        }

        fn failing(fail_at: FailAt) -> Self {
            Self {
                fail_at,
                ..Self::new(2, "a", 0x61)
            }
        }

        fn open_handles(&self) -> i32 {
            self.open_displays.get() + self.open_ims.get() + self.open_ics.get()
        }

        /// Record a release (1=ic, 2=im, 3=display)
        fn log_close(&self, step: u8) {
            self.close_log.borrow_mut().push(step);
        }
    }

    impl InputMethodApi for MockApi {
        fn open_display(&self, _name: Option<&CStr>) -> *mut Display {
            if self.fail_at == FailAt::Display {
                return std::ptr::null_mut();
            }
            self.open_displays.set(self.open_displays.get() + 1);
            NonNull::dangling().as_ptr()
        }

        unsafe fn close_display(&self, _display: *mut Display) {
            self.open_displays.set(self.open_displays.get() - 1);
            self.log_close(3);
        }

        unsafe fn open_im(&self, _display: *mut Display) -> Xim {
            if self.fail_at == FailAt::InputMethod {
                return std::ptr::null_mut();
            }
            self.open_ims.set(self.open_ims.get() + 1);
            NonNull::dangling().as_ptr()
        }

        unsafe fn close_im(&self, _im: Xim) {
            self.open_ims.set(self.open_ims.get() - 1);
            self.log_close(2);
        }

        unsafe fn create_ic(&self, _im: Xim, style: XimStyle) -> Xic {
            assert_eq!(style, LOOKUP_STYLE);
            if self.fail_at == FailAt::InputContext {
                return std::ptr::null_mut();
            }
            self.open_ics.set(self.open_ics.get() + 1);
            NonNull::dangling().as_ptr()
        }

        unsafe fn destroy_ic(&self, _ic: Xic) {
            self.open_ics.set(self.open_ics.get() - 1);
            self.log_close(1);
        }

        unsafe fn utf8_lookup(
            &self,
            _ic: Xic,
            event: &mut XEvent,
            buffer: &mut [u8],
            keysym: &mut KeySym,
            status: &mut c_int,
        ) -> c_int {
            let key = event.as_key();
            self.last_state.set(key.state);
            self.last_keycode.set(key.keycode);

            let bytes = self.text.as_bytes();
            if bytes.len() > buffer.len() {
                *status = StatusCode::BufferOverflow.raw();
                return bytes.len() as c_int;
            }
            buffer[..bytes.len()].copy_from_slice(bytes);
            *keysym = self.keysym;
            *status = self.status;
            bytes.len() as c_int
        }
    }

    #[test]
    fn test_lookup_composes_text() {
        let t = XimTranslator::with_api(MockApi::new(4, "a", 0x61), "").unwrap();
        let status = t.translate(38, ModifierMask::empty()).unwrap();
        assert_eq!(status.text(), Some("a"));
        assert_eq!(status.keysym(), Some(0x61));
        assert_eq!(t.api().open_handles(), 0);
    }

    #[test]
    fn test_modifier_mask_reaches_event() {
        let t = XimTranslator::with_api(MockApi::new(4, "A", 0x41), ":1").unwrap();
        let mask = ModifierMask::SHIFT | ModifierMask::MOD2;
        t.translate(38, mask).unwrap();
        assert_eq!(t.api().last_state.get(), 0x11);
        assert_eq!(t.api().last_keycode.get(), 38);
    }

    #[test]
    fn test_handles_released_in_reverse_order() {
        let t = XimTranslator::with_api(MockApi::new(2, "x", 0), "").unwrap();
        t.translate(53, ModifierMask::empty()).unwrap();
        assert_eq!(*t.api().close_log.borrow(), [1, 2, 3]);
    }

    #[test]
    fn test_no_leak_over_many_calls() {
        let t = XimTranslator::with_api(MockApi::new(3, "", 0xffe1), "").unwrap();
        for _ in 0..1000 {
            let status = t.translate(50, ModifierMask::empty()).unwrap();
            assert_eq!(status, LookupStatus::KeySymOnly { keysym: 0xffe1 });
            assert_eq!(t.api().open_handles(), 0);
        }
        assert_eq!(t.api().close_log.borrow().len(), 3000);
    }

    #[test]
    fn test_release_on_failure_paths() {
        for fail_at in [FailAt::Display, FailAt::InputMethod, FailAt::InputContext] {
            let t = XimTranslator::with_api(MockApi::failing(fail_at), "").unwrap();
            assert!(t.translate(38, ModifierMask::empty()).is_err());
            assert_eq!(t.api().open_handles(), 0);
        }
    }

    #[test]
    fn test_failure_kinds() {
        let t = XimTranslator::with_api(MockApi::failing(FailAt::Display), ":9").unwrap();
        match t.translate(38, ModifierMask::empty()) {
            Err(TranslateError::DisplayUnavailable { name }) => assert_eq!(name, ":9"),
            other => panic!("unexpected {:?}", other),
        }

        let t = XimTranslator::with_api(MockApi::failing(FailAt::InputMethod), "").unwrap();
        assert!(matches!(
            t.translate(38, ModifierMask::empty()),
            Err(TranslateError::InputMethodUnavailable)
        ));

        let t = XimTranslator::with_api(MockApi::failing(FailAt::InputContext), "").unwrap();
        assert!(matches!(
            t.translate(38, ModifierMask::empty()),
            Err(TranslateError::InputContextUnavailable)
        ));
    }

    #[test]
    fn test_overflow_leaves_buffer_alone() {
        let long = "ℵℵℵℵℵℵℵℵℵℵℵ"; // 33 bytes
        let t = XimTranslator::with_api(MockApi::new(2, long, 0), "").unwrap();
        let mut buffer = [0xaau8; LOOKUP_BUFFER_LEN];
        let raw = t.lookup(38, ModifierMask::empty(), &mut buffer).unwrap();
        assert_eq!(raw.status, StatusCode::BufferOverflow);
        assert_eq!(raw.len, long.len());
        assert!(buffer.iter().all(|&b| b == 0xaa));
        assert_eq!(t.api().open_handles(), 0);
    }

    #[test]
    fn test_unknown_status() {
        let t = XimTranslator::with_api(MockApi::new(7, "", 0), "").unwrap();
        assert!(matches!(
            t.translate(38, ModifierMask::empty()),
            Err(TranslateError::UnknownStatus(7))
        ));
        assert_eq!(t.api().open_handles(), 0);
    }

    #[test]
    fn test_display_name_with_nul() {
        assert!(XimTranslator::with_api(MockApi::new(1, "", 0), "a\0b").is_err());
    }

    #[test]
    fn test_locale_modifiers_with_nul() {
        let config = DisplayConfig {
            locale_modifiers: "@im=\0none".to_string(),
            ..Default::default()
        };
        match XimTranslator::new(&config) {
            Err(TranslateError::InvalidLocaleModifiers(mods)) => assert_eq!(mods, "@im=\0none"),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("modifiers with NUL accepted"),
        }
    }

    #[test]
    #[ignore]
    fn test_live_display() {
        // Requires a running X server and DISPLAY
        let t = XimTranslator::new(&DisplayConfig::default()).unwrap();
        let first = t.translate(38, ModifierMask::empty()).unwrap();
        let second = t.translate(38, ModifierMask::empty()).unwrap();
        assert_eq!(first, second);
    }
}
