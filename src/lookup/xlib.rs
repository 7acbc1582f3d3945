//! libX11 bindings
//!
//! The handful of Xlib entry points a lookup needs, resolved at runtime
//! with libloading so the crate has no link-time dependency on X11.

use libloading::Library;
use log::{debug, info};
use std::ffi::{c_char, c_int, c_long, c_uint, c_ulong, c_void, CStr};
use std::ptr;
use std::sync::Once;

use crate::error::{Result, TranslateError};

/// Opaque `Display`
#[repr(C)]
pub struct Display {
    _private: [u8; 0],
}

/// Opaque `struct _XIM`
#[repr(C)]
pub struct XimRec {
    _private: [u8; 0],
}

/// Opaque `struct _XIC`
#[repr(C)]
pub struct XicRec {
    _private: [u8; 0],
}

pub type Xim = *mut XimRec;
pub type Xic = *mut XicRec;
pub type Window = c_ulong;
pub type Time = c_ulong;
pub type KeySym = c_ulong;
pub type XimStyle = c_ulong;

/// Event type of a key press
pub const KEY_PRESS: c_int = 2;

pub const XIM_PREEDIT_NOTHING: XimStyle = 0x0008;
pub const XIM_STATUS_NOTHING: XimStyle = 0x0400;

/// `XNInputStyle` argument name for XCreateIC
pub const XN_INPUT_STYLE: &CStr = c"inputStyle";

/// `XKeyEvent`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XKeyEvent {
    pub type_: c_int,
    pub serial: c_ulong,
    pub send_event: c_int,
    pub display: *mut Display,
    pub window: Window,
    pub root: Window,
    pub subwindow: Window,
    pub time: Time,
    pub x: c_int,
    pub y: c_int,
    pub x_root: c_int,
    pub y_root: c_int,
    pub state: c_uint,
    pub keycode: c_uint,
    pub same_screen: c_int,
}

/// `XEvent`, sized like the C union so the library may read a full event
#[repr(C)]
pub union XEvent {
    pub key: XKeyEvent,
    pad: [c_long; 24],
}

impl XEvent {
    /// Synthesized key press on `display`
    pub fn key_press(display: *mut Display, keycode: u32, state: u32) -> Self {
        let mut event = XEvent { pad: [0; 24] };
        event.key = XKeyEvent {
            type_: KEY_PRESS,
            serial: 0,
            send_event: 0,
            display,
            window: 0,
            root: 0,
            subwindow: 0,
            time: 0,
            x: 0,
            y: 0,
            x_root: 0,
            y_root: 0,
            state,
            keycode,
            same_screen: 1,
        };
        event
    }

    /// Key event view
    pub fn as_key(&self) -> &XKeyEvent {
        // SAFETY: every XEvent built here starts as a key event
        unsafe { &self.key }
    }
}

type XOpenDisplayFn = unsafe extern "C" fn(*const c_char) -> *mut Display;
type XCloseDisplayFn = unsafe extern "C" fn(*mut Display) -> c_int;
type XSupportsLocaleFn = unsafe extern "C" fn() -> c_int;
type XSetLocaleModifiersFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type XOpenIMFn = unsafe extern "C" fn(*mut Display, *mut c_void, *mut c_char, *mut c_char) -> Xim;
type XCloseIMFn = unsafe extern "C" fn(Xim) -> c_int;
type XCreateICFn = unsafe extern "C" fn(Xim, ...) -> Xic;
type XDestroyICFn = unsafe extern "C" fn(Xic);
type Xutf8LookupStringFn =
    unsafe extern "C" fn(Xic, *mut XKeyEvent, *mut c_char, c_int, *mut KeySym, *mut c_int) -> c_int;

/// Loaded libX11 function table
pub struct Xlib {
    open_display: XOpenDisplayFn,
    close_display: XCloseDisplayFn,
    supports_locale: XSupportsLocaleFn,
    set_locale_modifiers: XSetLocaleModifiersFn,
    open_im: XOpenIMFn,
    close_im: XCloseIMFn,
    create_ic: XCreateICFn,
    destroy_ic: XDestroyICFn,
    utf8_lookup_string: Xutf8LookupStringFn,
    /// Keeps the function pointers above valid
    _lib: Library,
}

/// Process locale is set once; Xlib reads it when opening input methods
static LOCALE_INIT: Once = Once::new();

unsafe fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    Ok(*lib.get::<T>(name)?)
}

impl Xlib {
    /// Load libX11 and resolve the lookup entry points
    pub fn load() -> Result<Self> {
        let lib = unsafe { Library::new("libX11.so.6").or_else(|_| Library::new("libX11.so"))? };

        let xlib = unsafe {
            Self {
                open_display: symbol(&lib, b"XOpenDisplay\0")?,
                close_display: symbol(&lib, b"XCloseDisplay\0")?,
                supports_locale: symbol(&lib, b"XSupportsLocale\0")?,
                set_locale_modifiers: symbol(&lib, b"XSetLocaleModifiers\0")?,
                open_im: symbol(&lib, b"XOpenIM\0")?,
                close_im: symbol(&lib, b"XCloseIM\0")?,
                create_ic: symbol(&lib, b"XCreateIC\0")?,
                destroy_ic: symbol(&lib, b"XDestroyIC\0")?,
                utf8_lookup_string: symbol(&lib, b"Xutf8LookupString\0")?,
                _lib: lib,
            }
        };

        debug!("libX11 loaded");
        Ok(xlib)
    }

    /// Adopt the environment's LC_CTYPE and apply XMODIFIERS-style modifiers
    ///
    /// An empty `modifiers` string defers to the XMODIFIERS variable.
    pub fn prepare_locale(&self, modifiers: &CStr) -> Result<()> {
        LOCALE_INIT.call_once(|| {
            let locale = unsafe { libc::setlocale(libc::LC_CTYPE, c"".as_ptr()) };
            if locale.is_null() {
                info!("setlocale failed, keeping the C locale");
            } else {
                let name = unsafe { CStr::from_ptr(locale) };
                info!("locale: {}", name.to_string_lossy());
            }
        });

        if unsafe { (self.supports_locale)() } == 0 {
            return Err(TranslateError::LocaleUnsupported);
        }

        let applied = unsafe { (self.set_locale_modifiers)(modifiers.as_ptr()) };
        if applied.is_null() {
            debug!("XSetLocaleModifiers rejected {:?}", modifiers);
        }
        Ok(())
    }
}

impl super::xim::InputMethodApi for Xlib {
    fn open_display(&self, name: Option<&CStr>) -> *mut Display {
        let name = name.map_or(ptr::null(), CStr::as_ptr);
        unsafe { (self.open_display)(name) }
    }

    unsafe fn close_display(&self, display: *mut Display) {
        (self.close_display)(display);
    }

    unsafe fn open_im(&self, display: *mut Display) -> Xim {
        (self.open_im)(display, ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
    }

    unsafe fn close_im(&self, im: Xim) {
        (self.close_im)(im);
    }

    unsafe fn create_ic(&self, im: Xim, style: XimStyle) -> Xic {
        (self.create_ic)(
            im,
            XN_INPUT_STYLE.as_ptr(),
            style,
            ptr::null::<c_char>(),
        )
    }

    unsafe fn destroy_ic(&self, ic: Xic) {
        (self.destroy_ic)(ic);
    }

    unsafe fn utf8_lookup(
        &self,
        ic: Xic,
        event: &mut XEvent,
        buffer: &mut [u8],
        keysym: &mut KeySym,
        status: &mut c_int,
    ) -> c_int {
        let capacity = c_int::try_from(buffer.len()).unwrap_or(c_int::MAX);
        (self.utf8_lookup_string)(
            ic,
            event as *mut XEvent as *mut XKeyEvent,
            buffer.as_mut_ptr() as *mut c_char,
            capacity,
            keysym,
            status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_layout() {
        // XEvent is 24 longs in Xlib.h
        assert_eq!(std::mem::size_of::<XEvent>(), 24 * std::mem::size_of::<c_long>());
        assert!(std::mem::size_of::<XKeyEvent>() <= std::mem::size_of::<XEvent>());
    }

    #[test]
    fn test_key_press_event() {
        let event = XEvent::key_press(ptr::null_mut(), 38, 0x5);
        let key = event.as_key();
        assert_eq!(key.type_, KEY_PRESS);
        assert_eq!(key.keycode, 38);
        assert_eq!(key.state, 0x5);
        assert_eq!(key.same_screen, 1);
    }

    #[test]
    #[ignore]
    fn test_load_library() {
        // Requires libX11 on the system
        assert!(Xlib::load().is_ok());
    }
}
