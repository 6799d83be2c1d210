//! Pointer movement and click injection.
//!
//! The core talks to two small traits, [`CursorSink`] and [`ActionSink`].
//! [`X11Controller`] implements both on X11: the pointer is moved with
//! `WarpPointer` and clicks and key chords are synthesized through the XTEST
//! extension.

use crate::{
    error::{Error, Result},
    gaze_mapper::ScreenBounds,
    utils::safe_cast::f64_to_i16_clamp,
};
use log::{debug, info};
use x11rb::{
    connection::Connection,
    protocol::{
        xproto::{
            ConnectionExt, Keycode, Keysym, Screen, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT,
            KEY_PRESS_EVENT, KEY_RELEASE_EVENT,
        },
        xtest::ConnectionExt as XTestConnectionExt,
    },
    rust_connection::RustConnection,
    CURRENT_TIME,
};

/// Receives absolute pointer positions
pub trait CursorSink {
    /// Move the pointer to an absolute screen position
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the move.
    fn move_to(&mut self, x: f64, y: f64) -> Result<()>;

    /// Size of the screen the pointer lives on
    fn screen_bounds(&self) -> ScreenBounds;
}

/// Executes click gestures
pub trait ActionSink {
    /// Primary button click at the current pointer position
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the synthetic input.
    fn click(&mut self) -> Result<()>;

    /// Secondary compound key action (close the focused window)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the synthetic input.
    fn close_window(&mut self) -> Result<()>;
}

const LEFT_BUTTON: u8 = 1;
const XK_CONTROL_L: Keysym = 0xffe3;
const XK_LOWER_W: Keysym = 0x0077;

/// X11 pointer and input injection backend
pub struct X11Controller {
    connection: RustConnection,
    screen: Screen,
    control_keycode: Keycode,
    w_keycode: Keycode,
}

impl X11Controller {
    /// Connect to the X server and resolve the keys used for actions
    ///
    /// # Errors
    ///
    /// Returns `Error::InputInjection` if there is no display, the XTEST
    /// extension is missing, or the keyboard map lacks the needed keys.
    pub fn new() -> Result<Self> {
        info!("Initializing X11 input controller");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| Error::InputInjection(format!("Failed to connect to X11: {e}")))?;

        let screen = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::InputInjection("Failed to get screen".to_string()))?
            .clone();

        connection
            .xtest_get_version(2, 2)
            .map_err(|e| Error::InputInjection(format!("Failed to query XTEST: {e}")))?
            .reply()
            .map_err(|e| Error::InputInjection(format!("XTEST extension unavailable: {e}")))?;

        let control_keycode = Self::keycode_for(&connection, XK_CONTROL_L)?;
        let w_keycode = Self::keycode_for(&connection, XK_LOWER_W)?;

        info!(
            "Connected to X11 display, screen: {}x{}",
            screen.width_in_pixels, screen.height_in_pixels
        );

        Ok(Self {
            connection,
            screen,
            control_keycode,
            w_keycode,
        })
    }

    /// Find the first keycode producing `keysym` in the current keyboard map
    fn keycode_for(connection: &RustConnection, keysym: Keysym) -> Result<Keycode> {
        let setup = connection.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let count = max.saturating_sub(min).saturating_add(1);

        let mapping = connection
            .get_keyboard_mapping(min, count)
            .map_err(|e| Error::InputInjection(format!("Failed to request keyboard mapping: {e}")))?
            .reply()
            .map_err(|e| Error::InputInjection(format!("Failed to read keyboard mapping: {e}")))?;

        let per_code = usize::from(mapping.keysyms_per_keycode.max(1));
        mapping
            .keysyms
            .chunks(per_code)
            .position(|syms| syms.contains(&keysym))
            .and_then(|offset| u8::try_from(offset).ok())
            .and_then(|offset| min.checked_add(offset))
            .ok_or_else(|| Error::InputInjection(format!("No keycode for keysym {keysym:#x}")))
    }

    fn fake_input(&self, event_type: u8, detail: u8) -> Result<()> {
        self.connection
            .xtest_fake_input(event_type, detail, CURRENT_TIME, self.screen.root, 0, 0, 0)
            .map_err(|e| Error::InputInjection(format!("Failed to send fake input: {e}")))?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.connection
            .flush()
            .map_err(|e| Error::InputInjection(format!("Failed to flush connection: {e}")))
    }

    /// Screen size of the root window
    #[must_use]
    pub fn screen_bounds(&self) -> ScreenBounds {
        ScreenBounds::new(
            f64::from(self.screen.width_in_pixels),
            f64::from(self.screen.height_in_pixels),
        )
    }

    /// Warp the pointer, clamping to the visible screen
    ///
    /// # Errors
    ///
    /// Returns `Error::InputInjection` if the request cannot be sent.
    pub fn warp(&self, x: f64, y: f64) -> Result<()> {
        let x = f64_to_i16_clamp(x, self.screen.width_in_pixels.saturating_sub(1));
        let y = f64_to_i16_clamp(y, self.screen.height_in_pixels.saturating_sub(1));

        debug!("Setting cursor position to ({}, {})", x, y);

        self.connection
            .warp_pointer(x11rb::NONE, self.screen.root, 0, 0, 0, 0, x, y)
            .map_err(|e| Error::InputInjection(format!("Failed to warp pointer: {e}")))?;
        self.flush()
    }

    /// Press and release the left button
    ///
    /// # Errors
    ///
    /// Returns `Error::InputInjection` if the request cannot be sent.
    pub fn left_click(&self) -> Result<()> {
        self.fake_input(BUTTON_PRESS_EVENT, LEFT_BUTTON)?;
        self.fake_input(BUTTON_RELEASE_EVENT, LEFT_BUTTON)?;
        self.flush()
    }

    /// Type Ctrl+W
    ///
    /// # Errors
    ///
    /// Returns `Error::InputInjection` if the request cannot be sent.
    pub fn ctrl_w(&self) -> Result<()> {
        self.fake_input(KEY_PRESS_EVENT, self.control_keycode)?;
        self.fake_input(KEY_PRESS_EVENT, self.w_keycode)?;
        self.fake_input(KEY_RELEASE_EVENT, self.w_keycode)?;
        self.fake_input(KEY_RELEASE_EVENT, self.control_keycode)?;
        self.flush()
    }
}

// Implemented on shared references so one connection can serve as both
// the cursor sink and the action sink of a session.
impl CursorSink for &X11Controller {
    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.warp(x, y)
    }

    fn screen_bounds(&self) -> ScreenBounds {
        X11Controller::screen_bounds(self)
    }
}

impl ActionSink for &X11Controller {
    fn click(&mut self) -> Result<()> {
        self.left_click()
    }

    fn close_window(&mut self) -> Result<()> {
        self.ctrl_w()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Requires X11 display"]
    fn test_controller_creation() {
        match X11Controller::new() {
            Ok(controller) => {
                let bounds = controller.screen_bounds();
                assert!(bounds.width > 0.0 && bounds.height > 0.0);
            }
            Err(e) => println!("Expected error in headless environment: {e}"),
        }
    }

    #[test]
    fn test_keysyms() {
        assert_eq!(XK_LOWER_W, u32::from(b'w'));
        assert_eq!(XK_CONTROL_L, 0xffe3);
    }
}
