use std::collections::HashSet;

use log::{debug, info, warn};
use winit::keyboard::KeyCode;

use super::events::PointerButton;
use crate::avatar::{Avatar, MovementIntent};
use crate::config::KeyBindings;
use crate::gfx::camera::CameraRig;

/// Pointer-capture change the host is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRequest {
    Acquire,
    Release,
}

/// Live keyboard state plus the pointer-capture lifecycle
///
/// Capture is never assumed: the router queues a [`CaptureRequest`], the host
/// takes it with [`InputRouter::take_capture_request`], applies it to the
/// window and reports the outcome through
/// [`InputRouter::pointer_capture_changed`]. Mouse look only runs while the
/// reported state is active.
#[derive(Debug, Clone)]
pub struct InputRouter {
    bindings: KeyBindings,
    pressed: HashSet<KeyCode>,
    capture_active: bool,
    awaiting_capture: bool,
    pending_request: Option<CaptureRequest>,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            pressed: HashSet::new(),
            capture_active: false,
            awaiting_capture: false,
            pending_request: None,
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn key_down(&mut self, code: KeyCode) {
        self.pressed.insert(code);
    }

    pub fn key_up(&mut self, code: KeyCode) {
        self.pressed.remove(&code);
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn pressed_count(&self) -> usize {
        self.pressed.len()
    }

    /// Sample the held keys as movement intent
    pub fn intent(&self) -> MovementIntent {
        let held = |code| self.pressed.contains(&code);
        MovementIntent {
            forward: held(self.bindings.forward),
            backward: held(self.bindings.backward),
            left: held(self.bindings.left),
            right: held(self.bindings.right),
            up: held(self.bindings.up),
            down: held(self.bindings.down),
        }
    }

    /// Handle a button press; returns `true` when capture was requested
    pub fn pointer_down(&mut self, button: PointerButton, over_surface: bool) -> bool {
        if button != self.bindings.look_button || !over_surface {
            return false;
        }
        if self.capture_active || self.awaiting_capture {
            return false;
        }
        debug!("Requesting pointer capture");
        self.awaiting_capture = true;
        self.pending_request = Some(CaptureRequest::Acquire);
        true
    }

    pub fn pointer_up(&mut self, button: PointerButton) {
        if button != self.bindings.look_button {
            return;
        }
        if self.pending_request == Some(CaptureRequest::Acquire) {
            // Host never saw the request
            self.pending_request = None;
            self.awaiting_capture = false;
        } else if self.capture_active || self.awaiting_capture {
            self.pending_request = Some(CaptureRequest::Release);
        }
    }

    /// Next capture change for the host to apply, if any
    pub fn take_capture_request(&mut self) -> Option<CaptureRequest> {
        self.pending_request.take()
    }

    /// Host report of the current capture state
    pub fn pointer_capture_changed(&mut self, active: bool) {
        if self.awaiting_capture && !active {
            warn!("Pointer capture was not granted; mouse look stays inactive");
        } else if active != self.capture_active {
            info!(
                "Pointer capture {}",
                if active { "acquired" } else { "released" }
            );
        }
        self.awaiting_capture = false;
        self.capture_active = active;
    }

    pub fn is_capture_active(&self) -> bool {
        self.capture_active
    }

    /// Forward a raw mouse delta to the rig while capture is active
    ///
    /// Returns whether the delta was applied.
    pub fn route_motion(
        &self,
        dx: f32,
        dy: f32,
        rig: &mut CameraRig,
        avatar: &mut Avatar,
    ) -> bool {
        if !self.capture_active {
            return false;
        }
        rig.apply_orientation_delta(avatar, dx, dy);
        true
    }

    /// Drop all held keys, e.g. after the window loses focus
    pub fn release_all(&mut self) {
        self.pressed.clear();
        if self.capture_active {
            self.pending_request = Some(CaptureRequest::Release);
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}
