use cgmath::Vector2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Mouse button identifiers, indexed like DOM buttons (0 = primary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
    Other(u16),
}

impl PointerButton {
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => PointerButton::Primary,
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            other => PointerButton::Other(other),
        }
    }

    pub fn index(&self) -> u16 {
        match self {
            PointerButton::Primary => 0,
            PointerButton::Middle => 1,
            PointerButton::Secondary => 2,
            PointerButton::Other(index) => *index,
        }
    }
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Middle => PointerButton::Middle,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Back => PointerButton::Other(3),
            MouseButton::Forward => PointerButton::Other(4),
            MouseButton::Other(index) => PointerButton::Other(index),
        }
    }
}

/// Host-agnostic input event
///
/// Pointer positions are device pixels relative to the window's client area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    PointerDown {
        button: PointerButton,
        position: Vector2<f32>,
        /// Whether the press landed on the render surface
        over_surface: bool,
    },
    PointerMove {
        position: Vector2<f32>,
    },
    PointerUp {
        button: PointerButton,
        position: Vector2<f32>,
    },
    /// Raw relative motion, unaffected by cursor capture or clamping
    MouseMotion {
        dx: f32,
        dy: f32,
    },
}

/// Discriminant of [`InputEvent`] used to key listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEventKind {
    KeyDown,
    KeyUp,
    PointerDown,
    PointerMove,
    PointerUp,
    MouseMotion,
}

impl InputEvent {
    pub fn kind(&self) -> InputEventKind {
        match self {
            InputEvent::KeyDown(_) => InputEventKind::KeyDown,
            InputEvent::KeyUp(_) => InputEventKind::KeyUp,
            InputEvent::PointerDown { .. } => InputEventKind::PointerDown,
            InputEvent::PointerMove { .. } => InputEventKind::PointerMove,
            InputEvent::PointerUp { .. } => InputEventKind::PointerUp,
            InputEvent::MouseMotion { .. } => InputEventKind::MouseMotion,
        }
    }
}

/// Client rectangle of the render surface in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the window origin
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn contains(&self, position: Vector2<f32>) -> bool {
        position.x >= self.x
            && position.y >= self.y
            && position.x < self.x + self.width
            && position.y < self.y + self.height
    }

    /// Map a pixel position to normalized device coordinates
    ///
    /// X grows right and Y grows up, both in `[-1, 1]` across the rectangle.
    /// Returns `None` for a degenerate rectangle.
    pub fn to_ndc(&self, position: Vector2<f32>) -> Option<Vector2<f32>> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vector2::new(
            (position.x - self.x) / self.width * 2.0 - 1.0,
            -(position.y - self.y) / self.height * 2.0 + 1.0,
        ))
    }
}
