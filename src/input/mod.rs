//! # Input Routing
//!
//! Host-agnostic input events, a listener registry keyed by event kind, and
//! the [`InputRouter`] that owns live key state and the pointer-capture
//! request/report cycle used for mouse look.

pub mod dispatcher;
pub mod events;
pub mod router;

pub use dispatcher::{EventDispatcher, ListenerId};
pub use events::{InputEvent, InputEventKind, PointerButton, SurfaceRect};
pub use router::{CaptureRequest, InputRouter};
