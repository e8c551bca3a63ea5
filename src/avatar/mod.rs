//! # Avatar
//!
//! The controllable first-person entity whose position and orientation drive
//! the camera, together with the integrator that turns directional intent into
//! damped motion.
//!
//! - [`Avatar`] - Location, yaw, velocity and movement parameters
//! - [`MovementIntegrator`] - Semi-implicit Euler step with exponential damping
//! - [`MovementIntent`] - Six independent directional booleans

pub mod avatar;
pub mod movement;

pub use avatar::Avatar;
pub use movement::{MovementIntegrator, MovementIntent};
