//! Input handling module
//!
//! Backend-independent device state, fed once per tick by an input source.

mod state;

pub use state::{ButtonState, Input, InputEvent, KeyCode, MouseButton};
