//! Input handling

use glam::Vec2;
use rustc_hash::FxHashSet;

/// Keyboard key, independent of any windowing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable key, by its lowercase character
    Char(char),
    Escape,
    Space,
    Enter,
    Tab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Shift,
    Control,
    Alt,
    /// Function key F1..F24
    F(u8),
    /// Backend-specific scan code
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// A raw device event as delivered by an input source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: KeyCode, state: ButtonState },
    MouseButton { button: MouseButton, state: ButtonState },
    CursorMoved(Vec2),
    MouseMotion(Vec2),
    Scroll(Vec2),
}

impl InputEvent {
    pub fn key_pressed(key: KeyCode) -> Self {
        Self::Key {
            key,
            state: ButtonState::Pressed,
        }
    }

    pub fn key_released(key: KeyCode) -> Self {
        Self::Key {
            key,
            state: ButtonState::Released,
        }
    }
}

/// Input state manager
#[derive(Debug, Default)]
pub struct Input {
    /// Currently pressed keys
    pressed_keys: FxHashSet<KeyCode>,
    /// Keys that were just pressed this frame
    just_pressed_keys: FxHashSet<KeyCode>,
    /// Keys that were just released this frame
    just_released_keys: FxHashSet<KeyCode>,
    pressed_mouse_buttons: FxHashSet<MouseButton>,
    just_pressed_mouse_buttons: FxHashSet<MouseButton>,
    just_released_mouse_buttons: FxHashSet<MouseButton>,
    mouse_position: Vec2,
    /// Mouse movement delta this frame
    mouse_delta: Vec2,
    /// Scroll wheel delta this frame
    scroll_delta: Vec2,
}

impl Input {
    /// Create a new input manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state; called before the input source is polled
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_released_keys.clear();
        self.just_pressed_mouse_buttons.clear();
        self.just_released_mouse_buttons.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn process_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key { key, state } => self.process_keyboard(key, state),
            InputEvent::MouseButton { button, state } => self.process_mouse_button(button, state),
            InputEvent::CursorMoved(position) => self.process_mouse_motion(position),
            InputEvent::MouseMotion(delta) => self.process_mouse_delta(delta),
            InputEvent::Scroll(delta) => self.process_scroll(delta),
        }
    }

    /// Process a keyboard event
    pub fn process_keyboard(&mut self, key_code: KeyCode, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_keys.insert(key_code) {
                    self.just_pressed_keys.insert(key_code);
                }
            }
            ButtonState::Released => {
                self.pressed_keys.remove(&key_code);
                self.just_released_keys.insert(key_code);
            }
        }
    }

    /// Process a mouse button event
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.pressed_mouse_buttons.insert(button) {
                    self.just_pressed_mouse_buttons.insert(button);
                }
            }
            ButtonState::Released => {
                self.pressed_mouse_buttons.remove(&button);
                self.just_released_mouse_buttons.insert(button);
            }
        }
    }

    /// Process an absolute cursor position
    pub fn process_mouse_motion(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    /// Process raw mouse delta (for first-person camera)
    pub fn process_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn process_scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.just_released_keys.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_mouse_buttons.contains(&button)
    }

    pub fn is_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_mouse_buttons.contains(&button)
    }

    pub fn is_mouse_button_just_released(&self, button: MouseButton) -> bool {
        self.just_released_mouse_buttons.contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Get mouse movement delta this frame
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Get scroll wheel delta this frame
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}
