//! Raw input events and the pointer/modifier state derived from them.

use crate::geometry::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Keys the board reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Shift,
    Escape,
    Delete,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Other,
}

impl Key {
    /// Map a key name as reported by the platform.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Shift" | "ShiftLeft" | "ShiftRight" => Key::Shift,
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Backspace" => Key::Delete,
            "+" | "=" => Key::ZoomIn,
            "-" | "_" => Key::ZoomOut,
            "0" => Key::ResetZoom,
            _ => Key::Other,
        }
    }
}

/// A raw device event in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
    },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: MouseButton,
    },
    KeyDown {
        key: String,
    },
    KeyUp {
        key: String,
    },
    /// The view was resized to the given pixel size.
    Resize {
        width: f64,
        height: f64,
    },
}

/// Pointer and key state tracked across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Last known pointer position in screen coordinates.
    pointer_position: Option<Point>,
    pressed_buttons: HashSet<MouseButton>,
    pressed_keys: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_position(&self) -> Option<Point> {
        self.pointer_position
    }

    /// Record a new pointer position, returning the movement since the last.
    pub fn move_pointer(&mut self, position: Point) -> Vec2 {
        let delta = self
            .pointer_position
            .map(|prev| position - prev)
            .unwrap_or(Vec2::ZERO);
        self.pointer_position = Some(position);
        delta
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.pressed_buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.pressed_buttons.remove(&button);
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Returns `true` if the key was not already held.
    pub fn press_key(&mut self, key: Key) -> bool {
        self.pressed_keys.insert(key)
    }

    pub fn release_key(&mut self, key: Key) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_delta() {
        let mut input = InputState::new();
        assert_eq!(input.pointer_position(), None);
        assert_eq!(input.move_pointer(Point::new(10.0, 10.0)), Vec2::ZERO);
        assert_eq!(input.move_pointer(Point::new(15.0, 7.0)), Vec2::new(5.0, -3.0));
        assert_eq!(input.pointer_position(), Some(Point::new(15.0, 7.0)));
    }

    #[test]
    fn test_key_repeat_detected() {
        let mut input = InputState::new();
        assert!(input.press_key(Key::Shift));
        assert!(!input.press_key(Key::Shift));
        assert!(input.is_key_down(Key::Shift));
        input.release_key(Key::Shift);
        assert!(!input.is_key_down(Key::Shift));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("ShiftLeft"), Key::Shift);
        assert_eq!(Key::from_name("Backspace"), Key::Delete);
        assert_eq!(Key::from_name("="), Key::ZoomIn);
        assert_eq!(Key::from_name("q"), Key::Other);
    }

    #[test]
    fn test_event_json() {
        let event: InputEvent =
            serde_json::from_str(r#"{"type":"pointer_down","x":1,"y":2}"#).unwrap();
        assert_eq!(
            event,
            InputEvent::PointerDown {
                x: 1.0,
                y: 2.0,
                button: MouseButton::Left
            }
        );
        let event: InputEvent =
            serde_json::from_str(r#"{"type":"key_down","key":"Shift"}"#).unwrap();
        assert_eq!(event, InputEvent::KeyDown { key: "Shift".to_string() });
    }
}
