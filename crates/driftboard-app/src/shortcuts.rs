//! Keyboard and pointer bindings understood by a board session.

/// A keyboard or pointer binding.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, shift: bool, description: &'static str) -> Self {
        Self {
            key,
            shift,
            description,
        }
    }

    /// Format for display, e.g. "Shift+Drag".
    pub fn format(&self) -> String {
        if self.shift {
            format!("Shift+{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Registry of all bindings.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Wheel", false, "Zoom around the pointer"),
            Shortcut::new("+", false, "Zoom in around the pointer"),
            Shortcut::new("-", false, "Zoom out around the pointer"),
            Shortcut::new("0", false, "Reset zoom and pan"),
            Shortcut::new("Drag", false, "Move element, or pan on empty canvas"),
            Shortcut::new("Middle Drag", false, "Pan"),
            Shortcut::new("Drag", true, "Resize without keeping aspect ratio"),
            Shortcut::new("Delete", false, "Delete selected element"),
            Shortcut::new("Backspace", false, "Delete selected element"),
            Shortcut::new("Escape", false, "Deselect"),
        ]
    }

    /// Help text listing every binding.
    pub fn help_text() -> String {
        let mut out = String::from("Bindings:\n");
        for shortcut in Self::all() {
            out.push_str(&format!("  {:20} {}\n", shortcut.format(), shortcut.description));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftboard_core::Key;

    #[test]
    fn test_format() {
        assert_eq!(Shortcut::new("Drag", true, "").format(), "Shift+Drag");
        assert_eq!(Shortcut::new("Escape", false, "").format(), "Escape");
    }

    #[test]
    fn test_listed_keys_are_recognized() {
        for name in ["+", "-", "0", "Delete", "Backspace", "Escape"] {
            assert!(ShortcutRegistry::all().iter().any(|s| s.key == name));
            assert_ne!(Key::from_name(name), Key::Other, "{name}");
        }
    }
}
