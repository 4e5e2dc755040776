#![forbid(unsafe_code)]

//! Keyboard navigation for the carousel.
//!
//! Keys map to a small set of [`NavCommand`]s. Left and right follow the
//! visual direction, so they swap meaning when the carousel is mirrored;
//! Tab always moves forward in task order.

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const NONE  = 0b000;
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Tab,
    Left,
    Right,
    /// Backspace-style delete.
    Delete,
    ForwardDelete,
    /// The keypad decimal key, which doubles as delete with Alt held.
    NumpadDot,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    /// Snap by this many pages, wrapping around the ends.
    Relative(i32),
    /// Dismiss the page being settled on, removing its task.
    DismissCurrent,
}

impl NavCommand {
    /// The command for a key press, or `None` if the key is not handled.
    pub fn from_key(key: Key, modifiers: KeyModifiers, mirrored: bool) -> Option<Self> {
        let visual = |forward: bool| {
            if forward != mirrored { 1 } else { -1 }
        };
        match key {
            Key::Tab => Some(NavCommand::Relative(
                if modifiers.contains(KeyModifiers::SHIFT) { -1 } else { 1 },
            )),
            Key::Right => Some(NavCommand::Relative(visual(true))),
            Key::Left => Some(NavCommand::Relative(visual(false))),
            Key::Delete | Key::ForwardDelete => Some(NavCommand::DismissCurrent),
            Key::NumpadDot if modifiers.contains(KeyModifiers::ALT) => {
                Some(NavCommand::DismissCurrent)
            }
            Key::NumpadDot | Key::Other(_) => None,
        }
    }
}
