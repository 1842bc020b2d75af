//! Editor mode state machine.
//!
//! ```text
//!  Scroll --confirm--> Edit --confirm--> Change
//!  Scroll <---back---- Edit <---back---- Change
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditorMode {
    /// Read-only view streamed from the backing file
    #[default]
    Scroll,
    /// A bounded window of the file is resident for repeated edits
    Edit,
    /// Byte under the cursor is stepped up/down with the direction keys
    Change,
}

impl EditorMode {
    /// Mode reached by the confirm action. `None` when already in the innermost mode.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Scroll => Some(Self::Edit),
            Self::Edit => Some(Self::Change),
            Self::Change => None,
        }
    }

    /// Mode reached by the back action. `None` when already in the outermost mode.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Scroll => None,
            Self::Edit => Some(Self::Scroll),
            Self::Change => Some(Self::Edit),
        }
    }

    /// Whether an edit window is resident in this mode.
    #[must_use]
    pub const fn is_editing(self) -> bool {
        matches!(self, Self::Edit | Self::Change)
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scroll => "Scroll",
            Self::Edit => "Edit",
            Self::Change => "Change",
        };
        write!(f, "{name}")
    }
}

/// Direction key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Applies the Change mode step bound to this direction to `byte`.
    ///
    /// Up/Down step the value by one, Right/Left by 0x10. Returns `None` when the
    /// step would wrap around.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::Direction;
    ///
    /// assert_eq!(Direction::Up.step(0x41), Some(0x42));
    /// assert_eq!(Direction::Right.step(0xF0), None);
    /// ```
    #[must_use]
    pub const fn step(self, byte: u8) -> Option<u8> {
        match self {
            Self::Up if byte < 0xFF => Some(byte + 1),
            Self::Down if byte > 0x00 => Some(byte - 1),
            Self::Right if byte < 0xF0 => Some(byte + 0x10),
            Self::Left if byte > 0x0F => Some(byte - 0x10),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_transitions() {
        assert_eq!(EditorMode::Scroll.next(), Some(EditorMode::Edit));
        assert_eq!(EditorMode::Edit.next(), Some(EditorMode::Change));
        assert_eq!(EditorMode::Change.next(), None);

        assert_eq!(EditorMode::Change.previous(), Some(EditorMode::Edit));
        assert_eq!(EditorMode::Edit.previous(), Some(EditorMode::Scroll));
        assert_eq!(EditorMode::Scroll.previous(), None);
    }

    #[test]
    fn test_change_steps_do_not_wrap() {
        assert_eq!(Direction::Up.step(0xFF), None);
        assert_eq!(Direction::Down.step(0x00), None);
        assert_eq!(Direction::Down.step(0x01), Some(0x00));
        assert_eq!(Direction::Right.step(0xEF), Some(0xFF));
        assert_eq!(Direction::Left.step(0x0F), None);
        assert_eq!(Direction::Left.step(0x10), Some(0x00));
    }
}
