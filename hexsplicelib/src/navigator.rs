//! Cursor and viewport arithmetic.
//!
//! The viewport shows `lines_per_page` rows of 16 bytes starting at row
//! `row_offset_index`. The cursor is `column` bytes into that page, so the
//! absolute offset is `row_offset_index * 16 + column`.
//!
//! Moves are clamped to a half-open [`Bounds`] range: the whole file in Scroll
//! mode, the resident edit window in Edit mode.

use crate::config::ByteGroup;
use crate::error::HexSpliceErrorKind;
use crate::mode::Direction;
use std::ops::Range;

pub const BYTES_PER_ROW: usize = 0x10;

/// Legal cursor range `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub lower: usize,
    pub upper: usize,
}

impl Bounds {
    #[must_use]
    pub const fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    #[must_use]
    pub const fn whole(len: usize) -> Self {
        Self::new(0, len)
    }

    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.lower && offset < self.upper
    }
}

/// Result of a cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// The move would leave the bounds
    Blocked,
    /// The cursor moved within the page
    Moved,
    /// The page origin moved, the display buffer must be refetched
    Scrolled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    row_offset_index: usize,
    column: usize,
    lines_per_page: usize,
    selection: ByteGroup,
}

impl Navigator {
    #[must_use]
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            row_offset_index: 0,
            column: 0,
            lines_per_page: lines_per_page.max(1),
            selection: ByteGroup::default(),
        }
    }

    #[must_use]
    pub const fn bytes_per_page(&self) -> usize {
        self.lines_per_page * BYTES_PER_ROW
    }

    #[must_use]
    pub const fn row_offset_index(&self) -> usize {
        self.row_offset_index
    }

    #[must_use]
    pub const fn column(&self) -> usize {
        self.column
    }

    /// Absolute offset of the cursor.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.row_offset_index * BYTES_PER_ROW + self.column
    }

    /// Absolute offset of the first byte on the page.
    #[must_use]
    pub const fn page_origin(&self) -> usize {
        self.row_offset_index * BYTES_PER_ROW
    }

    /// Bytes on the current page that lie within `bounds`.
    #[must_use]
    pub fn page_range(&self, bounds: Bounds) -> Range<usize> {
        let start = self.page_origin().max(bounds.lower);
        let end = (self.page_origin() + self.bytes_per_page()).min(bounds.upper);
        start..end.max(start)
    }

    #[must_use]
    pub const fn selection(&self) -> ByteGroup {
        self.selection
    }

    pub const fn set_selection(&mut self, selection: ByteGroup) {
        self.selection = selection;
    }

    pub fn move_cursor(&mut self, direction: Direction, bounds: Bounds) -> Movement {
        match direction {
            Direction::Up => self.move_up(bounds),
            Direction::Down => self.move_down(bounds),
            Direction::Left => self.move_left(bounds),
            Direction::Right => self.move_right(bounds),
        }
    }

    pub fn move_up(&mut self, bounds: Bounds) -> Movement {
        if self.offset() < bounds.lower + BYTES_PER_ROW {
            return Movement::Blocked;
        }
        if self.column >= BYTES_PER_ROW {
            self.column -= BYTES_PER_ROW;
            Movement::Moved
        } else {
            self.row_offset_index -= 1;
            Movement::Scrolled
        }
    }

    pub fn move_down(&mut self, bounds: Bounds) -> Movement {
        if self.offset() + BYTES_PER_ROW >= bounds.upper {
            return Movement::Blocked;
        }
        if self.column >= self.bytes_per_page() - BYTES_PER_ROW {
            self.row_offset_index += 1;
            Movement::Scrolled
        } else {
            self.column += BYTES_PER_ROW;
            Movement::Moved
        }
    }

    pub fn move_left(&mut self, bounds: Bounds) -> Movement {
        if self.offset() <= bounds.lower {
            return Movement::Blocked;
        }
        if self.column > 0 {
            self.column -= 1;
            Movement::Moved
        } else {
            self.column = BYTES_PER_ROW - 1;
            self.row_offset_index -= 1;
            Movement::Scrolled
        }
    }

    pub fn move_right(&mut self, bounds: Bounds) -> Movement {
        if self.offset() + 1 >= bounds.upper {
            return Movement::Blocked;
        }
        if self.column < self.bytes_per_page() - 1 {
            self.column += 1;
            Movement::Moved
        } else {
            self.column = self.bytes_per_page() - BYTES_PER_ROW;
            self.row_offset_index += 1;
            Movement::Scrolled
        }
    }

    /// Places the cursor on `offset`.
    ///
    /// Offsets on the first page keep the page at row 0. Further offsets end up on
    /// the last row of the page, with the page origin shifted up by whole rows. The
    /// origin never moves below `bounds.lower`.
    ///
    /// # Errors
    /// Returns `OutOfBounds` if `offset` is not within `bounds`.
    ///
    /// # Example
    /// ```
    /// use hexsplicelib::{Bounds, Navigator};
    ///
    /// let mut nav = Navigator::new(0xD);
    /// nav.jump_to(0x123, Bounds::whole(0x1000)).unwrap();
    /// assert_eq!(nav.row_offset_index(), 6);
    /// assert_eq!(nav.column(), 0xC3);
    /// assert_eq!(nav.offset(), 0x123);
    /// ```
    pub fn jump_to(&mut self, offset: usize, bounds: Bounds) -> Result<(), HexSpliceErrorKind> {
        if !bounds.contains(offset) {
            return Err(HexSpliceErrorKind::OutOfBounds {
                offset,
                size: 1,
                len: bounds.upper,
            });
        }

        let bpp = self.bytes_per_page();
        if offset < bpp {
            self.row_offset_index = 0;
            self.column = offset;
        } else {
            self.row_offset_index = 1 + (offset - bpp) / BYTES_PER_ROW;
            self.column = (bpp - BYTES_PER_ROW) + offset % BYTES_PER_ROW;
        }

        if self.page_origin() < bounds.lower {
            self.row_offset_index = bounds.lower / BYTES_PER_ROW;
            self.column = offset - self.page_origin();
        }
        Ok(())
    }

    /// Re-derives a valid cursor after the file length changed to `size`.
    ///
    /// An empty file resets to the origin. Otherwise the cursor lands on the last
    /// byte, on a single page for files shorter than a page and on the last row of
    /// the page otherwise.
    pub fn reset_after_splice(&mut self, size: usize) {
        if size == 0 {
            self.row_offset_index = 0;
            self.column = 0;
            return;
        }
        // The last byte is always within the whole-file bounds.
        let _ = self.jump_to(size - 1, Bounds::whole(size));
    }
}
