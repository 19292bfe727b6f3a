use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};

/// Location holds the position of a token in the data source
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Line number, starting with 1
    pub line: usize,
    /// Column number, starting with 1
    pub column: usize,
    /// Byte offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    /// Default to line 1, column 1
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    /// Create a new Location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// LocationHandler keeps track of line/column locations while a source is read forward
pub struct LocationHandler {
    /// The current location in the source
    pub cur_location: Location,
    /// List of all line number -> col size mappings
    line_endings: HashMap<usize, usize>,
}

impl Default for LocationHandler {
    fn default() -> Self {
        Self::new(Location::default())
    }
}

impl LocationHandler {
    /// Create a new LocationHandler. Start location can be set in case the source does
    /// not start at 1:1
    pub fn new(start_location: Location) -> Self {
        Self {
            cur_location: start_location,
            line_endings: HashMap::new(),
        }
    }

    /// Sets the current location to the given location
    pub fn set(&mut self, loc: Location) {
        self.cur_location = loc;
    }

    /// Will increase the current location based on the given character. Offsets are counted
    /// in bytes, columns in characters.
    pub fn inc(&mut self, ch: char) {
        if ch == '\n' {
            self.line_endings
                .insert(self.cur_location.line, self.cur_location.column);

            self.cur_location.line += 1;
            self.cur_location.column = 1;
        } else {
            self.cur_location.column += 1;
        }
        self.cur_location.offset += ch.len_utf8();
    }

    /// Advances over every character of the given string
    pub fn inc_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.inc(ch);
        }
    }

    /// Returns the number of columns on a line that has already been passed
    pub fn line_width(&self, line: usize) -> Option<usize> {
        self.line_endings.get(&line).copied()
    }
}
