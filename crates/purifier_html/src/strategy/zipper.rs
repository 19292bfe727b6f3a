//! A list zipper: a cursor over a list that allows cheap edits around the cursor
//!
//! The element under the cursor is held by the caller, outside of the zipper. `front` holds the
//! elements before the cursor in order, `back` holds the elements after the cursor in reverse
//! order, so the next element is at the end.

#[derive(Debug, Default)]
pub(crate) struct Zipper<T> {
    pub front: Vec<T>,
    pub back: Vec<T>,
}

impl<T> Zipper<T> {
    /// Creates a zipper with the cursor on the first element
    pub fn from_vec(mut items: Vec<T>) -> (Self, Option<T>) {
        items.reverse();
        let current = items.pop();
        (
            Self {
                front: vec![],
                back: items,
            },
            current,
        )
    }

    /// Closes the zipper, returning all elements in order
    pub fn into_vec(mut self, current: Option<T>) -> Vec<T> {
        self.front.extend(current);
        self.front.extend(self.back.into_iter().rev());
        self.front
    }

    /// Moves the cursor forward
    pub fn next(&mut self, current: Option<T>) -> Option<T> {
        self.front.extend(current);
        self.back.pop()
    }

    /// Moves the cursor backward
    pub fn prev(&mut self, current: Option<T>) -> Option<T> {
        self.back.extend(current);
        self.front.pop()
    }

    /// Drops the current element, moving the cursor to the next one
    pub fn delete(&mut self) -> Option<T> {
        self.back.pop()
    }

    /// Puts an element in front of the current one, which moves to the next position. The new
    /// element becomes the current one.
    pub fn insert_before(&mut self, current: T, item: T) -> T {
        self.back.push(current);
        item
    }

    /// Drops the current element and `extra` elements after it, putting the replacement in
    /// their place. The cursor ends up on the first replacement, or on the element after the
    /// removed ones when there is no replacement.
    pub fn splice(&mut self, extra: usize, replacement: Vec<T>) -> Option<T> {
        for _ in 0..extra {
            self.back.pop();
        }
        let mut replacement = replacement.into_iter();
        match replacement.next() {
            Some(first) => {
                self.back.extend(replacement.rev());
                Some(first)
            }
            None => self.back.pop(),
        }
    }
}
