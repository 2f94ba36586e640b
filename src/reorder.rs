//! Index-based relocation shared by the photo and video lists.
//!
//! Drag gestures and the up/down arrow controls both reduce to a single
//! `(from, to)` move. Moves never touch the caller's slice; they hand back a
//! fresh ordering so an aborted move leaves the caller's copy intact.

use crate::error::ReorderError;

/// Outcome of a finished drag gesture. A drag dropped outside any list has
/// no destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropResult {
    pub source_index: usize,
    pub destination: Option<usize>,
}

impl DropResult {
    pub fn new(source_index: usize, destination: Option<usize>) -> Self {
        Self {
            source_index,
            destination,
        }
    }
}

/// Remove the element at `from` and insert it at `to` of the shortened list.
pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Result<Vec<T>, ReorderError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::IndexOutOfRange { index, len });
        }
    }

    let mut result = items.to_vec();
    if from != to {
        let moved = result.remove(from);
        result.insert(to, moved);
    }
    Ok(result)
}

/// Apply a drag result. Cancelled drags and drops onto the source slot return
/// `None`, meaning the ordering is unchanged.
pub fn apply_drop<T: Clone>(
    items: &[T],
    drop: DropResult,
) -> Result<Option<Vec<T>>, ReorderError> {
    match drop.destination {
        None => Ok(None),
        Some(to) if to == drop.source_index => Ok(None),
        Some(to) => move_item(items, drop.source_index, to).map(Some),
    }
}

fn check_index<T>(items: &[T], index: usize) -> Result<(), ReorderError> {
    if index >= items.len() {
        return Err(ReorderError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }
    Ok(())
}

/// Move one position towards the front. No-op for the first element.
pub fn move_up<T: Clone>(items: &[T], index: usize) -> Result<Option<Vec<T>>, ReorderError> {
    check_index(items, index)?;
    if index == 0 {
        return Ok(None);
    }
    move_item(items, index, index - 1).map(Some)
}

/// Move one position towards the back. No-op for the last element.
pub fn move_down<T: Clone>(items: &[T], index: usize) -> Result<Option<Vec<T>>, ReorderError> {
    check_index(items, index)?;
    if index + 1 == items.len() {
        return Ok(None);
    }
    move_item(items, index, index + 1).map(Some)
}
