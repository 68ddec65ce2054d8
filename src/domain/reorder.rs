//! Drag-gesture reordering.
//!
//! Both ways the UI can describe a drop (an inter-element drop zone, or a
//! pointer hovering one side of an element) reduce to a single nominal
//! insertion position `P` in `0..=len`. For a move within one sequence the
//! element is removed first, which shifts everything after it down by one, so
//! the index it is re-inserted at is:
//!
//! ```text
//! effective = P - 1   if source < P
//! effective = P       if source >= P
//! ```
//!
//! Moves between two different sequences insert at `P` unchanged.

use crate::error::{Result, TaskboardError};

/// Which half of a hovered element the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverSide {
    /// Left of (or above) the midpoint
    Before,
    /// Right of (or below) the midpoint, including the midpoint itself
    After,
}

impl HoverSide {
    /// Classifies a pointer coordinate against an element spanning
    /// `start..start + extent` on the drag axis.
    pub fn from_pointer(pointer: f64, start: f64, extent: f64) -> Self {
        let midpoint = start + extent / 2.0;
        if pointer < midpoint {
            Self::Before
        } else {
            Self::After
        }
    }
}

/// Where a dragged element was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// A drop zone rendered before element `position` (or after the last one
    /// when `position == len`)
    Zone { position: usize },
    /// Dropped onto the element at `index`
    Hover { index: usize, side: HoverSide },
}

impl DropTarget {
    pub fn zone(position: usize) -> Self {
        Self::Zone { position }
    }

    pub fn hover(index: usize, side: HoverSide) -> Self {
        Self::Hover { index, side }
    }

    /// Nominal insertion position in a sequence of `len` elements, as it
    /// looked before the move.
    ///
    /// A zone may sit past the last element (`position == len`); a hovered
    /// element must exist.
    pub fn nominal_position(&self, len: usize) -> Result<usize> {
        match *self {
            Self::Zone { position } if position > len => {
                Err(TaskboardError::out_of_range("drop zone", position, len))
            }
            Self::Zone { position } => Ok(position),
            Self::Hover { index, .. } if index >= len => {
                Err(TaskboardError::out_of_range("hovered element", index, len))
            }
            Self::Hover {
                index,
                side: HoverSide::Before,
            } => Ok(index),
            Self::Hover {
                index,
                side: HoverSide::After,
            } => index
                .checked_add(1)
                .ok_or_else(|| TaskboardError::out_of_range("hovered element", index, len)),
        }
    }
}

/// Result of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The element now sits at `to` in its destination sequence
    Moved { to: usize },
    /// The drop resolved to the element's current slot
    Unchanged,
}

/// Index an element lands on after a same-sequence move from `source` to
/// nominal position `nominal`.
pub fn effective_index(source: usize, nominal: usize) -> usize {
    if source < nominal {
        nominal - 1
    } else {
        nominal
    }
}

/// Moves the element at `from` to the nominal insertion position `nominal`
/// within the same sequence.
///
/// Fails without touching `seq` when `from >= len` or `nominal > len`.
pub fn move_element<T>(seq: &mut Vec<T>, from: usize, nominal: usize) -> Result<MoveOutcome> {
    let len = seq.len();
    if from >= len {
        return Err(TaskboardError::out_of_range("source", from, len));
    }
    if nominal > len {
        return Err(TaskboardError::out_of_range("target", nominal, len));
    }

    let to = effective_index(from, nominal);
    if to == from {
        return Ok(MoveOutcome::Unchanged);
    }

    let element = seq.remove(from);
    seq.insert(to, element);
    Ok(MoveOutcome::Moved { to })
}

/// Moves the element at `from` in `source` into `target` at position `to`.
///
/// The sequences are distinct, so no removal shift applies. Both are left
/// untouched when either index is out of range.
pub fn transfer_element<T>(
    source: &mut Vec<T>,
    from: usize,
    target: &mut Vec<T>,
    to: usize,
) -> Result<MoveOutcome> {
    if from >= source.len() {
        return Err(TaskboardError::out_of_range("source", from, source.len()));
    }
    if to > target.len() {
        return Err(TaskboardError::out_of_range("target", to, target.len()));
    }

    let element = source.remove(from);
    target.insert(to, element);
    Ok(MoveOutcome::Moved { to })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_zone_scenario() {
        let mut cards = vec!["A", "B", "C"];
        let nominal = DropTarget::zone(2).nominal_position(cards.len()).unwrap();
        let outcome = move_element(&mut cards, 0, nominal).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved { to: 1 });
        assert_eq!(cards, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_move_to_end_zone() {
        let mut cards = vec!["A", "B", "C"];
        move_element(&mut cards, 0, 3).unwrap();
        assert_eq!(cards, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_move_backwards() {
        let mut cards = vec!["A", "B", "C", "D"];
        let outcome = move_element(&mut cards, 3, 1).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved { to: 1 });
        assert_eq!(cards, vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn test_adjacent_zones_are_noops() {
        let mut cards = vec!["A", "B", "C"];
        assert_eq!(move_element(&mut cards, 1, 1).unwrap(), MoveOutcome::Unchanged);
        assert_eq!(move_element(&mut cards, 1, 2).unwrap(), MoveOutcome::Unchanged);
        assert_eq!(cards, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_out_of_range_leaves_sequence_unchanged() {
        let mut cards = vec!["A", "B"];
        assert!(matches!(
            move_element(&mut cards, 2, 0),
            Err(TaskboardError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            move_element(&mut cards, 0, 3),
            Err(TaskboardError::IndexOutOfRange { .. })
        ));
        assert_eq!(cards, vec!["A", "B"]);
    }

    #[test]
    fn test_move_preserves_multiset_and_lands_on_effective_index() {
        for len in 1..7usize {
            for from in 0..len {
                for nominal in 0..=len {
                    let mut seq: Vec<usize> = (0..len).collect();
                    move_element(&mut seq, from, nominal).unwrap();

                    assert_eq!(seq.len(), len);
                    let mut sorted = seq.clone();
                    sorted.sort_unstable();
                    assert_eq!(sorted, (0..len).collect::<Vec<_>>());
                    assert_eq!(seq[effective_index(from, nominal)], from);
                }
            }
        }
    }

    #[test]
    fn test_hover_side_midpoint() {
        assert_eq!(HoverSide::from_pointer(10.0, 0.0, 100.0), HoverSide::Before);
        assert_eq!(HoverSide::from_pointer(50.0, 0.0, 100.0), HoverSide::After);
        assert_eq!(HoverSide::from_pointer(249.0, 200.0, 100.0), HoverSide::Before);
        assert_eq!(HoverSide::from_pointer(251.0, 200.0, 100.0), HoverSide::After);
    }

    #[test]
    fn test_hover_paths_reduce_to_drop_zone_formula() {
        // Target 2 of [0,1,2,3]: the four side/direction combinations a
        // midpoint hover can produce.
        let cases = [
            (0, HoverSide::Before, 1),
            (0, HoverSide::After, 2),
            (3, HoverSide::Before, 2),
            (3, HoverSide::After, 3),
        ];
        for (from, side, expected) in cases {
            let mut seq = vec![0, 1, 2, 3];
            let nominal = DropTarget::hover(2, side).nominal_position(seq.len()).unwrap();
            move_element(&mut seq, from, nominal).unwrap();
            assert_eq!(seq[expected], from, "from {} {:?}", from, side);
        }
    }

    #[test]
    fn test_hover_on_self_is_noop() {
        let mut seq = vec!["A", "B", "C"];
        for side in [HoverSide::Before, HoverSide::After] {
            let nominal = DropTarget::hover(1, side).nominal_position(seq.len()).unwrap();
            assert_eq!(move_element(&mut seq, 1, nominal).unwrap(), MoveOutcome::Unchanged);
        }
    }

    #[test]
    fn test_nominal_position_checks_bounds() {
        assert_eq!(DropTarget::zone(3).nominal_position(3).unwrap(), 3);
        assert_eq!(DropTarget::hover(2, HoverSide::After).nominal_position(3).unwrap(), 3);
        assert!(matches!(
            DropTarget::zone(4).nominal_position(3),
            Err(TaskboardError::IndexOutOfRange { entity: "drop zone", index: 4, len: 3 })
        ));
        assert!(matches!(
            DropTarget::hover(3, HoverSide::Before).nominal_position(3),
            Err(TaskboardError::IndexOutOfRange { entity: "hovered element", index: 3, len: 3 })
        ));
        assert!(DropTarget::hover(0, HoverSide::After).nominal_position(0).is_err());
    }

    #[test]
    fn test_hover_at_max_index_does_not_overflow() {
        let target = DropTarget::hover(usize::MAX, HoverSide::After);
        assert!(matches!(
            target.nominal_position(3),
            Err(TaskboardError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_transfer_has_no_shift() {
        let mut todo = vec!["A", "B"];
        let mut done = vec!["X", "Y"];
        let outcome = transfer_element(&mut todo, 0, &mut done, 1).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved { to: 1 });
        assert_eq!(todo, vec!["B"]);
        assert_eq!(done, vec!["X", "A", "Y"]);
    }

    #[test]
    fn test_transfer_into_empty_sequence() {
        let mut todo = vec!["A"];
        let mut done: Vec<&str> = Vec::new();
        transfer_element(&mut todo, 0, &mut done, 0).unwrap();
        assert!(todo.is_empty());
        assert_eq!(done, vec!["A"]);
    }

    #[test]
    fn test_transfer_out_of_range_is_atomic() {
        let mut todo = vec!["A"];
        let mut done = vec!["X"];
        assert!(transfer_element(&mut todo, 0, &mut done, 5).is_err());
        assert!(transfer_element(&mut todo, 3, &mut done, 0).is_err());
        assert_eq!(todo, vec!["A"]);
        assert_eq!(done, vec!["X"]);
    }
}
