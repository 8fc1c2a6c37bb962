use serde::{Deserialize, Serialize};

use crate::spec::field::{FieldDefinition, FieldId};

/// New position for one field after a reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: FieldId,
    pub order: u32,
}

/// Stable sort by `order`; equal orders keep their current relative position.
pub fn sort_by_order(fields: &mut [FieldDefinition]) {
    fields.sort_by_key(|field| field.order);
}

/// Moves the item at `from` to index `to`, shifting the items in between.
///
/// Returns `None` when either index is out of range.
pub fn move_to<T: Clone>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    if from >= items.len() || to >= items.len() {
        return None;
    }
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Some(moved)
}

/// Assigns orders `0..n` following the sequence of `ids`.
pub fn contiguous_orders<S: AsRef<str>>(ids: &[S]) -> Vec<OrderUpdate> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| OrderUpdate {
            id: id.as_ref().to_string(),
            order: index as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_last_to_front_shifts_the_rest() {
        let ids = ["a", "b", "c"];
        let moved = move_to(&ids, 2, 0).expect("in range");
        assert_eq!(moved, vec!["c", "a", "b"]);
        let updates = contiguous_orders(&moved);
        assert_eq!(
            updates,
            vec![
                OrderUpdate { id: "c".into(), order: 0 },
                OrderUpdate { id: "a".into(), order: 1 },
                OrderUpdate { id: "b".into(), order: 2 },
            ]
        );
    }

    #[test]
    fn out_of_range_moves_are_rejected() {
        assert!(move_to(&["a"], 0, 1).is_none());
        assert!(move_to::<&str>(&[], 0, 0).is_none());
    }
}
