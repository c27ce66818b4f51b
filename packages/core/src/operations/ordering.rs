//! Sparse sibling ordering
//!
//! Siblings are ordered by integer keys spaced `step` apart (1024 by default),
//! so an item can be placed between two neighbours by picking any integer
//! strictly between their keys. When no such integer exists, or when a caller
//! writes a key that another sibling already holds, the sibling group is
//! renumbered locally instead of leaving two items tied.

use crate::models::ValidationError;

/// An item's identity and current key within one sibling group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingKey {
    pub id: String,
    pub order: i64,
}

impl SiblingKey {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }
}

/// How to apply a requested position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPlan {
    /// Write this key to the moving item only
    Direct(i64),

    /// Rewrite these keys (moving item included); unchanged siblings omitted
    Renumber(Vec<SiblingKey>),
}

impl OrderPlan {
    /// Key the moving item ends up with
    pub fn key_for(&self, id: &str) -> Option<i64> {
        match self {
            Self::Direct(order) => Some(*order),
            Self::Renumber(keys) => keys.iter().find(|k| k.id == id).map(|k| k.order),
        }
    }
}

/// Allocates sparse order keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseOrderAllocator {
    step: i64,
}

impl SparseOrderAllocator {
    pub fn new(step: i64) -> Self {
        Self { step: step.max(2) }
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Key for a new last sibling: `max + step`, or `step` for an empty group
    pub fn next_after(&self, max_sibling_order: Option<i64>) -> Result<i64, ValidationError> {
        match max_sibling_order {
            None => Ok(self.step),
            Some(max) => max
                .checked_add(self.step)
                .ok_or(ValidationError::OrderOutOfRange(max)),
        }
    }

    /// A key strictly between two neighbours, if one exists
    ///
    /// ```
    /// # use listkeeper_core::operations::SparseOrderAllocator;
    /// let alloc = SparseOrderAllocator::new(1024);
    /// assert_eq!(alloc.between(None, None), Some(1024));
    /// assert_eq!(alloc.between(None, Some(1024)), Some(0));
    /// assert_eq!(alloc.between(Some(2048), None), Some(3072));
    /// assert_eq!(alloc.between(Some(1024), Some(2048)), Some(1536));
    /// assert_eq!(alloc.between(Some(5), Some(6)), None);
    /// ```
    pub fn between(&self, prev: Option<i64>, next: Option<i64>) -> Option<i64> {
        match (prev, next) {
            (None, None) => Some(self.step),
            (None, Some(next)) => next.checked_sub(self.step),
            (Some(prev), None) => prev.checked_add(self.step),
            (Some(prev), Some(next)) => {
                if next <= prev {
                    return None;
                }
                // prev + (next - prev) / 2 never overflows for prev < next
                let mid = prev + (next - prev) / 2;
                (mid > prev && mid < next).then_some(mid)
            }
        }
    }

    /// Whether any two adjacent keys of an ascending sequence are tied
    pub fn needs_renumbering(sorted_orders: &[i64]) -> bool {
        sorted_orders.windows(2).any(|pair| pair[0] >= pair[1])
    }

    /// Evenly spaced keys: `step, 2*step, ...`
    pub fn renumber(&self, count: usize) -> Vec<i64> {
        (1..=count as i64).map(|i| i * self.step).collect()
    }

    /// Plan writing `new_order` to `moving_id`
    ///
    /// `siblings` must exclude the moving item and be in display order. If
    /// the key is free it is written as-is. If a sibling already holds it, the
    /// moving item is placed immediately before that sibling and the whole
    /// group is renumbered.
    pub fn plan_set_order(&self, siblings: &[SiblingKey], moving_id: &str, new_order: i64) -> OrderPlan {
        match siblings.iter().position(|s| s.order == new_order) {
            None => OrderPlan::Direct(new_order),
            Some(index) => self.renumbered_with_insert(siblings, moving_id, index),
        }
    }

    /// Plan placing `moving_id` directly after the sibling `after_id`
    /// (`None` = first position)
    ///
    /// `siblings` must exclude the moving item and be in display order.
    /// Returns `None` if `after_id` is not one of the siblings.
    pub fn plan_place_after(
        &self,
        siblings: &[SiblingKey],
        moving_id: &str,
        after_id: Option<&str>,
    ) -> Option<OrderPlan> {
        let insert_at = match after_id {
            None => 0,
            Some(after) => siblings.iter().position(|s| s.id == after)? + 1,
        };

        let prev = insert_at.checked_sub(1).map(|i| siblings[i].order);
        let next = siblings.get(insert_at).map(|s| s.order);

        Some(match self.between(prev, next) {
            Some(order) => OrderPlan::Direct(order),
            None => self.renumbered_with_insert(siblings, moving_id, insert_at),
        })
    }

    fn renumbered_with_insert(
        &self,
        siblings: &[SiblingKey],
        moving_id: &str,
        insert_at: usize,
    ) -> OrderPlan {
        let mut sequence: Vec<(&str, Option<i64>)> =
            siblings.iter().map(|s| (s.id.as_str(), Some(s.order))).collect();
        sequence.insert(insert_at.min(sequence.len()), (moving_id, None));

        let keys = self.renumber(sequence.len());
        let changes = sequence
            .into_iter()
            .zip(keys)
            .filter(|((_, old), new)| *old != Some(*new))
            .map(|((id, _), new)| SiblingKey::new(id, new))
            .collect();

        OrderPlan::Renumber(changes)
    }
}

impl Default for SparseOrderAllocator {
    fn default() -> Self {
        Self::new(crate::config::ORDER_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(pairs: &[(&str, i64)]) -> Vec<SiblingKey> {
        pairs.iter().map(|(id, o)| SiblingKey::new(*id, *o)).collect()
    }

    #[test]
    fn test_next_after_empty_group() {
        let alloc = SparseOrderAllocator::default();
        assert_eq!(alloc.next_after(None).unwrap(), 1024);
    }

    #[test]
    fn test_next_after_appends_one_step() {
        let alloc = SparseOrderAllocator::default();
        assert_eq!(alloc.next_after(Some(1024)).unwrap(), 2048);
        assert_eq!(alloc.next_after(Some(-5)).unwrap(), 1019);
    }

    #[test]
    fn test_next_after_overflow_is_rejected() {
        let alloc = SparseOrderAllocator::default();
        assert_eq!(
            alloc.next_after(Some(i64::MAX - 1)),
            Err(ValidationError::OrderOutOfRange(i64::MAX - 1))
        );
    }

    #[test]
    fn test_between_exhausts() {
        let alloc = SparseOrderAllocator::default();
        let mut prev = 1024;
        let next = 2048;
        let mut inserts = 0;
        while let Some(mid) = alloc.between(Some(prev), Some(next)) {
            assert!(mid > prev && mid < next);
            prev = mid;
            inserts += 1;
        }
        // 1023 free integers between the neighbours, halving each time
        assert_eq!(inserts, 10);
    }

    #[test]
    fn test_between_rejects_inverted_neighbours() {
        let alloc = SparseOrderAllocator::default();
        assert_eq!(alloc.between(Some(10), Some(10)), None);
        assert_eq!(alloc.between(Some(10), Some(3)), None);
    }

    #[test]
    fn test_needs_renumbering() {
        assert!(!SparseOrderAllocator::needs_renumbering(&[1024, 2048, 3072]));
        assert!(SparseOrderAllocator::needs_renumbering(&[1024, 1024, 3072]));
        assert!(!SparseOrderAllocator::needs_renumbering(&[]));
    }

    #[test]
    fn test_renumber_even_spacing() {
        let alloc = SparseOrderAllocator::default();
        assert_eq!(alloc.renumber(3), vec![1024, 2048, 3072]);
        assert!(alloc.renumber(0).is_empty());
    }

    #[test]
    fn test_plan_set_order_free_key_is_direct() {
        let alloc = SparseOrderAllocator::default();
        let siblings = keys(&[("a", 1024), ("b", 2048)]);
        assert_eq!(alloc.plan_set_order(&siblings, "m", 512), OrderPlan::Direct(512));
    }

    #[test]
    fn test_plan_set_order_collision_renumbers_before_holder() {
        let alloc = SparseOrderAllocator::default();
        let siblings = keys(&[("a", 1024), ("b", 1025), ("c", 4096)]);

        let plan = alloc.plan_set_order(&siblings, "m", 1025);

        // Final sequence: a, m, b, c
        assert_eq!(
            plan,
            OrderPlan::Renumber(keys(&[("m", 2048), ("b", 3072)]))
        );
        assert_eq!(plan.key_for("m"), Some(2048));
        assert_eq!(plan.key_for("c"), None);
    }

    #[test]
    fn test_plan_place_after_uses_midpoint() {
        let alloc = SparseOrderAllocator::default();
        let siblings = keys(&[("a", 1024), ("b", 2048)]);

        assert_eq!(
            alloc.plan_place_after(&siblings, "m", Some("a")),
            Some(OrderPlan::Direct(1536))
        );
        assert_eq!(
            alloc.plan_place_after(&siblings, "m", None),
            Some(OrderPlan::Direct(0))
        );
        assert_eq!(
            alloc.plan_place_after(&siblings, "m", Some("b")),
            Some(OrderPlan::Direct(3072))
        );
    }

    #[test]
    fn test_plan_place_after_exhausted_gap_renumbers() {
        let alloc = SparseOrderAllocator::default();
        let siblings = keys(&[("a", 7), ("b", 8)]);

        let plan = alloc.plan_place_after(&siblings, "m", Some("a")).unwrap();
        assert_eq!(
            plan,
            OrderPlan::Renumber(keys(&[("a", 1024), ("m", 2048), ("b", 3072)]))
        );
    }

    #[test]
    fn test_plan_place_after_unknown_sibling() {
        let alloc = SparseOrderAllocator::default();
        let siblings = keys(&[("a", 1024)]);
        assert_eq!(alloc.plan_place_after(&siblings, "m", Some("zz")), None);
    }
}
