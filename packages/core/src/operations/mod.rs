//! Pure tree planning
//!
//! Nothing in this module touches the database. The services load a
//! [`HierarchySnapshot`] or a sibling group inside their transaction, ask
//! these planners what to write, and apply the answer.
//!
//! - [`ordering`] - sparse sibling keys and local renumbering
//! - [`hierarchy`] - depth, ancestor and subtree walks with cycle guards
//! - [`completion`] - completion rollup and subtree reset plans

pub mod completion;
pub mod hierarchy;
pub mod ordering;

pub use completion::{
    plan_completion, plan_incomplete_arrival, plan_subtree_reset, CompletionPlan,
    CompletionWrites, ResetPlan,
};
pub use hierarchy::{HierarchyError, HierarchyNode, HierarchySnapshot};
pub use ordering::{OrderPlan, SiblingKey, SparseOrderAllocator};
