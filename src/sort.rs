//! Display orderings for projected tasks. Both are stable: equal keys keep
//! their input order.

use std::cmp::Reverse;

use crate::task::Task;

/// Highest priority first.
pub fn order_by_priority<'a>(tasks: &[&'a Task]) -> Vec<&'a Task> {
    let mut out = tasks.to_vec();
    out.sort_by_key(|t| Reverse(t.priority.rank()));
    out
}

/// To-do before in-progress before completed, then highest priority first.
pub fn order_by_status_then_priority<'a>(tasks: &[&'a Task]) -> Vec<&'a Task> {
    let mut out = tasks.to_vec();
    out.sort_by_key(|t| (Reverse(t.status.rank()), Reverse(t.priority.rank())));
    out
}
