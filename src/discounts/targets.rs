//! Discount target planning
//!
//! Turning a requested [`DiscountScope`] into target rows, either from scratch
//! ([`plan_targets`]) or as a diff against rows that already exist
//! ([`diff_targets`]). Both are pure so the store only has to apply the plan.

use rustc_hash::FxHashSet;

use super::{DiscountTarget, DiscountTargetUuid, TargetScope, category_priority};
use crate::discounts::validation::DiscountScope;

/// A target row to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewDiscountTarget {
    /// Id for the new row
    pub uuid: DiscountTargetUuid,

    /// What it applies to
    pub scope: TargetScope,

    /// Stored priority, already offset for categories
    pub priority: i32,
}

impl NewDiscountTarget {
    fn new(scope: TargetScope, requested_priority: i32) -> Self {
        Self {
            uuid: DiscountTargetUuid::new(),
            scope,
            priority: stored_priority(scope, requested_priority),
        }
    }
}

/// An existing target row to be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetUpdate {
    /// Row being updated
    pub uuid: DiscountTargetUuid,

    /// New scope (unchanged for plain re-prioritisation)
    pub scope: TargetScope,

    /// New stored priority
    pub priority: i32,
}

/// The row-level changes needed to move from the existing targets to the
/// requested scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetChanges {
    /// Rows to delete
    pub remove: Vec<DiscountTargetUuid>,

    /// Rows to rewrite in place
    pub update: Vec<TargetUpdate>,

    /// Rows to insert
    pub create: Vec<NewDiscountTarget>,
}

impl TargetChanges {
    /// Whether applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.update.is_empty() && self.create.is_empty()
    }
}

fn stored_priority(scope: TargetScope, requested: i32) -> i32 {
    match scope {
        TargetScope::Product(_) => requested,
        TargetScope::Category(_) => category_priority(requested),
    }
}

/// Target rows for a freshly created discount.
pub fn plan_targets(scope: &DiscountScope, priority: i32) -> Vec<NewDiscountTarget> {
    match scope {
        DiscountScope::Category(category) => {
            vec![NewDiscountTarget::new(TargetScope::Category(*category), priority)]
        }
        DiscountScope::Products(products) => products
            .iter()
            .map(|product| NewDiscountTarget::new(TargetScope::Product(*product), priority))
            .collect(),
    }
}

/// Diff `existing` targets of one discount against the requested scope.
///
/// - Requesting a category keeps (and re-prioritises) a single category row,
///   re-pointing it if the category changed, and drops every product row.
/// - Requesting products drops every category row, removes products no longer
///   listed, re-prioritises the ones kept and creates the missing ones.
pub fn diff_targets(existing: &[DiscountTarget], scope: &DiscountScope, priority: i32) -> TargetChanges {
    let mut changes = TargetChanges::default();

    match scope {
        DiscountScope::Category(category) => {
            let desired = TargetScope::Category(*category);
            let desired_priority = stored_priority(desired, priority);
            let mut kept = false;

            for target in existing {
                match target.scope {
                    TargetScope::Category(_) if !kept => {
                        kept = true;

                        if target.scope != desired || target.priority != desired_priority {
                            changes.update.push(TargetUpdate {
                                uuid: target.uuid,
                                scope: desired,
                                priority: desired_priority,
                            });
                        }
                    }
                    TargetScope::Category(_) | TargetScope::Product(_) => {
                        changes.remove.push(target.uuid);
                    }
                }
            }

            if !kept {
                changes.create.push(NewDiscountTarget::new(desired, priority));
            }
        }
        DiscountScope::Products(products) => {
            let wanted: FxHashSet<_> = products.iter().copied().collect();
            let mut retained = FxHashSet::default();

            for target in existing {
                match target.scope {
                    TargetScope::Product(product)
                        if wanted.contains(&product) && retained.insert(product) =>
                    {
                        if target.priority != priority {
                            changes.update.push(TargetUpdate {
                                uuid: target.uuid,
                                scope: target.scope,
                                priority,
                            });
                        }
                    }
                    TargetScope::Product(_) | TargetScope::Category(_) => {
                        changes.remove.push(target.uuid);
                    }
                }
            }

            changes.create.extend(
                products
                    .iter()
                    .filter(|product| !retained.contains(*product))
                    .map(|product| NewDiscountTarget::new(TargetScope::Product(*product), priority)),
            );
        }
    }

    changes
}
