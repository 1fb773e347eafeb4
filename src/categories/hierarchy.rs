//! Category hierarchy validation

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::{Category, CategoryUuid};

/// Reasons a proposed set of category rows would corrupt the forest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// A category names itself as its parent.
    #[error("category {0} cannot be its own parent")]
    SelfParent(CategoryUuid),

    /// A category names a parent that does not exist.
    #[error("parent {parent} of category {category} does not exist")]
    UnknownParent {
        /// The category being written
        category: CategoryUuid,

        /// The parent it points at
        parent: CategoryUuid,
    },

    /// The same category appears twice in one batch.
    #[error("category {0} appears more than once")]
    Duplicate(CategoryUuid),

    /// Applying the batch would make a category its own ancestor.
    #[error("category {0} would become its own ancestor")]
    Cycle(CategoryUuid),
}

/// Check that applying `proposed` on top of `existing` leaves a forest.
///
/// Rows in `proposed` replace rows in `existing` with the same id; new ids
/// are added. Parents may be existing categories or other proposed ones.
///
/// # Errors
///
/// Returns the first [`HierarchyError`] found.
pub fn validate_hierarchy(existing: &[Category], proposed: &[Category]) -> Result<(), HierarchyError> {
    let mut seen = FxHashSet::default();

    for category in proposed {
        if !seen.insert(category.uuid) {
            return Err(HierarchyError::Duplicate(category.uuid));
        }

        if category.parent == Some(category.uuid) {
            return Err(HierarchyError::SelfParent(category.uuid));
        }
    }

    let parents: FxHashMap<CategoryUuid, Option<CategoryUuid>> = existing
        .iter()
        .chain(proposed)
        .map(|category| (category.uuid, category.parent))
        .collect();

    for category in proposed {
        if let Some(parent) = category.parent
            && !parents.contains_key(&parent)
        {
            return Err(HierarchyError::UnknownParent {
                category: category.uuid,
                parent,
            });
        }
    }

    for category in proposed {
        let mut current = category.parent;
        let mut steps = 0;

        while let Some(uuid) = current {
            if uuid == category.uuid || steps > parents.len() {
                return Err(HierarchyError::Cycle(category.uuid));
            }

            current = parents.get(&uuid).copied().flatten();
            steps += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent: Option<CategoryUuid>) -> Category {
        Category {
            uuid: CategoryUuid::new(),
            name: name.to_string(),
            parent,
            sort_order: 0,
        }
    }

    #[test]
    fn accepts_new_children_of_existing_and_proposed_parents() {
        let root = category("Root", None);
        let child = category("Child", Some(root.uuid));
        let grandchild = category("Grandchild", Some(child.uuid));

        assert_eq!(
            validate_hierarchy(&[root], &[grandchild, child]),
            Ok(())
        );
    }

    #[test]
    fn rejects_self_parent() {
        let mut looped = category("Loop", None);
        looped.parent = Some(looped.uuid);

        assert_eq!(
            validate_hierarchy(&[], &[looped.clone()]),
            Err(HierarchyError::SelfParent(looped.uuid))
        );
    }

    #[test]
    fn rejects_unknown_parent() {
        let parent = CategoryUuid::new();
        let orphan = category("Orphan", Some(parent));

        assert_eq!(
            validate_hierarchy(&[], &[orphan.clone()]),
            Err(HierarchyError::UnknownParent {
                category: orphan.uuid,
                parent,
            })
        );
    }

    #[test]
    fn rejects_transitive_cycle_through_existing_rows() {
        let a = category("A", None);
        let b = category("B", Some(a.uuid));
        let c = category("C", Some(b.uuid));

        // Re-parent A under its own grandchild.
        let mut moved = a.clone();
        moved.parent = Some(c.uuid);

        assert_eq!(
            validate_hierarchy(&[a, b, c], &[moved.clone()]),
            Err(HierarchyError::Cycle(moved.uuid))
        );
    }

    #[test]
    fn rejects_duplicates_in_one_batch() {
        let a = category("A", None);

        assert_eq!(
            validate_hierarchy(&[], &[a.clone(), a.clone()]),
            Err(HierarchyError::Duplicate(a.uuid))
        );
    }

    #[test]
    fn moving_a_subtree_elsewhere_is_fine() {
        let a = category("A", None);
        let b = category("B", None);
        let c = category("C", Some(a.uuid));

        let mut moved = c.clone();
        moved.parent = Some(b.uuid);

        assert_eq!(validate_hierarchy(&[a, b, c], &[moved]), Ok(()));
    }
}
