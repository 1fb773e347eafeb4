//! Categories
//!
//! Product categories form a forest: every category has at most one parent and
//! any number of children. The forest is read as a flat snapshot of rows and
//! turned into a [`CategoryTree`] for ancestry and subtree queries.

use thiserror::Error;

use crate::uuids::TypedUuid;

pub mod hierarchy;
pub mod tree;

pub use hierarchy::{HierarchyError, validate_hierarchy};
pub use tree::{CategoryKey, CategoryTree, CategoryTreeNode, build_forest};

/// Category UUID
pub type CategoryUuid = TypedUuid<Category>;

/// A single product category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category id
    pub uuid: CategoryUuid,

    /// Display name
    pub name: String,

    /// Parent category, `None` for roots
    pub parent: Option<CategoryUuid>,

    /// Position among siblings, ascending
    pub sort_order: i32,
}

/// Errors raised when querying a [`CategoryTree`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryTreeError {
    /// The requested category is not part of the snapshot.
    #[error("category {0} not found")]
    NotFound(CategoryUuid),
}
