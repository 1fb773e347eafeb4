//! Categories Data

use storefront::categories::{Category, CategoryUuid};

/// New Category Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub uuid: CategoryUuid,
    pub name: String,
    pub parent: Option<CategoryUuid>,
    pub sort_order: i32,
}

impl From<NewCategory> for Category {
    fn from(category: NewCategory) -> Self {
        Self {
            uuid: category.uuid,
            name: category.name,
            parent: category.parent,
            sort_order: category.sort_order,
        }
    }
}

/// Category Update Data
///
/// `None` leaves a field unchanged; `parent: Some(None)` detaches the
/// category and makes it a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub uuid: CategoryUuid,
    pub name: Option<String>,
    pub parent: Option<Option<CategoryUuid>>,
    pub sort_order: Option<i32>,
}

impl CategoryUpdate {
    /// Apply the update to the current row.
    pub fn apply(self, current: &Category) -> Category {
        Category {
            uuid: current.uuid,
            name: self.name.unwrap_or_else(|| current.name.clone()),
            parent: self.parent.unwrap_or(current.parent),
            sort_order: self.sort_order.unwrap_or(current.sort_order),
        }
    }
}
