//! Categories service.

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashSet;
use storefront::categories::{
    Category, CategoryTree, CategoryTreeNode, CategoryUuid, validate_hierarchy,
};
use tracing::{Span, info};

use crate::{
    domain::categories::{
        data::{CategoryUpdate, NewCategory},
        errors::CategoriesServiceError,
        repository::CategoriesRepository,
    },
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone)]
pub struct StoreCategoriesService<S> {
    store: S,
}

impl<S: Store> StoreCategoriesService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn snapshot(&self) -> Result<CategoryTree, CategoriesServiceError> {
        let mut tx = self.store.begin().await?;

        let categories = tx.list_categories().await?;

        tx.commit().await?;

        Ok(CategoryTree::from_categories(categories))
    }
}

fn check_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), CategoriesServiceError> {
    if names.into_iter().any(|name| name.trim().is_empty()) {
        return Err(CategoriesServiceError::InvalidInput(
            "category name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

// Inserts must see parents before children; the batch is already known to
// be acyclic with every parent present.
fn parents_first(existing: &[Category], proposed: Vec<Category>) -> Vec<Category> {
    let mut placed: FxHashSet<CategoryUuid> = existing.iter().map(|category| category.uuid).collect();
    let mut pending = proposed;
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|category| category.parent.is_none_or(|parent| placed.contains(&parent)));

        if ready.is_empty() {
            ordered.extend(blocked);
            break;
        }

        placed.extend(ready.iter().map(|category| category.uuid));
        ordered.extend(ready);
        pending = blocked;
    }

    ordered
}

#[async_trait]
impl<S: Store> CategoriesService for StoreCategoriesService<S> {
    #[tracing::instrument(
        name = "categories.service.tree",
        skip(self),
        fields(category_count = tracing::field::Empty),
        err
    )]
    async fn tree(&self) -> Result<Vec<CategoryTreeNode>, CategoriesServiceError> {
        let tree = self.snapshot().await?;

        Span::current().record("category_count", tree.len());

        Ok(tree.forest())
    }

    #[tracing::instrument(
        name = "categories.service.ancestor_path",
        skip(self),
        fields(category_uuid = %category),
        err
    )]
    async fn ancestor_path(
        &self,
        category: CategoryUuid,
    ) -> Result<Vec<Category>, CategoriesServiceError> {
        let tree = self.snapshot().await?;

        Ok(tree.ancestor_path(category)?.into_iter().cloned().collect())
    }

    #[tracing::instrument(
        name = "categories.service.subtree_ids",
        skip(self),
        fields(category_uuid = %category, subtree_size = tracing::field::Empty),
        err
    )]
    async fn subtree_ids(
        &self,
        category: CategoryUuid,
    ) -> Result<Vec<CategoryUuid>, CategoriesServiceError> {
        let tree = self.snapshot().await?;

        let mut ids: Vec<CategoryUuid> = tree.subtree_ids(category)?.into_iter().collect();
        ids.sort_unstable();

        Span::current().record("subtree_size", ids.len());

        Ok(ids)
    }

    #[tracing::instrument(
        name = "categories.service.create_categories",
        skip(self, categories),
        fields(category_count = categories.len()),
        err
    )]
    async fn create_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, CategoriesServiceError> {
        check_names(categories.iter().map(|category| category.name.as_str()))?;

        let mut tx = self.store.begin().await?;

        let existing = tx.list_categories().await?;

        if categories
            .iter()
            .any(|category| existing.iter().any(|current| current.uuid == category.uuid))
        {
            return Err(CategoriesServiceError::AlreadyExists);
        }

        let proposed: Vec<Category> = categories.into_iter().map(Category::from).collect();

        validate_hierarchy(&existing, &proposed)?;

        let ordered = parents_first(&existing, proposed);

        for category in &ordered {
            tx.create_category(category).await?;
        }

        tx.commit().await?;

        info!(category_count = ordered.len(), "created categories");

        Ok(ordered)
    }

    #[tracing::instrument(
        name = "categories.service.update_categories",
        skip(self, updates),
        fields(category_count = updates.len()),
        err
    )]
    async fn update_categories(
        &self,
        updates: Vec<CategoryUpdate>,
    ) -> Result<Vec<Category>, CategoriesServiceError> {
        check_names(updates.iter().filter_map(|update| update.name.as_deref()))?;

        let mut tx = self.store.begin().await?;

        let existing = tx.list_categories().await?;

        let proposed = updates
            .into_iter()
            .map(|update| {
                existing
                    .iter()
                    .find(|current| current.uuid == update.uuid)
                    .map(|current| update.apply(current))
                    .ok_or(CategoriesServiceError::NotFound)
            })
            .collect::<Result<Vec<_>, _>>()?;

        validate_hierarchy(&existing, &proposed)?;

        for category in &proposed {
            if tx.update_category(category).await? == 0 {
                return Err(CategoriesServiceError::NotFound);
            }
        }

        tx.commit().await?;

        info!(category_count = proposed.len(), "updated categories");

        Ok(proposed)
    }

    #[tracing::instrument(
        name = "categories.service.delete_category",
        skip(self),
        fields(category_uuid = %category),
        err
    )]
    async fn delete_category(&self, category: CategoryUuid) -> Result<(), CategoriesServiceError> {
        let mut tx = self.store.begin().await?;

        let rows_affected = tx.delete_category(category).await?;

        if rows_affected == 0 {
            return Err(CategoriesServiceError::NotFound);
        }

        tx.commit().await?;

        info!(category_uuid = %category, "deleted category");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CategoriesService: Send + Sync {
    /// The whole category forest, siblings ordered by `sort_order`.
    async fn tree(&self) -> Result<Vec<CategoryTreeNode>, CategoriesServiceError>;

    /// Categories from the root down to `category`.
    async fn ancestor_path(
        &self,
        category: CategoryUuid,
    ) -> Result<Vec<Category>, CategoriesServiceError>;

    /// `category` and every category below it.
    async fn subtree_ids(
        &self,
        category: CategoryUuid,
    ) -> Result<Vec<CategoryUuid>, CategoriesServiceError>;

    /// Create a batch of categories; parents may be in the same batch.
    async fn create_categories(
        &self,
        categories: Vec<NewCategory>,
    ) -> Result<Vec<Category>, CategoriesServiceError>;

    /// Update a batch of existing categories.
    async fn update_categories(
        &self,
        updates: Vec<CategoryUpdate>,
    ) -> Result<Vec<Category>, CategoriesServiceError>;

    /// Delete an unreferenced category.
    async fn delete_category(&self, category: CategoryUuid) -> Result<(), CategoriesServiceError>;
}
