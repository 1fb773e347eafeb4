//! Discounts service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use storefront::{
    categories::CategoryUuid,
    discounts::{
        Discount, DiscountScope, DiscountUuid, TargetChanges, TargetedDiscount, diff_targets,
        plan_targets, validate_amount, validate_window,
    },
    products::ProductUuid,
};
use tracing::{Span, info, warn};

use crate::{
    domain::discounts::{
        data::{
            DiscountDetails, DiscountPage, DiscountQuery, DiscountUpdate, NewDiscount,
            existing_scope,
        },
        errors::DiscountsServiceError,
        repository::DiscountsRepository,
    },
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone)]
pub struct StoreDiscountsService<S> {
    store: S,
}

impl<S: Store> StoreDiscountsService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

fn validate(discount: &Discount) -> Result<(), DiscountsServiceError> {
    if discount.name.trim().is_empty() {
        return Err(DiscountsServiceError::InvalidInput(
            "discount name cannot be empty".to_string(),
        ));
    }

    validate_window(discount.started_at, discount.expires_at)?;
    validate_amount(discount.kind, discount.amount)?;

    Ok(())
}

// Each step runs on its own; a failed step is logged and the rest still apply.
async fn apply_target_changes<T: DiscountsRepository>(
    tx: &mut T,
    discount: DiscountUuid,
    changes: &TargetChanges,
) -> usize {
    let mut skipped = 0;

    for target in &changes.remove {
        if let Err(error) = tx.delete_target(*target).await {
            warn!(discount_uuid = %discount, target_uuid = %target, %error, "failed to remove discount target");
            skipped += 1;
        }
    }

    for update in &changes.update {
        if let Err(error) = tx.update_target(update).await {
            warn!(discount_uuid = %discount, target_uuid = %update.uuid, %error, "failed to update discount target");
            skipped += 1;
        }
    }

    for target in &changes.create {
        if let Err(error) = tx.create_target(discount, target).await {
            warn!(discount_uuid = %discount, target_uuid = %target.uuid, %error, "failed to create discount target");
            skipped += 1;
        }
    }

    skipped
}

#[async_trait]
impl<S: Store> DiscountsService for StoreDiscountsService<S> {
    #[tracing::instrument(
        name = "discounts.service.create_discount",
        skip(self, discount),
        fields(discount_uuid = %discount.uuid, target_count = tracing::field::Empty),
        err
    )]
    async fn create_discount(
        &self,
        discount: NewDiscount,
    ) -> Result<DiscountDetails, DiscountsServiceError> {
        let row = discount.discount();

        validate(&row)?;

        let scope = DiscountScope::from_parts(discount.category, discount.products)?;
        let targets = plan_targets(&scope, discount.priority);

        let mut tx = self.store.begin().await?;

        tx.create_discount(&row).await?;

        for target in &targets {
            tx.create_target(row.uuid, target).await?;
        }

        let targets = tx.list_targets(row.uuid).await?;

        tx.commit().await?;

        Span::current().record("target_count", targets.len());

        info!(discount_uuid = %row.uuid, "created discount");

        Ok(DiscountDetails {
            discount: row,
            targets,
        })
    }

    #[tracing::instrument(
        name = "discounts.service.update_discount",
        skip(self, update),
        fields(discount_uuid = %discount, skipped_targets = tracing::field::Empty),
        err
    )]
    async fn update_discount(
        &self,
        discount: DiscountUuid,
        update: DiscountUpdate,
    ) -> Result<DiscountDetails, DiscountsServiceError> {
        let requested_scope = update.scope()?;

        let mut tx = self.store.begin().await?;

        let current = tx.get_discount(discount).await?;

        let row = update.apply(&current);

        validate(&row)?;

        if tx.update_discount(&row).await? == 0 {
            return Err(DiscountsServiceError::NotFound);
        }

        if update.touches_targets() {
            let existing = tx.list_targets(discount).await?;

            let scope = requested_scope.or_else(|| existing_scope(&existing));

            if let Some(scope) = scope {
                let changes = diff_targets(&existing, &scope, row.priority);

                let skipped = apply_target_changes(&mut tx, discount, &changes).await;

                Span::current().record("skipped_targets", skipped);
            }
        }

        let targets = tx.list_targets(discount).await?;

        tx.commit().await?;

        info!(discount_uuid = %discount, "updated discount");

        Ok(DiscountDetails {
            discount: row,
            targets,
        })
    }

    #[tracing::instrument(
        name = "discounts.service.remove_discount",
        skip(self),
        fields(discount_uuid = %discount),
        err
    )]
    async fn remove_discount(&self, discount: DiscountUuid) -> Result<DiscountDetails, DiscountsServiceError> {
        let mut tx = self.store.begin().await?;

        if tx.archive_discount(discount).await? == 0 {
            return Err(DiscountsServiceError::NotFound);
        }

        let row = tx.get_discount(discount).await?;
        let targets = tx.list_targets(discount).await?;

        tx.commit().await?;

        info!(discount_uuid = %discount, "archived discount");

        Ok(DiscountDetails {
            discount: row,
            targets,
        })
    }

    #[tracing::instrument(
        name = "discounts.service.get_discount",
        skip(self),
        fields(discount_uuid = %discount),
        err
    )]
    async fn get_discount(&self, discount: DiscountUuid) -> Result<DiscountDetails, DiscountsServiceError> {
        let mut tx = self.store.begin().await?;

        let row = tx.get_discount(discount).await?;
        let targets = tx.list_targets(discount).await?;

        tx.commit().await?;

        Ok(DiscountDetails {
            discount: row,
            targets,
        })
    }

    #[tracing::instrument(
        name = "discounts.service.list_discounts",
        skip(self),
        fields(count = tracing::field::Empty),
        err
    )]
    async fn list_discounts(
        &self,
        query: DiscountQuery,
        point_in_time: Timestamp,
    ) -> Result<DiscountPage, DiscountsServiceError> {
        let active_at = query.active_only.then_some(point_in_time);

        let mut tx = self.store.begin().await?;

        let discounts = tx.list_discounts(query.take, query.skip, active_at).await?;
        let count = tx.count_discounts(active_at).await?;

        let mut items = Vec::with_capacity(discounts.len());

        for discount in discounts {
            let targets = tx.list_targets(discount.uuid).await?;

            items.push(DiscountDetails { discount, targets });
        }

        tx.commit().await?;

        Span::current().record("count", count);

        Ok(DiscountPage { items, count })
    }

    #[tracing::instrument(
        name = "discounts.service.active_for_product",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn active_for_product(
        &self,
        product: ProductUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, DiscountsServiceError> {
        let mut tx = self.store.begin().await?;

        let active = tx.active_for_products(&[product], point_in_time).await?;

        tx.commit().await?;

        Ok(active)
    }

    #[tracing::instrument(
        name = "discounts.service.active_for_category",
        skip(self),
        fields(category_uuid = %category),
        err
    )]
    async fn active_for_category(
        &self,
        category: CategoryUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, DiscountsServiceError> {
        let mut tx = self.store.begin().await?;

        let active = tx.active_for_categories(&[category], point_in_time).await?;

        tx.commit().await?;

        Ok(active)
    }
}

#[automock]
#[async_trait]
pub trait DiscountsService: Send + Sync {
    /// Create a discount and one target per scoped product, or a single
    /// category target.
    async fn create_discount(
        &self,
        discount: NewDiscount,
    ) -> Result<DiscountDetails, DiscountsServiceError>;

    /// Update a discount and reconcile its targets with the requested scope.
    async fn update_discount(
        &self,
        discount: DiscountUuid,
        update: DiscountUpdate,
    ) -> Result<DiscountDetails, DiscountsServiceError>;

    /// Archive a discount.
    async fn remove_discount(&self, discount: DiscountUuid) -> Result<DiscountDetails, DiscountsServiceError>;

    /// One discount with its targets.
    async fn get_discount(&self, discount: DiscountUuid) -> Result<DiscountDetails, DiscountsServiceError>;

    /// A page of discounts, largest amount first.
    async fn list_discounts(
        &self,
        query: DiscountQuery,
        point_in_time: Timestamp,
    ) -> Result<DiscountPage, DiscountsServiceError>;

    /// Active discounts targeting the product directly, by priority.
    async fn active_for_product(
        &self,
        product: ProductUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, DiscountsServiceError>;

    /// Active discounts targeting the category directly, by priority.
    async fn active_for_category(
        &self,
        category: CategoryUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, DiscountsServiceError>;
}
