//! Cart ownership reconciliation
//!
//! When a request carries both a user and a guest token, the guest cart is
//! folded into the user's account: adopted outright when the user has no cart,
//! merged line by line otherwise. Planning is pure; the store applies it.

use rustc_hash::FxHashMap;

use super::{Cart, CartIdentity, CartItem, CartItemUuid, CartUuid, UserUuid};
use crate::products::ProductUuid;

/// A cart with its stored lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContents {
    /// The cart row
    pub cart: Cart,

    /// Its lines
    pub items: Vec<CartItem>,
}

/// Merging a guest cart into an existing user cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// User cart that survives
    pub into: CartUuid,

    /// Guest cart that is deleted afterwards
    pub from: CartUuid,

    /// Existing user lines whose count grows, with their new count
    pub increments: Vec<(CartItemUuid, u32)>,

    /// Products copied over as new lines, with their count
    pub additions: Vec<(ProductUuid, u32)>,

    /// Guest products left behind because the user cart is full
    pub dropped: Vec<ProductUuid>,
}

/// What to do with the carts found for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipPlan {
    /// Nothing to reconcile.
    Keep,

    /// Hand the guest cart to the user.
    Adopt {
        /// Guest cart
        cart: CartUuid,

        /// New owner
        user: UserUuid,
    },

    /// Fold the guest cart into the user's cart.
    Merge(MergePlan),
}

/// Decide how the user's cart and a guest cart relate.
///
/// `guest_cart` must come from a lookup that only matches carts without a
/// user. Once a plan is applied the guest cart either has a user or is gone,
/// so reconciling again yields [`OwnershipPlan::Keep`].
///
/// Merging sums counts for products on both carts and copies the rest while
/// there is room under `max_items` distinct lines; the remainder is dropped.
pub fn reconcile_ownership(
    user_cart: Option<&CartContents>,
    guest_cart: Option<&CartContents>,
    identity: CartIdentity,
    max_items: usize,
) -> OwnershipPlan {
    let (Some(user), Some(guest)) = (identity.user, guest_cart) else {
        return OwnershipPlan::Keep;
    };

    if guest.cart.user.is_some() {
        return OwnershipPlan::Keep;
    }

    let Some(owned) = user_cart else {
        return OwnershipPlan::Adopt {
            cart: guest.cart.uuid,
            user,
        };
    };

    if owned.cart.uuid == guest.cart.uuid {
        return OwnershipPlan::Keep;
    }

    let mut existing: FxHashMap<ProductUuid, &CartItem> = owned
        .items
        .iter()
        .map(|item| (item.product, item))
        .collect();

    let mut plan = MergePlan {
        into: owned.cart.uuid,
        from: guest.cart.uuid,
        ..MergePlan::default()
    };

    let mut lines = owned.items.len();

    for item in &guest.items {
        if let Some(current) = existing.remove(&item.product) {
            plan.increments
                .push((current.uuid, current.count.saturating_add(item.count)));
        } else if lines < max_items {
            plan.additions.push((item.product, item.count));
            lines += 1;
        } else {
            plan.dropped.push(item.product);
        }
    }

    OwnershipPlan::Merge(plan)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::carts::GuestToken;

    fn contents(user: Option<UserUuid>, products: &[(ProductUuid, u32)]) -> CartContents {
        let cart = Cart {
            uuid: CartUuid::new(),
            user,
            token: user.is_none().then(GuestToken::new_random),
            total: Decimal::ZERO,
        };

        let items = products
            .iter()
            .map(|(product, count)| CartItem {
                uuid: CartItemUuid::new(),
                cart: cart.uuid,
                product: *product,
                count: *count,
            })
            .collect();

        CartContents { cart, items }
    }

    #[test]
    fn guests_and_users_without_a_guest_cart_keep() {
        let guest = contents(None, &[]);
        let token = guest.cart.token.unwrap_or_default();

        assert_eq!(
            reconcile_ownership(None, Some(&guest), CartIdentity::guest(token), 30),
            OwnershipPlan::Keep
        );
        assert_eq!(
            reconcile_ownership(None, None, CartIdentity::user(UserUuid::new()), 30),
            OwnershipPlan::Keep
        );
    }

    #[test]
    fn user_without_cart_adopts_guest_cart() {
        let user = UserUuid::new();
        let guest = contents(None, &[(ProductUuid::new(), 1)]);
        let identity = CartIdentity::user(user).with_token(GuestToken::new_random());

        assert_eq!(
            reconcile_ownership(None, Some(&guest), identity, 30),
            OwnershipPlan::Adopt {
                cart: guest.cart.uuid,
                user,
            }
        );
    }

    #[test]
    fn merge_sums_shared_products_and_copies_the_rest() {
        let user = UserUuid::new();
        let shared = ProductUuid::new();
        let guest_only = ProductUuid::new();

        let owned = contents(Some(user), &[(shared, 2)]);
        let guest = contents(None, &[(shared, 3), (guest_only, 1)]);

        let OwnershipPlan::Merge(plan) =
            reconcile_ownership(Some(&owned), Some(&guest), CartIdentity::user(user), 30)
        else {
            panic!("expected a merge plan");
        };

        let shared_line = owned.items.first().map(|item| item.uuid);

        assert_eq!(plan.into, owned.cart.uuid);
        assert_eq!(plan.from, guest.cart.uuid);
        assert_eq!(plan.increments.first().map(|(uuid, count)| (Some(*uuid), *count)), Some((shared_line, 5)));
        assert_eq!(plan.additions, vec![(guest_only, 1)]);
        assert!(plan.dropped.is_empty());
    }

    #[test]
    fn merge_respects_line_ceiling() {
        let user = UserUuid::new();
        let owned = contents(Some(user), &[(ProductUuid::new(), 1), (ProductUuid::new(), 1)]);
        let overflow = ProductUuid::new();
        let guest = contents(None, &[(ProductUuid::new(), 1), (overflow, 1)]);

        let OwnershipPlan::Merge(plan) =
            reconcile_ownership(Some(&owned), Some(&guest), CartIdentity::user(user), 3)
        else {
            panic!("expected a merge plan");
        };

        assert_eq!(plan.additions.len(), 1);
        assert_eq!(plan.dropped, vec![overflow]);
    }

    #[test]
    fn adopted_guest_cart_is_kept_on_second_run() {
        let user = UserUuid::new();
        let mut guest = contents(None, &[(ProductUuid::new(), 1)]);
        guest.cart.user = Some(user);

        assert_eq!(
            reconcile_ownership(None, Some(&guest), CartIdentity::user(user), 30),
            OwnershipPlan::Keep
        );
    }
}
