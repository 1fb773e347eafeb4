//! Orders
//!
//! An order is an immutable snapshot of the available lines of a cart at
//! checkout, priced as they were at that moment.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    carts::{CartView, UserUuid, lines_total},
    discounts::{DiscountUuid, UnknownKind},
    pricing::PricingError,
    products::ProductUuid,
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<OrderMarker>;

/// Marker type for [`OrderUuid`].
#[derive(Debug)]
pub struct OrderMarker;

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItemMarker>;

/// Marker type for [`OrderItemUuid`].
#[derive(Debug)]
pub struct OrderItemMarker;

/// Longest accepted name part.
pub const MAX_NAME_LEN: usize = 50;

/// Order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Awaiting processing
    Pending,

    /// Accepted, to be paid on collection
    Created,

    /// Paid online
    Paid,

    /// Cancelled
    Cancelled,
}

impl OrderStatus {
    /// Stable string form, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "CREATED" => Ok(Self::Created),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Contact details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDetails {
    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Optional middle name
    pub middle_name: Option<String>,

    /// Contact email
    pub email: String,

    /// Contact phone
    pub phone: String,

    /// Delivery address, if not collected in store
    pub address: Option<String>,

    /// Free-form note from the customer
    pub comment: Option<String>,
}

impl CustomerDetails {
    /// Check the details are usable for contacting the customer.
    ///
    /// # Errors
    ///
    /// Returns [`OrderAssemblyError::InvalidCustomer`] naming the first bad field.
    pub fn validate(&self) -> Result<(), OrderAssemblyError> {
        let name_ok = |name: &str| (2..=MAX_NAME_LEN).contains(&name.trim().chars().count());

        if !name_ok(&self.first_name) {
            return Err(OrderAssemblyError::InvalidCustomer("first_name"));
        }

        if !name_ok(&self.last_name) {
            return Err(OrderAssemblyError::InvalidCustomer("last_name"));
        }

        if self
            .middle_name
            .as_deref()
            .is_some_and(|middle| middle.chars().count() > MAX_NAME_LEN)
        {
            return Err(OrderAssemblyError::InvalidCustomer("middle_name"));
        }

        if !self.email.contains('@') {
            return Err(OrderAssemblyError::InvalidCustomer("email"));
        }

        if self.phone.trim().is_empty() {
            return Err(OrderAssemblyError::InvalidCustomer("phone"));
        }

        Ok(())
    }
}

/// One ordered product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    /// Line id
    pub uuid: OrderItemUuid,

    /// Product ordered
    pub product: ProductUuid,

    /// Units ordered
    pub count: u32,

    /// Effective unit price at checkout
    pub unit_price: Decimal,

    /// Discount applied to the unit price, if any
    pub discount: Option<DiscountUuid>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Order id
    pub uuid: OrderUuid,

    /// Ordering user, `None` for guest checkouts
    pub user: Option<UserUuid>,

    /// Contact details
    pub customer: CustomerDetails,

    /// Sum of line totals
    pub total: Decimal,

    /// Lifecycle state
    pub status: OrderStatus,

    /// Placement time
    pub created_at: Timestamp,

    /// Ordered lines
    pub items: Vec<OrderLine>,
}

/// Reasons a cart cannot be turned into an order.
#[derive(Debug, Error, PartialEq)]
pub enum OrderAssemblyError {
    /// No available lines in the cart.
    #[error("cart has no available items")]
    EmptyCart,

    /// A customer field failed validation.
    #[error("invalid customer {0}")]
    InvalidCustomer(&'static str),

    /// Totalling the lines failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Snapshot the available lines of `view` into a new [`OrderStatus::Created`] order.
///
/// # Errors
///
/// - [`OrderAssemblyError::EmptyCart`] when nothing is available to order.
/// - [`OrderAssemblyError::InvalidCustomer`] when contact details are unusable.
/// - [`OrderAssemblyError::Pricing`] when totalling fails.
pub fn assemble_order(
    view: &CartView<'_>,
    user: Option<UserUuid>,
    customer: CustomerDetails,
    created_at: Timestamp,
) -> Result<Order, OrderAssemblyError> {
    if view.is_empty() {
        return Err(OrderAssemblyError::EmptyCart);
    }

    customer.validate()?;

    let items = view
        .available
        .iter()
        .map(|line| OrderLine {
            uuid: OrderItemUuid::new(),
            product: line.item.product,
            count: line.item.count,
            unit_price: *line.priced.effective_price.amount(),
            discount: line.priced.applied.as_ref().map(|applied| applied.discount),
        })
        .collect();

    let total = lines_total(view.total.currency(), &view.available)?;

    Ok(Order {
        uuid: OrderUuid::new(),
        user,
        customer,
        total: *total.amount(),
        status: OrderStatus::Created,
        created_at,
        items,
    })
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::RUB;
    use testresult::TestResult;

    use super::*;
    use crate::{
        carts::{Cart, CartItem, CartItemUuid, CartLine, CartUuid},
        categories::CategoryTree,
        money::money,
        pricing::{DiscountIndex, PriceResolver},
        products::Product,
    };

    fn customer() -> CustomerDetails {
        CustomerDetails {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79990001122".to_string(),
            ..CustomerDetails::default()
        }
    }

    fn view_with(lines: &[(i64, u32)]) -> Result<CartView<'static>, PricingError> {
        let cart = Cart {
            uuid: CartUuid::new(),
            user: None,
            token: None,
            total: Decimal::ZERO,
        };

        let lines = lines
            .iter()
            .map(|(price, count)| {
                let product = Product {
                    uuid: ProductUuid::new(),
                    category: None,
                    price: money(Decimal::new(*price, 0), RUB),
                    discount_price: None,
                    count: None,
                    is_archived: false,
                    is_published: true,
                };

                CartLine {
                    item: CartItem {
                        uuid: CartItemUuid::new(),
                        cart: cart.uuid,
                        product: product.uuid,
                        count: *count,
                    },
                    product,
                }
            })
            .collect();

        let tree = CategoryTree::default();
        let index = DiscountIndex::default();

        CartView::build(&cart, lines, &PriceResolver::new(&tree, &index), RUB)
    }

    #[test]
    fn snapshots_lines_and_total() -> TestResult {
        let view = view_with(&[(100, 2), (15, 3)])?;

        let order = assemble_order(&view, None, customer(), Timestamp::now())?;

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total, Decimal::new(245, 0));
        assert_eq!(
            order.items.iter().map(|line| (line.count, line.unit_price)).collect::<Vec<_>>(),
            vec![(2, Decimal::new(100, 0)), (3, Decimal::new(15, 0))]
        );

        Ok(())
    }

    #[test]
    fn empty_cart_is_rejected() -> TestResult {
        let view = view_with(&[])?;

        assert_eq!(
            assemble_order(&view, None, customer(), Timestamp::now()),
            Err(OrderAssemblyError::EmptyCart)
        );

        Ok(())
    }

    #[test]
    fn customer_fields_are_checked() {
        let mut details = customer();
        details.email = "not-an-email".to_string();

        assert_eq!(details.validate(), Err(OrderAssemblyError::InvalidCustomer("email")));

        let mut details = customer();
        details.first_name = "A".to_string();

        assert_eq!(details.validate(), Err(OrderAssemblyError::InvalidCustomer("first_name")));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }
}
