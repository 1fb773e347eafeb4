//! Cart lines, stock clamping and totals

use rusty_money::{Money, iso::Currency};

use super::{Cart, CartItem, CartItemUuid, CartUuid, GuestToken};
use crate::{
    money::{line_total, sum},
    pricing::{PriceResolver, PricedProduct, PricingError},
    products::Product,
};

/// A cart line loaded together with its product.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine<'a> {
    /// The stored line
    pub item: CartItem,

    /// Its product, as currently stocked and priced
    pub product: Product<'a>,
}

/// A line whose count was lowered to the units in stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockClamp {
    /// Line that was clamped
    pub item: CartItemUuid,

    /// Count before clamping
    pub from: u32,

    /// Count after clamping
    pub to: u32,
}

/// A priced cart line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine<'a> {
    /// The line, with its count already clamped
    pub item: CartItem,

    /// The product with its resolved price
    pub priced: PricedProduct<'a>,

    /// `effective_price * count`
    pub line_total: Money<'a, Currency>,
}

/// Split lines into available (published, in stock) and archived (out of
/// stock). Unpublished lines are left out of both.
pub fn partition_lines<'a>(
    lines: impl IntoIterator<Item = CartLine<'a>>,
) -> (Vec<CartLine<'a>>, Vec<CartLine<'a>>) {
    lines
        .into_iter()
        .filter(|line| line.product.is_published)
        .partition(|line| !line.product.is_archived)
}

/// Lower every non-archived line's count to the product's stock.
///
/// Archived lines keep their count so the customer still sees what they
/// asked for. Returns one entry per line that changed.
pub fn clamp_to_stock(lines: &mut [CartLine<'_>]) -> Vec<StockClamp> {
    lines
        .iter_mut()
        .filter(|line| !line.product.is_archived)
        .filter_map(|line| {
            let from = line.item.count;
            let to = line.product.clamp_to_stock(from);

            (to != from).then(|| {
                line.item.count = to;

                StockClamp {
                    item: line.item.uuid,
                    from,
                    to,
                }
            })
        })
        .collect()
}

/// Price each line at its current count.
///
/// # Errors
///
/// Returns [`PricingError`] if any price computation overflows.
pub fn price_lines<'a>(
    resolver: &PriceResolver<'_>,
    lines: &[CartLine<'a>],
) -> Result<Vec<PricedLine<'a>>, PricingError> {
    lines
        .iter()
        .map(|line| {
            let priced = resolver.resolve(&line.product)?;
            let line_total = line_total(&priced.effective_price, line.item.count)?;

            Ok(PricedLine {
                item: line.item,
                priced,
                line_total,
            })
        })
        .collect()
}

/// Sum of line totals.
///
/// # Errors
///
/// Returns [`PricingError`] if a line is in another currency.
pub fn lines_total<'a>(
    currency: &'a Currency,
    lines: &[PricedLine<'a>],
) -> Result<Money<'a, Currency>, PricingError> {
    Ok(sum(currency, lines.iter().map(|line| line.line_total))?)
}

/// Clamp stored counts and compute the total that is persisted on the cart.
///
/// Every non-archived line counts towards the total.
///
/// # Errors
///
/// Returns [`PricingError`] if any price computation overflows.
pub fn recompute_total<'a>(
    resolver: &PriceResolver<'_>,
    currency: &'a Currency,
    lines: &mut [CartLine<'a>],
) -> Result<(Vec<StockClamp>, Money<'a, Currency>), PricingError> {
    let clamps = clamp_to_stock(lines);

    let billable: Vec<CartLine<'a>> = lines
        .iter()
        .filter(|line| !line.product.is_archived)
        .cloned()
        .collect();

    let priced = price_lines(resolver, &billable)?;

    Ok((clamps, lines_total(currency, &priced)?))
}

/// What a customer sees when opening their cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView<'a> {
    /// Cart id, `None` when there is no cart yet
    pub cart: Option<CartUuid>,

    /// Guest token to hand back to the client, if one is in use
    pub token: Option<GuestToken>,

    /// Lines that can be ordered, counts clamped to stock
    pub available: Vec<PricedLine<'a>>,

    /// Out of stock lines, excluded from the total
    pub archived: Vec<PricedLine<'a>>,

    /// Sum of available line totals
    pub total: Money<'a, Currency>,
}

impl<'a> CartView<'a> {
    /// A view with no cart behind it.
    pub fn empty(currency: &'a Currency) -> Self {
        Self {
            cart: None,
            token: None,
            available: Vec::new(),
            archived: Vec::new(),
            total: Money::from_decimal(rust_decimal::Decimal::ZERO, currency),
        }
    }

    /// Build the view of `cart` from its lines.
    ///
    /// Counts are clamped in the view only; nothing is written back.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if any price computation overflows.
    pub fn build(
        cart: &Cart,
        lines: Vec<CartLine<'a>>,
        resolver: &PriceResolver<'_>,
        currency: &'a Currency,
    ) -> Result<Self, PricingError> {
        let (mut available, archived) = partition_lines(lines);

        clamp_to_stock(&mut available);

        let available = price_lines(resolver, &available)?;
        let archived = price_lines(resolver, &archived)?;
        let total = lines_total(currency, &available)?;

        Ok(Self {
            cart: Some(cart.uuid),
            token: cart.token,
            available,
            archived,
            total,
        })
    }

    /// Whether there is nothing to order.
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::RUB;
    use testresult::TestResult;

    use super::*;
    use crate::{
        carts::CartUuid,
        categories::CategoryTree,
        money::money,
        pricing::DiscountIndex,
        products::{ProductUuid, derive_archived},
    };

    fn line(cart: CartUuid, price: i64, count: u32, stock: Option<u32>) -> CartLine<'static> {
        let product = Product {
            uuid: ProductUuid::new(),
            category: None,
            price: money(Decimal::new(price, 0), RUB),
            discount_price: None,
            count: stock,
            is_archived: derive_archived(stock),
            is_published: true,
        };

        CartLine {
            item: CartItem {
                uuid: CartItemUuid::new(),
                cart,
                product: product.uuid,
                count,
            },
            product,
        }
    }

    fn cart() -> Cart {
        Cart {
            uuid: CartUuid::new(),
            user: None,
            token: Some(GuestToken::new_random()),
            total: Decimal::ZERO,
        }
    }

    #[test]
    fn partition_hides_unpublished() {
        let cart = cart().uuid;
        let available = line(cart, 10, 1, Some(3));
        let archived = line(cart, 10, 1, Some(0));
        let mut hidden = line(cart, 10, 1, Some(3));
        hidden.product.is_published = false;

        let (left, right) = partition_lines([available.clone(), archived.clone(), hidden]);

        assert_eq!(left, vec![available]);
        assert_eq!(right, vec![archived]);
    }

    #[test]
    fn clamping_reports_changed_lines_only() {
        let cart = cart().uuid;
        let mut lines = vec![
            line(cart, 10, 5, Some(1)),
            line(cart, 10, 2, Some(3)),
            line(cart, 10, 4, None),
            line(cart, 10, 4, Some(0)),
        ];

        let clamps = clamp_to_stock(&mut lines);

        assert_eq!(clamps.len(), 1);
        assert_eq!(clamps.first().map(|clamp| (clamp.from, clamp.to)), Some((5, 1)));
        assert_eq!(lines.iter().map(|line| line.item.count).collect::<Vec<_>>(), vec![1, 2, 4, 4]);
    }

    #[test]
    fn view_clamps_in_memory_and_excludes_archived_from_total() -> TestResult {
        let cart = cart();
        let tree = CategoryTree::default();
        let index = DiscountIndex::default();
        let resolver = PriceResolver::new(&tree, &index);

        let lines = vec![
            line(cart.uuid, 100, 5, Some(1)),
            line(cart.uuid, 30, 2, None),
            line(cart.uuid, 999, 1, Some(0)),
        ];

        let view = CartView::build(&cart, lines, &resolver, RUB)?;

        assert_eq!(view.available.first().map(|line| line.item.count), Some(1));
        assert_eq!(view.archived.len(), 1);
        assert_eq!(view.total, money(Decimal::new(160, 0), RUB));
        assert_eq!(view.token, cart.token);

        Ok(())
    }

    #[test]
    fn recompute_total_clamps_and_sums_billable_lines() -> TestResult {
        let cart = cart().uuid;
        let tree = CategoryTree::default();
        let index = DiscountIndex::default();
        let resolver = PriceResolver::new(&tree, &index);

        let mut lines = vec![line(cart, 100, 3, Some(2)), line(cart, 50, 1, Some(0))];

        let (clamps, total) = recompute_total(&resolver, RUB, &mut lines)?;

        assert_eq!(clamps.len(), 1);
        assert_eq!(total, money(Decimal::new(200, 0), RUB));

        Ok(())
    }

    #[test]
    fn empty_view_totals_zero() {
        let view = CartView::empty(RUB);

        assert!(view.is_empty());
        assert_eq!(view.total, money(Decimal::ZERO, RUB));
    }
}
