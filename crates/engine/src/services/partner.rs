//! Orders as seen by the shop that fulfils them.

use tradepost_core::UserRole;
use tradepost_core::views::OrderView;

use crate::error::Result;
use crate::identity::AuthContext;
use crate::query::assemble_orders;
use crate::store::{OrderScope, OrderStore};

/// Partner service.
pub struct PartnerService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> PartnerService<'a, S>
where
    S: OrderStore + ?Sized,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Placed orders with at least one item from a shop the caller owns.
    ///
    /// The whole order is returned, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-shop accounts, plus authentication and store errors.
    pub async fn list_orders(&self, ctx: &AuthContext) -> Result<Vec<OrderView>> {
        let partner = ctx.require_role(UserRole::Shop)?.user_id;
        let rows = self.store.order_rows(OrderScope::Partner(partner)).await?;
        let orders = assemble_orders(rows);
        tracing::debug!(%partner, count = orders.len(), "Listed partner orders");
        Ok(orders)
    }
}
