//! Order inspection and fulfillment commands.
//!
//! # Usage
//!
//! ```bash
//! tradepost order advance 42 confirmed
//! tradepost order list -e buyer@example.com
//! ```

use tradepost_core::{OrderId, OrderState};
use tradepost_engine::services::{AccountService, FulfillmentService, OrderService};
use tradepost_engine::{AuthContext, TracingSink};

use super::{CommandError, connect, print_json};

/// Move `order_id` to `state`.
///
/// # Errors
///
/// Returns an error for an unknown state or order, or an illegal transition.
pub async fn advance(order_id: i32, state: &str) -> Result<(), CommandError> {
    let next: OrderState = state.parse().map_err(CommandError::InvalidArgument)?;
    let (_, store) = connect().await?;
    let outcome = FulfillmentService::new(&store)
        .advance(OrderId::new(order_id), next)
        .await?;
    print_json(&outcome)
}

/// Print the placed orders of the account with `email`.
///
/// # Errors
///
/// Returns an error if the account does not exist or is inactive.
pub async fn list(email: &str) -> Result<(), CommandError> {
    let (_, store) = connect().await?;
    let sink = TracingSink;
    let ctx = AccountService::new(&store, &sink).resolve_email(email).await?;
    if ctx == AuthContext::Anonymous {
        return Err(CommandError::UnknownAccount(email.to_owned()));
    }
    let orders = OrderService::new(&store, &sink).list(&ctx).await?;
    print_json(&orders)
}
