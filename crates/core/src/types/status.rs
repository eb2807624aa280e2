//! Order lifecycle and account roles.
//!
//! ```text
//! basket ──place──▶ new ──▶ confirmed ──▶ assembled ──▶ sent ──▶ delivered
//!                    │          │             │           │
//!                    └──────────┴─────────────┴───────────┴──▶ canceled
//! ```
//!
//! Only `basket → new` is driven by the buyer; the rest belongs to fulfillment.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// State of an order. A `Basket` order is the buyer's draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[default]
    Basket,
    New,
    Confirmed,
    Assembled,
    Sent,
    Delivered,
    Canceled,
}

impl OrderState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Basket,
        Self::New,
        Self::Confirmed,
        Self::Assembled,
        Self::Sent,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basket => "basket",
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Assembled => "assembled",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    /// `delivered` and `canceled` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }

    /// The next state on the happy path, if any.
    #[must_use]
    pub const fn next_fulfillment_step(self) -> Option<Self> {
        match self {
            Self::Basket => Some(Self::New),
            Self::New => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Assembled),
            Self::Assembled => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered | Self::Canceled => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// A basket can only be placed; it is never canceled (it is emptied
    /// instead).
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Canceled {
            return self != Self::Basket;
        }
        self.next_fulfillment_step() == Some(next)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("invalid order state: {s}"))
    }
}

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// A partner that uploads catalogs and receives orders.
    Shop,
    /// A customer that builds baskets and places orders.
    #[default]
    Buyer,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shop => write!(f, "shop"),
            Self::Buyer => write!(f, "buyer"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shop" => Ok(Self::Shop),
            "buyer" => Ok(Self::Buyer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
