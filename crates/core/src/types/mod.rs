//! Value types shared by every Tradepost component.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, Quantity};
pub use status::*;
