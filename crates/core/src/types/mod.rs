//! Shared value types.

mod handle;
mod plan;
mod product;
mod shop;

pub use handle::{CollectionHandle, HandleError};
pub use plan::{Plan, PlanLimits, UnknownPlan};
pub use product::{ProductGid, ProductGidError};
pub use shop::{ShopDomain, ShopDomainError};
