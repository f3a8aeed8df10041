//! HTTP layer: router, auth middleware, handlers and error mapping

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod menu;
pub mod middleware;
pub mod reports;
pub mod routes;
pub mod sales;
pub mod staff;
pub mod users;

pub use routes::build_router;
