//! CLI command implementations

pub mod cache;
pub mod cart;
pub mod config;
pub mod fetch;
pub mod push;
pub mod shop;
pub mod status;
pub mod subscribe;
pub mod sync;
pub mod worker;

pub use cache::execute as cache;
pub use cart::checkout;
pub use cart::execute as cart;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use push::execute as push;
pub use status::execute as status;
pub use subscribe::execute as subscribe;
pub use sync::execute as sync;
pub use worker::{activate, install};
