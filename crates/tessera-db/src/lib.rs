#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

mod connect;
pub mod repo;
mod store;

pub use connect::{connect_mongo, ConnectError, MongoHandle, StoreOptions};
pub use store::{StoreError, UserStore};
