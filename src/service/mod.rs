//! Asset lifecycle services
//!
//! Each service holds the store it works on and exposes one operation. All
//! mutating operations take a [`Grant`](crate::auth::Grant), so they can only
//! be reached after the token validator has accepted the caller.

pub mod collector;
pub mod deletion_service;
pub mod ingest_service;
pub mod naming;
pub mod staging_sweeper;
