//! Building blocks shared by the services: store retry, the reference
//! cache and page-strip arithmetic.

pub mod cache;
pub mod pagination;
pub mod retry;
