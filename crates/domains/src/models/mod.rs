//! # Domain Models
//!
//! These structs represent the core entities of IdeaShare.
//! Ideas, users and reports use UUIDs; reference data (tags, tech stacks)
//! uses integer ids assigned by the store.

pub mod idea;
pub mod listing;
pub mod profile;
pub mod report;
pub mod tag;
pub mod viewer;
pub mod vote;

pub use idea::*;
pub use listing::*;
pub use profile::*;
pub use report::*;
pub use tag::*;
pub use viewer::*;
pub use vote::*;
