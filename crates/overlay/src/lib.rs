//! Decides which modded file serves each file a game asks for.
//!
//! Packages contribute files through an [`OverrideMapping`](mapping::OverrideMapping), the
//! [`FileResolver`](resolver::FileResolver) picks a winner per virtual path using
//! [`wildcard`] patterns and priorities, and a [`CacheDirectory`](cache::CacheDirectory) hands out
//! scratch space for files merged from several overrides.

pub mod cache;
pub mod mapping;
pub mod resolver;
pub mod wildcard;

pub use cache::{CacheConfig, CacheDirectory};
pub use mapping::OverrideMapping;
pub use resolver::{FileResolver, OverrideCandidate, Resolution};
