pub mod dependency;
pub mod package;
pub mod profile;

pub use profile::{ModProfile, ModProfileV1};
