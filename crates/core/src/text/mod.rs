//! Pure text helpers used by the renderer.

pub mod sanitize;
pub mod summary;

pub use sanitize::sanitize;
pub use summary::{DescriptionRules, ResultCard, derive_description, derive_title};
