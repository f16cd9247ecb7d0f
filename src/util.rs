//! Shared utility modules used across the search core.

pub mod bitmap;
pub mod levenshtein;
pub mod soundex;

pub use self::bitmap::Bitmap;
