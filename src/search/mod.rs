// Keyword/tag lookup and latent semantic similarity search.

pub mod index;
pub mod interpret;
pub mod keyword;
pub mod lsi;
pub mod similarity;

pub use keyword::{DocSource, KeySearch};
pub use similarity::{ScoredDoc, SimSearch, TagMatches};
