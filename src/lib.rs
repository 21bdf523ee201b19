// simsearch: latent semantic similarity search over plain-text collections
//
// This is the library root. Each module corresponds to a stage of the
// retrieval pipeline: corpus construction, keyword and similarity search,
// document clustering, and terminal output.

pub mod cluster;
pub mod config;
pub mod corpus;
pub mod output;
pub mod search;
pub mod status;
