pub mod cli;
pub mod config;
mod db;
pub mod error;
pub mod extractor;
pub mod features;
pub mod imdb;
pub mod index;
mod metrics;
pub mod reduce;
mod server;
pub mod utils;
pub mod verify;
pub mod vlad;
pub mod vocab;

pub use config::{ConfDir, Opts, PipelineConfig, VerifyOptions};
pub use error::{Error, Result};
pub use features::{Features, KeyPoint};
pub use imdb::{BuildStage, IMDB, IMDBBuilder, SearchResult};
pub use index::{ImageId, IndexKind, Neighbor, SignatureIndex};
pub use verify::{Candidate, Verified, Verifier};
pub use vocab::{CentroidVocabulary, Clusterer, KMeans, Vocabulary};
