pub mod corpus;
pub mod hashed;
pub mod registry;
pub mod runtime;
pub mod tfidf;
pub mod traits;

pub use registry::{BackendRegistry, FALLBACK_BACKEND};
pub use traits::{BackendFactory, BackendSpec, Classifier, Device};
