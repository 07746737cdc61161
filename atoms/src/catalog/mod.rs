// Re-export model types and service functions
pub mod error;
pub mod http;
pub mod landing;
pub mod model;
pub mod service;

pub use error::CatalogError;
pub use http::*;
pub use landing::{LandingGuard, SweepGuard, SweepReport};
pub use model::{ImageRecord, MetadataPatch, TagsInput, UploadMetadata, UploadRequest};
pub use service::*;
