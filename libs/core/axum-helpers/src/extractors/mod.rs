//! Extractors that answer with [`AppError`](crate::errors::AppError) bodies on rejection.

pub mod uuid_path;
pub mod validated_json;

pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
