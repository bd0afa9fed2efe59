pub mod error;
pub mod storage;
pub mod types;

pub use error::Error;
pub use storage::{ArticleStore, Upserted};
pub use types::{Article, ArticleSection, RunReport, SectionKind, SourceName};

pub type Result<T> = std::result::Result<T, Error>;
