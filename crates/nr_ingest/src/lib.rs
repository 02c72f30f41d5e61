pub mod archive;
pub mod http;
pub mod markup;
pub mod parser;
pub mod service;

pub use archive::{read_package, ArchiveDescriptor, ArchiveSource};
pub use http::HttpArchiveSource;
pub use parser::{parse, parse_bytes, ParseFailure, ParserLabels};
pub use service::{merge, IngestReport, IngestionService};

pub mod prelude {
    pub use super::{ArchiveSource, IngestReport, IngestionService};
    pub use nr_core::{Article, Error, Result};
}
