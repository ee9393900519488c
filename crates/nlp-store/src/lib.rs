// Document sources
//
// - InMemoryDocumentStore: documents keyed by (index, id), for tests and examples
// - FsDocumentSource: one file per document under <root>/<index>/<id>

pub mod fs;
pub mod language_guess;
pub mod memory;

pub use fs::FsDocumentSource;
pub use language_guess::guess_language;
pub use memory::InMemoryDocumentStore;
