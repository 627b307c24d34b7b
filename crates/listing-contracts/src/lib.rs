pub mod chat;
pub mod events;
pub mod listing;
pub mod schema;
pub mod vocabulary;

pub use listing::{ListingRecord, VocabularyFinding, MAX_TAGS};
pub use vocabulary::Vocabulary;
