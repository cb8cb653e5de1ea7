pub mod record;
pub mod statement;

pub use record::PostRecord;
pub use statement::{CandidateStatement, Resolution};
