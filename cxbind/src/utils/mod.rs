pub mod doc;
pub mod jsonl;
