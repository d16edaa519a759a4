//! Reading and writing declaration records in JSON-lines format.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::{
    api::native::Record,
    error::{GenerationError, Result},
};

/// Write a collection of records to a file in JSON-lines format
pub fn write_jsonl_file<P: AsRef<Path>>(file_path: P, records: &[Record]) -> Result<()> {
    let mut file = fs::File::create(&file_path)?;
    for record in records {
        let json_line = record.to_jsonl_string()?;
        writeln!(file, "{json_line}")?;
    }
    file.flush()?;
    Ok(())
}

/// Read records from a JSON-lines file
pub fn read_jsonl_file<P: AsRef<Path>>(file_path: P) -> Result<Vec<Record>> {
    let content = fs::read_to_string(&file_path)?;
    let mut records = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: Record =
            serde_json::from_str(line).map_err(|source| GenerationError::InvalidRecord {
                path: file_path.as_ref().display().to_string(),
                line: line_num + 1,
                source,
            })?;
        records.push(record);
    }

    Ok(records)
}
