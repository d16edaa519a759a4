use std::{collections::HashMap, fs, path::Path};

use roxygen::roxygen;

use crate::{
    api::native::{NativeDeclaration, Record, SourceLocation},
    error::Result,
    utils::jsonl::read_jsonl_file,
};

/// File extension for declaration files
const JSONL_EXTENSION: &str = ".jsonl";

/// Declarations reported by the introspection facility, deduplicated by name.
///
/// A header included from several translation units reports the same declaration
/// several times; the last report wins, at the position of the first one.
pub struct Source {
    records: Vec<Record>,
}

impl Source {
    /// Read every `*.jsonl` file of a directory, in file name order
    #[roxygen]
    pub fn new<P: AsRef<Path>>(
        /// Directory containing declaration files written by an extractor
        input_dir: P,
    ) -> Result<Self> {
        let input_dir = input_dir.as_ref();
        let mut paths = fs::read_dir(input_dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(JSONL_EXTENSION))
            })
            .collect::<Vec<_>>();
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            #[cfg(feature = "debug")]
            println!("Reading declaration file: {}", path.display());
            records.extend(read_jsonl_file(&path)?);
        }
        log::debug!("read {} records from {}", records.len(), input_dir.display());
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut deduplicated: Vec<Record> = Vec::new();
        for record in records {
            match positions.get(record.declaration.name()) {
                Some(&index) => deduplicated[index] = record,
                None => {
                    positions.insert(record.declaration.name().to_string(), deduplicated.len());
                    deduplicated.push(record);
                }
            }
        }
        Self {
            records: deduplicated,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn declarations(&self) -> impl Iterator<Item = (NativeDeclaration, SourceLocation)> + '_ {
        self.records
            .iter()
            .map(|r| (r.declaration.clone(), r.location.clone()))
    }
}
