use itertools::Itertools;

use crate::{
    api::{collect::destination::Destination, native::SourceLocation},
    codegen::emit::GeneratedItem,
    error::GenerationError,
};

/// A declaration the generator had to skip, and why
#[derive(Debug)]
pub struct Failure {
    pub declaration: String,
    pub location: SourceLocation,
    pub error: GenerationError,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.declaration, self.location, self.error)
    }
}

/// Outcome of generating one declaration
pub type Outcome = Result<Vec<(GeneratedItem, SourceLocation)>, Failure>;

/// Aggregated result of a generation run.
///
/// A failing declaration never stops the run; it is recorded here and the remaining
/// declarations are still generated.
#[derive(Debug, Default)]
pub struct Report {
    items: Vec<(GeneratedItem, SourceLocation)>,
    failures: Vec<Failure>,
}

impl FromIterator<Outcome> for Report {
    fn from_iter<T: IntoIterator<Item = Outcome>>(iter: T) -> Self {
        let (items, failures): (Vec<_>, Vec<_>) = iter.into_iter().partition_result();
        Self {
            items: items.into_iter().flatten().collect(),
            failures,
        }
    }
}

impl Report {
    pub fn items(&self) -> &[(GeneratedItem, SourceLocation)] {
        &self.items
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Whether every declaration was generated
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Log every failure as a warning
    pub fn log_failures(&self) {
        for failure in &self.failures {
            log::warn!("skipped {failure}");
        }
    }

    /// Report every failure to cargo from a build script
    pub fn emit_cargo_warnings(&self) {
        for failure in &self.failures {
            crate::cargo_warning!("skipped {failure}");
        }
    }

    pub fn into_destination(self) -> Destination {
        self.items.into_iter().collect()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "generated {} items, skipped {} declarations",
            self.items.len(),
            self.failures.len()
        )
    }
}
