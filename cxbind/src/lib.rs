//! # cxbind
//!
//! Generates idiomatic Rust wrappers around the raw libclang bindings.
//!
//! ## Problem
//!
//! The raw bindings expose libclang as it is: `CXString` values which must be disposed
//! after reading, `unsigned` results which are really truth flags, results returned
//! through pointer parameters, arrays described by a pointer and a separate count field.
//! Writing a safe layer over hundreds of such functions by hand is tedious and error
//! prone.
//!
//! ## Solution
//!
//! An extractor walks the libclang headers and records every declaration as one JSON
//! line (see [`native::Record`]). `cxbind` reads those records and, following the naming
//! conventions of the library, synthesizes for each of them:
//!
//! - a method on the wrapper of its first parameter, or a free function,
//! - string marshalling with guaranteed release of every temporary,
//! - out-parameters promoted to additional return values,
//! - getters for struct members and slice accessors for array members.
//!
//! A declaration which cannot be translated is reported and skipped; it never aborts
//! the run.
//!
//! ## Usage example
//!
//! ```rust,no_run
//! // build.rs
//! use cxbind::{Generator, Report, Source};
//!
//! fn main() {
//!     let source = Source::new("declarations").unwrap();
//!     let generator = Generator::builder()
//!         .ffi_module("clang_sys")
//!         .build()
//!         .unwrap();
//!
//!     let report: Report = source.declarations().map(generator.into_closure()).collect();
//!     report.emit_cargo_warnings();
//!     report.into_destination().write("clang.rs").unwrap();
//! }
//! ```
//!
//! ```rust,ignore
//! // lib.rs
//! include!(concat!(env!("OUT_DIR"), "/clang.rs"));
//! ```

pub(crate) mod api;
pub(crate) mod codegen;
pub mod error;
pub(crate) mod utils;

pub use crate::api::generator::{Builder, Generator};
pub use crate::api::report::{Failure, Outcome, Report};
pub use crate::api::source::Source;
pub use crate::codegen::emit::GeneratedItem;
pub use crate::error::{GenerationError, Result};

/// The declaration model written by extractors
pub mod native {
    pub use crate::api::native::{
        DeclarationRef, NativeDeclaration, NativeField, NativeFunction, NativeParameter,
        NativeStruct, NativeType, Record, SourceLocation, TypeKind,
    };
    pub use crate::utils::jsonl::{read_jsonl_file, write_jsonl_file};
}

/// The abstract description of generated callables, before rendering
pub mod model {
    pub use crate::codegen::model::*;
    pub use crate::codegen::types::{TypeDescriptor, TypeMapper, ValueShape};
}

/// Collectors for sequences of generated items produced by `collect`
pub mod collect {
    pub use crate::api::collect::destination::Destination;
}

/// Print a warning shown by cargo when called from a build script
#[macro_export]
macro_rules! cargo_warning {
    ($($arg:tt)*) => {
        println!("cargo:warning={}", format!($($arg)*))
    };
}
