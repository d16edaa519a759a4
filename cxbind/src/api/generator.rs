//! The generation driver: classifies native declarations, lowers them into synthesis
//! results and renders those as Rust items.
//!
//! Declarations are independent of each other. A declaration which cannot be handled
//! yields a [`Failure`] and the run goes on with the next one.

use std::collections::{HashMap, HashSet};

use roxygen::roxygen;

use crate::{
    api::{
        native::{NativeDeclaration, SourceLocation},
        report::{Failure, Outcome, Report},
    },
    codegen::{
        accessor::{describe_struct, SliceMembers},
        emit::{Emitter, GeneratedItem},
        function::describe,
        model::{Descriptor, SynthesisResult},
        synthesize,
        types::TypeMapper,
    },
    error::{GenerationError, Result},
};

/// Builder for configuring [`Generator`] instances
///
/// # Example
///
/// ```
/// let generator = cxbind::Generator::builder()
///     .ffi_module("clang_sys")
///     .out_parameter("clang_tokenize", "NumTokens")
///     .slice_member("CXCodeCompleteResults", "Results", "NumResults")
///     .build()
///     .unwrap();
/// ```
pub struct Builder {
    library_prefix: String,
    function_prefix: String,
    disposable_string_type: String,
    timestamp_type: String,
    ffi_module: String,
    infer_out_parameters: bool,
    out_parameters: HashMap<String, Vec<String>>,
    free_functions: HashSet<String>,
    skipped: HashSet<String>,
    slice_members: HashMap<String, SliceMembers>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Builder with the naming conventions of libclang
    pub fn new() -> Self {
        Self {
            library_prefix: "CX".to_string(),
            function_prefix: "clang_".to_string(),
            disposable_string_type: "CXString".to_string(),
            timestamp_type: "time_t".to_string(),
            ffi_module: "ffi".to_string(),
            infer_out_parameters: true,
            out_parameters: HashMap::new(),
            free_functions: HashSet::new(),
            skipped: HashSet::new(),
            slice_members: HashMap::new(),
        }
    }

    /// Set the prefix trimmed from record, enum and typedef names
    #[roxygen]
    pub fn library_prefix<S: Into<String>>(
        mut self,
        /// Prefix such as `CX`; an underscore following it is trimmed as well
        prefix: S,
    ) -> Self {
        self.library_prefix = prefix.into();
        self
    }

    /// Set the prefix trimmed from function names
    #[roxygen]
    pub fn function_prefix<S: Into<String>>(
        mut self,
        /// Prefix such as `clang_`
        prefix: S,
    ) -> Self {
        self.function_prefix = prefix.into();
        self
    }

    /// Set the typedef holding strings which must be disposed after use
    #[roxygen]
    pub fn disposable_string_type<S: Into<String>>(
        mut self,
        /// Native type name, `CXString` by default
        name: S,
    ) -> Self {
        self.disposable_string_type = name.into();
        self
    }

    /// Set the typedef holding seconds since the epoch
    #[roxygen]
    pub fn timestamp_type<S: Into<String>>(
        mut self,
        /// Native type name, `time_t` by default
        name: S,
    ) -> Self {
        self.timestamp_type = name.into();
        self
    }

    /// Set the module through which the raw bindings are called
    #[roxygen]
    pub fn ffi_module<S: Into<String>>(
        mut self,
        /// Path of the module, e.g. `crate::sys`
        path: S,
    ) -> Self {
        self.ffi_module = path.into();
        self
    }

    /// Treat a pointer parameter of a function as an out-parameter
    ///
    /// Trailing non-const single-level pointers are detected on their own; this adds
    /// parameters the detection misses.
    #[roxygen]
    pub fn out_parameter<F: Into<String>, P: Into<String>>(
        mut self,
        /// Native function name
        function: F,
        /// Native parameter name
        parameter: P,
    ) -> Self {
        self.out_parameters
            .entry(function.into())
            .or_default()
            .push(parameter.into());
        self
    }

    /// Only use out-parameters configured with [`Builder::out_parameter`]
    pub fn disable_out_parameter_inference(mut self) -> Self {
        self.infer_out_parameters = false;
        self
    }

    /// Generate a function as a free function even if it has a receiver candidate
    #[roxygen]
    pub fn free_function<S: Into<String>>(
        mut self,
        /// Native function name
        function: S,
    ) -> Self {
        self.free_functions.insert(function.into());
        self
    }

    /// Generate nothing for a declaration
    #[roxygen]
    pub fn skip<S: Into<String>>(
        mut self,
        /// Native function or struct name
        name: S,
    ) -> Self {
        self.skipped.insert(name.into());
        self
    }

    /// Expose a pointer member of a struct as a slice sized by another member
    #[roxygen]
    pub fn slice_member<R: Into<String>, M: Into<String>, L: Into<String>>(
        mut self,
        /// Native struct name
        record: R,
        /// Pointer member holding the elements
        member: M,
        /// Integer member holding the element count
        length: L,
    ) -> Self {
        self.slice_members
            .entry(record.into())
            .or_default()
            .insert(member.into(), Some(length.into()));
        self
    }

    /// Expose a pointer member as a slice, locating its count member by naming convention
    ///
    /// Generation of the struct fails with [`GenerationError::UnresolvedArrayLength`] when
    /// no member is named like a count of `member`.
    #[roxygen]
    pub fn slice_member_with_derived_length<R: Into<String>, M: Into<String>>(
        mut self,
        /// Native struct name
        record: R,
        /// Pointer member holding the elements
        member: M,
    ) -> Self {
        self.slice_members
            .entry(record.into())
            .or_default()
            .insert(member.into(), None);
        self
    }

    /// Build the generator, validating the FFI module path
    pub fn build(self) -> Result<Generator> {
        let emitter = Emitter::new(&self.ffi_module)?;
        let mapper = TypeMapper::new(
            self.library_prefix.clone(),
            self.disposable_string_type.clone(),
            self.timestamp_type.clone(),
        );
        Ok(Generator {
            builder: self,
            mapper,
            emitter,
        })
    }
}

/// Turns native declarations into Rust wrapper items.
///
/// # Example
///
/// ```no_run
/// use cxbind::{Generator, Report, Source};
///
/// let source = Source::new("target/declarations").unwrap();
/// let generator = Generator::builder().build().unwrap();
///
/// let report = source
///     .declarations()
///     .map(generator.into_closure())
///     .collect::<Report>();
/// report.emit_cargo_warnings();
/// let bindings_file = report.into_destination().write("clang.rs").unwrap();
/// ```
pub struct Generator {
    builder: Builder,
    mapper: TypeMapper,
    emitter: Emitter,
}

impl Generator {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Classify a declaration and synthesize every callable it yields.
    ///
    /// Enums and typedefs yield nothing. Skipped declarations yield nothing.
    pub fn synthesize(&self, declaration: &NativeDeclaration) -> Result<Vec<SynthesisResult>> {
        if self.builder.skipped.contains(declaration.name()) {
            log::debug!("{}: skipped by configuration", declaration.name());
            return Ok(Vec::new());
        }
        let descriptors = match declaration {
            NativeDeclaration::Function(native) => {
                let mut function = describe(native, &self.mapper, &self.builder.function_prefix)?;
                if function.can_bind_receiver() && !self.builder.free_functions.contains(&native.name)
                {
                    function.bind_receiver(&self.builder.function_prefix, &self.builder.library_prefix);
                }
                if self.builder.infer_out_parameters {
                    for index in function.inferred_out_parameters() {
                        function.mark_out_parameter(index)?;
                    }
                }
                for name in self.builder.out_parameters.get(&native.name).into_iter().flatten() {
                    let index = native
                        .arguments
                        .iter()
                        .position(|a| &a.name == name)
                        .ok_or_else(|| {
                            GenerationError::malformed(&native.name, format!("no parameter named {name:?}"))
                        })?;
                    function.mark_out_parameter(index)?;
                }
                vec![Descriptor::Function(function)]
            }
            NativeDeclaration::Struct(native) => {
                let empty = SliceMembers::new();
                let slices = self.builder.slice_members.get(&native.name).unwrap_or(&empty);
                describe_struct(native, &self.mapper, slices)?
            }
            NativeDeclaration::Enum { .. } | NativeDeclaration::Typedef { .. } => Vec::new(),
        };
        Ok(descriptors.iter().map(synthesize).collect())
    }

    /// Synthesize and render one declaration; all or nothing
    pub fn generate(&self, declaration: &NativeDeclaration) -> Result<Vec<GeneratedItem>> {
        self.synthesize(declaration)?
            .iter()
            .map(|result| self.emitter.emit(result))
            .collect()
    }

    /// Generate one declaration, turning an error into a [`Failure`]
    pub fn call(&self, item: (NativeDeclaration, SourceLocation)) -> Outcome {
        let (declaration, location) = item;
        match self.generate(&declaration) {
            Ok(items) => {
                #[cfg(feature = "debug")]
                println!("Generated {} items for {}", items.len(), declaration.name());
                Ok(items.into_iter().map(|i| (i, location.clone())).collect())
            }
            Err(error) => {
                log::debug!("{}: {error}", declaration.name());
                Err(Failure {
                    declaration: declaration.name().to_string(),
                    location,
                    error,
                })
            }
        }
    }

    /// Generate a whole sequence of declarations
    pub fn run<I>(&self, declarations: I) -> Report
    where
        I: IntoIterator<Item = (NativeDeclaration, SourceLocation)>,
    {
        declarations.into_iter().map(|item| self.call(item)).collect()
    }

    /// Convert to closure compatible with `Iterator::map`
    pub fn into_closure(self) -> impl FnMut((NativeDeclaration, SourceLocation)) -> Outcome {
        move |item| self.call(item)
    }
}
