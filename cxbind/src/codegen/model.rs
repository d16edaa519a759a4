//! Abstract description of generated callables.
//!
//! Descriptors say *what* a native declaration is; a [`SynthesisResult`] says *how*
//! the wrapper calls it: a signature plus an ordered list of statements. Nothing here
//! knows about concrete Rust syntax; see `codegen::emit` for that.

use crate::codegen::types::TypeDescriptor;

/// A method receiver: the first native parameter, bound as `self`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverDescriptor {
    /// Receiver-style name of the bound parameter, e.g. `tu`
    pub name: String,
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub native_name: String,
    pub target_name: String,
    pub ty: TypeDescriptor,
    /// Pointer used only to receive a result, promoted to a return value
    pub is_out_parameter: bool,
}

/// One native callable, or one struct member exposed through a getter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub native_name: String,
    pub target_name: String,
    pub doc_comment: Option<String>,
    /// In native declaration order, receiver included
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: TypeDescriptor,
    pub receiver: Option<ReceiverDescriptor>,
    /// Native struct field exposed by a member getter
    pub member_name: Option<String>,
}

impl FunctionDescriptor {
    /// Parameters visible in the generated signature: no receiver, no out-parameters
    pub fn input_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        let skip = usize::from(self.receiver.is_some() && !self.parameters.is_empty());
        self.parameters
            .iter()
            .skip(skip)
            .filter(|p| !p.is_out_parameter)
    }

    pub fn out_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        let skip = usize::from(self.receiver.is_some() && !self.parameters.is_empty());
        self.parameters
            .iter()
            .skip(skip)
            .filter(|p| p.is_out_parameter)
    }
}

/// Where a slice accessor takes its element count from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthSource {
    Fixed(u64),
    /// Name of a sibling native field holding the count
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceAccessorDescriptor {
    pub target_name: String,
    pub doc_comment: Option<String>,
    pub receiver: ReceiverDescriptor,
    pub element_type: TypeDescriptor,
    /// 1 for an array of values, 2 for an array of pointers
    pub dimension: u8,
    pub length_source: LengthSource,
    pub source_member_name: String,
}

/// Type of a value in a generated signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// A Rust primitive, a std type or a generated wrapper, by value
    Named(String),
    /// Borrowed string slice
    Str,
    /// Owned pointer to a freshly built value
    Boxed(String),
    /// Mutable borrow of a generated wrapper
    Borrowed(String),
    /// Native pointer passed through untouched
    Raw { marshal: String, depth: usize },
    Sequence(Box<ValueType>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    /// Name of the receiver type when the callable is a method
    pub receiver: Option<ReceiverDescriptor>,
    pub parameters: Vec<Param>,
    /// Primary result first, then promoted out-parameters in declaration order
    pub returns: Vec<ValueType>,
}

/// Type of a local declared ahead of the native call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalType {
    /// Native type, e.g. `c_uint`
    Marshal(String),
    /// Generated wrapper, e.g. `File`
    Wrapper(String),
}

/// What a cast converts into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastTarget {
    /// Native type at the call boundary
    Marshal {
        name: String,
        depth: usize,
        is_enum: bool,
    },
    /// Rust-facing primitive or enum
    Target { name: String, is_enum: bool },
    /// Element count
    Length,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Local(String),
    Field {
        base: Box<Expr>,
        field: String,
    },
    NativeCall {
        function: String,
        args: Vec<Expr>,
    },
    Cast {
        value: Box<Expr>,
        to: CastTarget,
    },
    /// Literal wrapping of a native value into a generated composite
    Construct {
        ty: String,
        value: Box<Expr>,
    },
    Deref(Box<Expr>),
    /// Address passed to the native call
    AddressOf(Box<Expr>),
    /// Take a pointer to a freshly built value
    Boxed(Box<Expr>),
    Integer(u64),
    /// Zero of the given marshal type
    Zero(String),
    NotEqual(Box<Expr>, Box<Expr>),
    /// Transient native copy of a string, released with `FreeNativeString`
    AllocNativeString(Box<Expr>),
    FreeNativeString(Box<Expr>),
    /// Owned copy of a native `char *`
    CopyNativeString(Box<Expr>),
    Dispose(Box<Expr>),
    /// Content of a disposable string
    StringContent(Box<Expr>),
    FromEpochSeconds(Box<Expr>),
    ToEpochSeconds(Box<Expr>),
    /// View of `length` native elements starting at `source`
    NativeSlice {
        source: Box<Expr>,
        length: Box<Expr>,
        is_fixed_array: bool,
    },
    /// Convert every element of `slice`, bound to `element`, into a new sequence
    MapElements {
        slice: Box<Expr>,
        element: String,
        convert: Box<Expr>,
    },
}

impl Expr {
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local(name.into())
    }

    pub fn native_call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::NativeCall {
            function: function.into(),
            args,
        }
    }

    pub fn field(self, field: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(self),
            field: field.into(),
        }
    }

    pub fn cast(self, to: CastTarget) -> Self {
        Expr::Cast {
            value: Box::new(self),
            to,
        }
    }

    pub fn construct(self, ty: impl Into<String>) -> Self {
        Expr::Construct {
            ty: ty.into(),
            value: Box::new(self),
        }
    }

    pub fn deref(self) -> Self {
        Expr::Deref(Box::new(self))
    }

    pub fn address_of(self) -> Self {
        Expr::AddressOf(Box::new(self))
    }

    pub fn boxed(self) -> Self {
        Expr::Boxed(Box::new(self))
    }

    pub fn not_equal(self, other: Expr) -> Self {
        Expr::NotEqual(Box::new(self), Box::new(other))
    }

    pub fn alloc_native_string(self) -> Self {
        Expr::AllocNativeString(Box::new(self))
    }

    pub fn free_native_string(self) -> Self {
        Expr::FreeNativeString(Box::new(self))
    }

    pub fn copy_native_string(self) -> Self {
        Expr::CopyNativeString(Box::new(self))
    }

    pub fn dispose(self) -> Self {
        Expr::Dispose(Box::new(self))
    }

    pub fn string_content(self) -> Self {
        Expr::StringContent(Box::new(self))
    }

    pub fn from_epoch_seconds(self) -> Self {
        Expr::FromEpochSeconds(Box::new(self))
    }

    pub fn to_epoch_seconds(self) -> Self {
        Expr::ToEpochSeconds(Box::new(self))
    }

    /// Names of all locals the expression reads
    pub fn locals(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_locals(&mut names);
        names.dedup();
        names
    }

    fn collect_locals<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Local(name) => names.push(name),
            Expr::Integer(_) | Expr::Zero(_) => {}
            Expr::Field { base, .. } => base.collect_locals(names),
            Expr::NativeCall { args, .. } => args.iter().for_each(|a| a.collect_locals(names)),
            Expr::Cast { value, .. } | Expr::Construct { value, .. } => {
                value.collect_locals(names)
            }
            Expr::Deref(e)
            | Expr::AddressOf(e)
            | Expr::Boxed(e)
            | Expr::AllocNativeString(e)
            | Expr::FreeNativeString(e)
            | Expr::CopyNativeString(e)
            | Expr::Dispose(e)
            | Expr::StringContent(e)
            | Expr::FromEpochSeconds(e)
            | Expr::ToEpochSeconds(e) => e.collect_locals(names),
            Expr::NotEqual(a, b) => {
                a.collect_locals(names);
                b.collect_locals(names);
            }
            Expr::NativeSlice { source, length, .. } => {
                source.collect_locals(names);
                length.collect_locals(names);
            }
            Expr::MapElements { slice, .. } => slice.collect_locals(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Uninitialized mutable local receiving an out-parameter
    DeclareOut { name: String, ty: LocalType },
    Let { name: String, value: Expr },
    /// Cleanup guaranteed to run on every exit path of the body
    Defer(Expr),
    Eval(Expr),
    Return(Vec<Expr>),
}

/// Fluent construction of a statement list
#[derive(Debug, Default)]
pub struct BodyBuilder {
    statements: Vec<Stmt>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_out(&mut self, name: impl Into<String>, ty: LocalType) -> &mut Self {
        self.statements.push(Stmt::DeclareOut {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Expr) -> &mut Self {
        self.statements.push(Stmt::Let {
            name: name.into(),
            value,
        });
        self
    }

    pub fn defer(&mut self, cleanup: Expr) -> &mut Self {
        self.statements.push(Stmt::Defer(cleanup));
        self
    }

    pub fn eval(&mut self, expr: Expr) -> &mut Self {
        self.statements.push(Stmt::Eval(expr));
        self
    }

    pub fn returns(&mut self, values: Vec<Expr>) -> &mut Self {
        self.statements.push(Stmt::Return(values));
        self
    }

    pub fn build(self) -> Vec<Stmt> {
        self.statements
    }
}

/// What a synthesis result was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Function(FunctionDescriptor),
    SliceAccessor(SliceAccessorDescriptor),
}

/// Everything the emission layer needs to render one callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub descriptor: Descriptor,
    pub doc: Option<String>,
    pub signature: Signature,
    pub body: Vec<Stmt>,
}

impl SynthesisResult {
    /// Type name of the receiver, for grouping methods
    pub fn receiver_type(&self) -> Option<&str> {
        self.signature
            .receiver
            .as_ref()
            .map(|r| r.ty.target_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_builder_keeps_order() {
        let mut body = BodyBuilder::new();
        body.declare_out("line", LocalType::Marshal("c_uint".into()))
            .defer(Expr::local("line").dispose())
            .eval(Expr::native_call("clang_f", vec![Expr::local("line").address_of()]))
            .returns(vec![Expr::local("line")]);
        let body = body.build();

        assert_eq!(body.len(), 4);
        assert!(matches!(body[0], Stmt::DeclareOut { .. }));
        assert!(matches!(body[1], Stmt::Defer(_)));
        assert!(matches!(body[2], Stmt::Eval(_)));
        assert!(matches!(body[3], Stmt::Return(_)));
    }

    #[test]
    fn test_expr_locals() {
        let expr = Expr::native_call(
            "clang_getFile",
            vec![Expr::local("tu").field("c"), Expr::local("c_file_name")],
        )
        .construct("File");
        assert_eq!(expr.locals(), vec!["tu", "c_file_name"]);
    }
}
