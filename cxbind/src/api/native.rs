//! Clang-independent model of the declarations reported by the introspection facility.
//!
//! The extractor side (anything walking a libclang translation unit) serializes these
//! types into JSON lines; the generator only ever reads them.

use serde::{Deserialize, Serialize};

/// Source location information for tracking where a declaration originated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// The header file path
    pub file: String,
    /// The line number where the declaration starts (1-based)
    pub line: usize,
    /// The column number where the declaration starts (1-based)
    pub column: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The type kinds reported by libclang that can appear in the declaration stream.
///
/// Only a subset of them is handled by the type mapper; the rest exist so that an
/// extractor can report them faithfully and the mapper can refuse them by name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Invalid,
    Unexposed,
    Void,
    Bool,
    #[serde(rename = "Char_U")]
    CharU,
    UChar,
    Char16,
    Char32,
    UShort,
    UInt,
    ULong,
    ULongLong,
    UInt128,
    #[serde(rename = "Char_S")]
    CharS,
    SChar,
    WChar,
    Short,
    Int,
    Long,
    LongLong,
    Int128,
    Float,
    Double,
    LongDouble,
    Pointer,
    BlockPointer,
    Record,
    Enum,
    Typedef,
    Elaborated,
    FunctionNoProto,
    FunctionProto,
    ConstantArray,
    IncompleteArray,
    VariableArray,
}

impl TypeKind {
    /// The spelling libclang uses for this kind
    pub fn spelling(&self) -> &'static str {
        match self {
            TypeKind::Invalid => "Invalid",
            TypeKind::Unexposed => "Unexposed",
            TypeKind::Void => "Void",
            TypeKind::Bool => "Bool",
            TypeKind::CharU => "Char_U",
            TypeKind::UChar => "UChar",
            TypeKind::Char16 => "Char16",
            TypeKind::Char32 => "Char32",
            TypeKind::UShort => "UShort",
            TypeKind::UInt => "UInt",
            TypeKind::ULong => "ULong",
            TypeKind::ULongLong => "ULongLong",
            TypeKind::UInt128 => "UInt128",
            TypeKind::CharS => "Char_S",
            TypeKind::SChar => "SChar",
            TypeKind::WChar => "WChar",
            TypeKind::Short => "Short",
            TypeKind::Int => "Int",
            TypeKind::Long => "Long",
            TypeKind::LongLong => "LongLong",
            TypeKind::Int128 => "Int128",
            TypeKind::Float => "Float",
            TypeKind::Double => "Double",
            TypeKind::LongDouble => "LongDouble",
            TypeKind::Pointer => "Pointer",
            TypeKind::BlockPointer => "BlockPointer",
            TypeKind::Record => "Record",
            TypeKind::Enum => "Enum",
            TypeKind::Typedef => "Typedef",
            TypeKind::Elaborated => "Elaborated",
            TypeKind::FunctionNoProto => "FunctionNoProto",
            TypeKind::FunctionProto => "FunctionProto",
            TypeKind::ConstantArray => "ConstantArray",
            TypeKind::IncompleteArray => "IncompleteArray",
            TypeKind::VariableArray => "VariableArray",
        }
    }

    /// Plain `char`, whichever signedness the target gives it
    pub fn is_plain_char(&self) -> bool {
        matches!(self, TypeKind::CharS | TypeKind::CharU)
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spelling())
    }
}

/// The declaration a type refers to (`clang_getTypeDeclaration`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeclarationRef {
    /// Spelling of the declared type, e.g. `CXTranslationUnit`
    pub type_spelling: String,
    /// Display name of the declaration cursor
    pub display_name: String,
}

/// One native type as seen through the introspection facility
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeType {
    pub spelling: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_const: bool,
    /// Canonical form; absent when the type is its own canonical type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<Box<NativeType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointee: Option<Box<NativeType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<NativeType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<DeclarationRef>,
}

impl NativeType {
    /// A type with no structure besides its kind, e.g. a builtin
    pub fn new(spelling: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            spelling: spelling.into(),
            kind,
            is_const: false,
            canonical: None,
            pointee: None,
            element: None,
            array_size: None,
            declaration: None,
        }
    }

    pub fn pointer(pointee: NativeType) -> Self {
        let mut ty = Self::new(format!("{} *", pointee.spelling), TypeKind::Pointer);
        ty.pointee = Some(Box::new(pointee));
        ty
    }

    pub fn constant_array(element: NativeType, size: u64) -> Self {
        let mut ty = Self::new(
            format!("{} [{}]", element.spelling, size),
            TypeKind::ConstantArray,
        );
        ty.element = Some(Box::new(element));
        ty.array_size = Some(size);
        ty
    }

    pub fn record(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), TypeKind::Record).declared_as(name.clone(), name)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), TypeKind::Enum).declared_as(name.clone(), name)
    }

    pub fn typedef(name: impl Into<String>, canonical: NativeType) -> Self {
        let name = name.into();
        Self::new(name.clone(), TypeKind::Typedef)
            .declared_as(name.clone(), name)
            .with_canonical(canonical)
    }

    pub fn with_canonical(mut self, canonical: NativeType) -> Self {
        self.canonical = Some(Box::new(canonical));
        self
    }

    pub fn declared_as(
        mut self,
        type_spelling: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        self.declaration = Some(DeclarationRef {
            type_spelling: type_spelling.into(),
            display_name: display_name.into(),
        });
        self
    }

    /// Mark the type `const`-qualified, adjusting its spelling
    pub fn constified(mut self) -> Self {
        if !self.is_const {
            self.is_const = true;
            self.spelling = format!("const {}", self.spelling);
        }
        self
    }

    /// The canonical type; a type without an explicit canonical form is canonical itself
    pub fn canonical(&self) -> &NativeType {
        self.canonical.as_deref().unwrap_or(self)
    }

    pub fn canonical_kind(&self) -> TypeKind {
        self.canonical().kind
    }
}

/// A named argument of a native function. Unnamed arguments have an empty name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeParameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NativeType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeFunction {
    pub name: String,
    pub result_type: NativeType,
    #[serde(default)]
    pub arguments: Vec<NativeParameter>,
    /// Raw documentation comment, markup included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NativeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeStruct {
    /// Spelling of the record type, e.g. `CXTUResourceUsage`
    pub name: String,
    #[serde(default)]
    pub fields: Vec<NativeField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A declaration as reported by the introspection facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NativeDeclaration {
    Function(NativeFunction),
    Struct(NativeStruct),
    Enum {
        name: String,
    },
    Typedef {
        name: String,
        underlying: NativeType,
    },
}

impl NativeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            NativeDeclaration::Function(f) => &f.name,
            NativeDeclaration::Struct(s) => &s.name,
            NativeDeclaration::Enum { name } => name,
            NativeDeclaration::Typedef { name, .. } => name,
        }
    }
}

/// One line of a declaration file: a declaration and where it was found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub declaration: NativeDeclaration,
    #[serde(default)]
    pub location: SourceLocation,
}

impl Record {
    pub fn new(declaration: NativeDeclaration, location: SourceLocation) -> Self {
        Self {
            declaration,
            location,
        }
    }

    pub fn to_jsonl_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
