//! Type mapper: resolves a native type into the descriptor of its Rust projection.
//!
//! Resolution is recursive and pure. Pointer depth accumulates across every pointer,
//! array and canonicalization layer, so `T**` always resolves to `depth(T) + 2`.

use crate::{
    api::native::{NativeType, TypeKind},
    codegen::naming::{strip_elaboration, trim_library_prefix},
    error::{GenerationError, Result},
};

/// Target name of the "no value" sentinel
pub const VOID: &str = "void";
pub const BOOL: &str = "bool";
/// Target name of a native `char *` surfaced as an owned string
pub const STRING: &str = "String";
/// Target name of the disposable string wrapper
pub const DISPOSABLE_STRING: &str = "CxString";
pub const TIMESTAMP: &str = "SystemTime";
/// Marshal name of an untyped native pointer target
pub const OPAQUE: &str = "c_void";

/// How a value of a resolved type crosses the native call boundary.
///
/// Decided once by the mapper; the synthesizers match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// No value at all (`void`)
    Void,
    /// Native boolean, passed as is
    Bool,
    /// Integer slot carrying a truth flag, compared against zero on the way back
    CoercedBool,
    /// Native `char *`, copied in and out of owned strings
    PlainString,
    /// Opaque string wrapper which must be disposed after reading its content
    DisposableString,
    /// Seconds since the epoch
    Timestamp,
    /// Record or handle wrapped by value in a generated struct
    Composite,
    /// Numbers, enums and function pointers, converted by casting
    PrimitiveOrEnum,
}

/// Native type together with its projection to the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Literal spelling of the native type
    pub native_name: String,
    /// Type passed across the FFI boundary; `None` for composites
    pub marshal_name: Option<String>,
    /// Type exposed to callers of the generated code
    pub target_name: String,
    pub pointer_depth: usize,
    pub fixed_array_length: Option<u64>,
    pub is_primitive: bool,
    pub is_array: bool,
    pub is_enum_literal: bool,
    pub is_function_pointer: bool,
    pub is_slice: bool,
    pub is_pointer_composition: bool,
    /// Outermost pointer points to a `const`-qualified value
    pub points_to_const: bool,
    /// Sibling field holding the element count; only set together with `is_slice`
    pub slice_length_field_name: Option<String>,
    pub shape: ValueShape,
}

impl TypeDescriptor {
    fn new(native_name: &str) -> Self {
        Self {
            native_name: native_name.to_string(),
            marshal_name: None,
            target_name: String::new(),
            pointer_depth: 0,
            fixed_array_length: None,
            is_primitive: true,
            is_array: false,
            is_enum_literal: false,
            is_function_pointer: false,
            is_slice: false,
            is_pointer_composition: false,
            points_to_const: false,
            slice_length_field_name: None,
            shape: ValueShape::PrimitiveOrEnum,
        }
    }

    fn primitive(mut self, marshal: &str, target: &str) -> Self {
        self.marshal_name = Some(marshal.to_string());
        self.target_name = target.to_string();
        self
    }

    /// Copy names and classification of `inner`, adding its pointer depth to ours
    fn adopt(&mut self, inner: TypeDescriptor) {
        self.marshal_name = inner.marshal_name;
        self.target_name = inner.target_name;
        self.pointer_depth += inner.pointer_depth;
        self.is_primitive = inner.is_primitive;
        self.is_enum_literal = inner.is_enum_literal;
        self.is_function_pointer |= inner.is_function_pointer;
        self.is_pointer_composition |= inner.is_pointer_composition;
        self.shape = inner.shape;
    }

    pub fn is_void(&self) -> bool {
        self.shape == ValueShape::Void && self.pointer_depth == 0
    }

    /// 16-bit integers, the slot libclang uses for `int`/`unsigned` results
    pub fn is_short_integer(&self) -> bool {
        self.shape == ValueShape::PrimitiveOrEnum
            && self.pointer_depth == 0
            && !self.is_enum_literal
            && matches!(self.target_name.as_str(), "i16" | "u16")
    }

    /// Reinterpret an integer result as a truth flag
    pub fn coerced_to_bool(mut self) -> Self {
        self.target_name = BOOL.to_string();
        self.shape = ValueShape::CoercedBool;
        self
    }

    /// Mark as a variable-length array whose count lives in `length_field`
    pub fn into_slice(mut self, length_field: impl Into<String>) -> Self {
        self.is_slice = true;
        self.slice_length_field_name = Some(length_field.into());
        self
    }
}

/// Resolves native types using the naming conventions of one native library.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    library_prefix: String,
    disposable_string_type: String,
    timestamp_type: String,
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new("CX", "CXString", "time_t")
    }
}

impl TypeMapper {
    pub fn new(
        library_prefix: impl Into<String>,
        disposable_string_type: impl Into<String>,
        timestamp_type: impl Into<String>,
    ) -> Self {
        Self {
            library_prefix: library_prefix.into(),
            disposable_string_type: disposable_string_type.into(),
            timestamp_type: timestamp_type.into(),
        }
    }

    pub fn library_prefix(&self) -> &str {
        &self.library_prefix
    }

    /// Resolve a native type, failing on any kind without a mapping rule
    pub fn resolve(&self, ty: &NativeType) -> Result<TypeDescriptor> {
        log::trace!("resolving {:?} of kind {}", ty.spelling, ty.kind);
        let desc = TypeDescriptor::new(&ty.spelling);

        let desc = match ty.kind {
            TypeKind::CharS => desc.primitive("c_char", "i8"),
            TypeKind::CharU => desc.primitive("c_char", "u8"),
            TypeKind::SChar => desc.primitive("c_schar", "i8"),
            TypeKind::UChar => desc.primitive("c_uchar", "u8"),
            TypeKind::Short => desc.primitive("c_short", "i16"),
            TypeKind::UShort => desc.primitive("c_ushort", "u16"),
            TypeKind::Int => desc.primitive("c_int", "i16"),
            TypeKind::UInt => desc.primitive("c_uint", "u16"),
            TypeKind::Long => desc.primitive("c_long", "i32"),
            TypeKind::ULong => desc.primitive("c_ulong", "u32"),
            TypeKind::LongLong => desc.primitive("c_longlong", "i64"),
            TypeKind::ULongLong => desc.primitive("c_ulonglong", "u64"),
            TypeKind::Float => desc.primitive("c_float", "f32"),
            TypeKind::Double => desc.primitive("c_double", "f64"),
            TypeKind::Bool => TypeDescriptor {
                target_name: BOOL.to_string(),
                shape: ValueShape::Bool,
                ..desc
            },
            TypeKind::Void => TypeDescriptor {
                shape: ValueShape::Void,
                ..desc.primitive(OPAQUE, VOID)
            },
            TypeKind::ConstantArray => self.resolve_array(ty, desc)?,
            TypeKind::Typedef => self.resolve_typedef(ty, desc),
            TypeKind::Pointer => self.resolve_pointer(ty, desc)?,
            TypeKind::Record => TypeDescriptor {
                target_name: trim_library_prefix(declared_spelling(ty), &self.library_prefix)
                    .to_string(),
                is_primitive: false,
                shape: ValueShape::Composite,
                ..desc
            },
            TypeKind::FunctionProto => {
                let declared = declared_spelling(ty);
                TypeDescriptor {
                    marshal_name: Some(declared.to_string()),
                    target_name: trim_library_prefix(declared, &self.library_prefix).to_string(),
                    is_function_pointer: true,
                    ..desc
                }
            }
            TypeKind::Enum => {
                let declaration = ty.declaration.as_ref();
                let display_name = declaration
                    .map(|d| d.display_name.as_str())
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&ty.spelling);
                TypeDescriptor {
                    marshal_name: Some(strip_elaboration(declared_spelling(ty)).to_string()),
                    target_name: trim_library_prefix(display_name, &self.library_prefix)
                        .to_string(),
                    is_enum_literal: true,
                    ..desc
                }
            }
            // Some back-ends report enums (and others) as unexposed; the canonical
            // type carries the real kind.
            TypeKind::Unexposed => match ty.canonical.as_deref() {
                Some(canonical) if canonical.kind != TypeKind::Unexposed => {
                    self.resolve(canonical)?
                }
                Some(_) => return Err(GenerationError::unhandled(&ty.spelling, ty.kind)),
                None => {
                    return Err(GenerationError::malformed(
                        &ty.spelling,
                        "unexposed type without canonical form",
                    ));
                }
            },
            _ => return Err(GenerationError::unhandled(&ty.spelling, ty.kind)),
        };

        debug_assert!(!desc.target_name.is_empty());
        Ok(desc)
    }

    fn resolve_array(&self, ty: &NativeType, mut desc: TypeDescriptor) -> Result<TypeDescriptor> {
        let element = ty
            .element
            .as_deref()
            .ok_or_else(|| GenerationError::malformed(&ty.spelling, "array without element type"))?;
        let size = ty
            .array_size
            .ok_or_else(|| GenerationError::malformed(&ty.spelling, "array without size"))?;

        desc.adopt(self.resolve(element)?);
        desc.is_array = true;
        desc.fixed_array_length = Some(size);
        Ok(desc)
    }

    fn resolve_typedef(&self, ty: &NativeType, mut desc: TypeDescriptor) -> TypeDescriptor {
        desc.is_primitive = false;
        desc.shape = ValueShape::Composite;

        if ty.spelling == self.disposable_string_type {
            desc.target_name = DISPOSABLE_STRING.to_string();
            desc.shape = ValueShape::DisposableString;
            return desc;
        }
        if ty.spelling == self.timestamp_type {
            // A typedef, but still cast at the call boundary
            desc.marshal_name = Some(ty.spelling.clone());
            desc.target_name = TIMESTAMP.to_string();
            desc.is_primitive = true;
            desc.shape = ValueShape::Timestamp;
            return desc;
        }

        let declared = declared_spelling(ty);
        desc.target_name = trim_library_prefix(declared, &self.library_prefix).to_string();
        if ty.canonical_kind() == TypeKind::Enum {
            desc.marshal_name = Some(declared.to_string());
            desc.is_enum_literal = true;
            desc.is_primitive = true;
            desc.shape = ValueShape::PrimitiveOrEnum;
        }
        desc
    }

    fn resolve_pointer(&self, ty: &NativeType, mut desc: TypeDescriptor) -> Result<TypeDescriptor> {
        let pointee = ty
            .pointee
            .as_deref()
            .ok_or_else(|| GenerationError::malformed(&ty.spelling, "pointer without pointee"))?;

        desc.pointer_depth = 1;
        desc.points_to_const = pointee.is_const || pointee.canonical().is_const;
        if pointee.canonical_kind() == TypeKind::FunctionProto {
            desc.is_function_pointer = true;
        }

        let inner = self.resolve(pointee)?;
        desc.is_pointer_composition = !inner.is_primitive;
        let inner_shape = inner.shape;
        let inner_marshal = inner.marshal_name.clone();
        desc.adopt(inner);

        match inner_shape {
            ValueShape::PrimitiveOrEnum if pointee.kind.is_plain_char() => {
                desc.target_name = STRING.to_string();
                desc.shape = ValueShape::PlainString;
            }
            // `char **` is a pointer to raw characters, not a string
            ValueShape::PlainString => {
                desc.target_name = inner_marshal.unwrap_or_else(|| "c_char".to_string());
                desc.shape = ValueShape::PrimitiveOrEnum;
            }
            ValueShape::Void => {
                desc.target_name = OPAQUE.to_string();
                desc.shape = ValueShape::PrimitiveOrEnum;
            }
            _ => {}
        }
        Ok(desc)
    }
}

/// Spelling of the type's declaration, falling back to the type's own spelling
fn declared_spelling(ty: &NativeType) -> &str {
    ty.declaration
        .as_ref()
        .map(|d| d.type_spelling.as_str())
        .filter(|spelling| !spelling.is_empty())
        .unwrap_or(&ty.spelling)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> TypeMapper {
        TypeMapper::default()
    }

    fn translation_unit() -> NativeType {
        let impl_ptr = NativeType::pointer(NativeType::record("struct CXTranslationUnitImpl"));
        NativeType::typedef("CXTranslationUnit", impl_ptr)
    }

    #[test]
    fn test_integer_widths() {
        let cases = [
            (TypeKind::CharS, "c_char", "i8"),
            (TypeKind::UChar, "c_uchar", "u8"),
            (TypeKind::Short, "c_short", "i16"),
            (TypeKind::Int, "c_int", "i16"),
            (TypeKind::UInt, "c_uint", "u16"),
            (TypeKind::Long, "c_long", "i32"),
            (TypeKind::ULong, "c_ulong", "u32"),
            (TypeKind::LongLong, "c_longlong", "i64"),
            (TypeKind::ULongLong, "c_ulonglong", "u64"),
            (TypeKind::Float, "c_float", "f32"),
            (TypeKind::Double, "c_double", "f64"),
        ];
        for (kind, marshal, target) in cases {
            let desc = mapper().resolve(&NativeType::new("x", kind)).unwrap();
            assert_eq!(desc.marshal_name.as_deref(), Some(marshal), "{kind}");
            assert_eq!(desc.target_name, target, "{kind}");
            assert!(desc.is_primitive);
            assert_eq!(desc.shape, ValueShape::PrimitiveOrEnum);
        }
    }

    #[test]
    fn test_bool_and_void() {
        let b = mapper().resolve(&NativeType::new("bool", TypeKind::Bool)).unwrap();
        assert_eq!(b.target_name, BOOL);
        assert!(b.marshal_name.is_none());
        assert_eq!(b.shape, ValueShape::Bool);

        let v = mapper().resolve(&NativeType::new("void", TypeKind::Void)).unwrap();
        assert!(v.is_void());
    }

    #[test]
    fn test_pointer_depth_is_additive() {
        let int = NativeType::new("int", TypeKind::Int);
        let int_ptr_ptr = NativeType::pointer(NativeType::pointer(int.clone()));

        let base = mapper().resolve(&int).unwrap();
        let desc = mapper().resolve(&int_ptr_ptr).unwrap();
        assert_eq!(desc.pointer_depth, base.pointer_depth + 2);
        assert_eq!(desc.target_name, "i16");
        assert!(desc.is_primitive);
    }

    #[test]
    fn test_pointer_to_array_of_pointers() {
        let element = NativeType::pointer(NativeType::record("CXCursor"));
        let array = NativeType::constant_array(element, 4);
        let desc = mapper().resolve(&array).unwrap();
        assert_eq!(desc.pointer_depth, 1);
        assert!(desc.is_array);
        assert_eq!(desc.fixed_array_length, Some(4));
        assert_eq!(desc.target_name, "Cursor");
        assert!(!desc.is_primitive);
        assert!(desc.is_pointer_composition);

        // The array layer contributes no depth of its own
        let desc = mapper().resolve(&NativeType::pointer(array)).unwrap();
        assert_eq!(desc.pointer_depth, 2);
        assert_eq!(desc.target_name, "Cursor");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let ty = NativeType::pointer(translation_unit());
        assert_eq!(mapper().resolve(&ty).unwrap(), mapper().resolve(&ty).unwrap());
    }

    #[test]
    fn test_typedef_of_handle_is_composite() {
        let desc = mapper().resolve(&translation_unit()).unwrap();
        assert_eq!(desc.target_name, "TranslationUnit");
        assert!(desc.marshal_name.is_none());
        assert!(!desc.is_primitive);
        assert_eq!(desc.shape, ValueShape::Composite);
    }

    #[test]
    fn test_typedef_of_enum() {
        let ty = NativeType::typedef("CXCursorKind", NativeType::enumeration("enum CXCursorKind"));
        let desc = mapper().resolve(&ty).unwrap();
        assert_eq!(desc.target_name, "CursorKind");
        assert_eq!(desc.marshal_name.as_deref(), Some("CXCursorKind"));
        assert!(desc.is_enum_literal);
        assert!(desc.is_primitive);
    }

    #[test]
    fn test_disposable_string_and_timestamp() {
        let cxstring = NativeType::typedef("CXString", NativeType::record("CXString"));
        let desc = mapper().resolve(&cxstring).unwrap();
        assert_eq!(desc.target_name, DISPOSABLE_STRING);
        assert_eq!(desc.shape, ValueShape::DisposableString);

        let time = NativeType::typedef("time_t", NativeType::new("long", TypeKind::Long));
        let desc = mapper().resolve(&time).unwrap();
        assert_eq!(desc.target_name, TIMESTAMP);
        assert_eq!(desc.marshal_name.as_deref(), Some("time_t"));
        assert!(desc.is_primitive);
        assert_eq!(desc.shape, ValueShape::Timestamp);
    }

    #[test]
    fn test_char_pointer_is_plain_string() {
        let ty = NativeType::pointer(NativeType::new("char", TypeKind::CharS).constified());
        let desc = mapper().resolve(&ty).unwrap();
        assert_eq!(desc.native_name, "const char *");
        assert_eq!(desc.target_name, STRING);
        assert_eq!(desc.shape, ValueShape::PlainString);
        assert_eq!(desc.pointer_depth, 1);

        let ty = NativeType::pointer(ty);
        let desc = mapper().resolve(&ty).unwrap();
        assert_eq!(desc.shape, ValueShape::PrimitiveOrEnum);
        assert_eq!(desc.target_name, "c_char");
        assert_eq!(desc.pointer_depth, 2);
    }

    #[test]
    fn test_const_pointee_whatever_the_spelling() {
        let mut range = NativeType::record("CXSourceRange");
        range.is_const = true;
        range.spelling = "CXSourceRange const".to_string();
        let desc = mapper().resolve(&NativeType::pointer(range)).unwrap();
        assert!(desc.points_to_const);

        // Only the outermost pointee counts
        let inner = NativeType::pointer(NativeType::new("int", TypeKind::Int).constified());
        let desc = mapper().resolve(&NativeType::pointer(inner)).unwrap();
        assert!(!desc.points_to_const);
    }

    #[test]
    fn test_void_pointer_is_opaque() {
        let ty = NativeType::pointer(NativeType::new("void", TypeKind::Void));
        let desc = mapper().resolve(&ty).unwrap();
        assert!(!desc.is_void());
        assert_eq!(desc.target_name, OPAQUE);
        assert_eq!(desc.pointer_depth, 1);
    }

    #[test]
    fn test_function_pointer() {
        let proto = NativeType::new("void (void *)", TypeKind::FunctionProto)
            .declared_as("CXInclusionVisitorProto", "");
        let desc = mapper().resolve(&NativeType::pointer(proto)).unwrap();
        assert!(desc.is_function_pointer);
        assert_eq!(desc.target_name, "InclusionVisitorProto");
        assert_eq!(desc.pointer_depth, 1);
    }

    #[test]
    fn test_enum_and_unexposed() {
        let canonical = NativeType::enumeration("enum CXTypeKind").declared_as("CXTypeKind", "CXTypeKind");
        let unexposed = NativeType::new("enum CXTypeKind", TypeKind::Unexposed).with_canonical(canonical.clone());

        let direct = mapper().resolve(&canonical).unwrap();
        let via_unexposed = mapper().resolve(&unexposed).unwrap();
        assert_eq!(direct, via_unexposed);
        assert_eq!(direct.target_name, "TypeKind");
        assert!(direct.is_enum_literal);
    }

    #[test]
    fn test_unhandled_kind_is_an_error() {
        let ty = NativeType::new("long double", TypeKind::LongDouble);
        let err = mapper().resolve(&ty).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::UnhandledTypeKind { ref spelling, kind: TypeKind::LongDouble } if spelling == "long double"
        ));
        assert_eq!(err.to_string(), "unhandled type \"long double\" of kind LongDouble");

        // Unhandled kinds deep inside a pointer still fail the whole type
        let nested = NativeType::pointer(NativeType::new("int[]", TypeKind::IncompleteArray));
        assert!(mapper().resolve(&nested).is_err());
    }

    #[test]
    fn test_malformed_pointer() {
        let ty = NativeType::new("int *", TypeKind::Pointer);
        assert!(matches!(
            mapper().resolve(&ty),
            Err(GenerationError::MalformedDeclaration { .. })
        ));
    }
}
