// Unit tests for the codegen module
//
// These go from native declarations all the way to formatted Rust source, checking the
// rendered text. Whitespace is ignored when comparing.

use super::*;
use crate::api::native::{NativeField, NativeFunction, NativeParameter, NativeStruct, NativeType, TypeKind};
use crate::codegen::{
    accessor::{describe_struct, SliceMembers},
    emit::{Emitter, GeneratedItem},
    function::describe,
    types::TypeMapper,
};

fn translation_unit() -> NativeType {
    NativeType::typedef(
        "CXTranslationUnit",
        NativeType::pointer(NativeType::record("struct CXTranslationUnitImpl")),
    )
}

fn file_handle() -> NativeType {
    NativeType::typedef("CXFile", NativeType::pointer(NativeType::new("void", TypeKind::Void)))
}

fn param(name: &str, ty: NativeType) -> NativeParameter {
    NativeParameter {
        name: name.to_string(),
        ty,
    }
}

fn native_function(name: &str, result: NativeType, arguments: Vec<NativeParameter>) -> NativeFunction {
    NativeFunction {
        name: name.to_string(),
        result_type: result,
        arguments,
        comment: None,
    }
}

// Describe like the generator does by default, then synthesize and render
fn render_function(native: &NativeFunction) -> String {
    let mut function = describe(native, &TypeMapper::default(), "clang_").unwrap();
    if function.can_bind_receiver() {
        function.bind_receiver("clang_", "CX");
    }
    for index in function.inferred_out_parameters() {
        function.mark_out_parameter(index).unwrap();
    }
    render(&synthesize(&model::Descriptor::Function(function)))
}

fn render(result: &model::SynthesisResult) -> String {
    let item: syn::Item = match Emitter::default().emit(result).unwrap() {
        GeneratedItem::Method { receiver, item } => {
            let receiver = syn::Ident::new(&receiver, proc_macro2::Span::call_site());
            syn::parse_quote! {
                impl #receiver {
                    #item
                }
            }
        }
        GeneratedItem::Function(item) => syn::Item::Fn(item),
    };
    prettyplease::unparse(&syn::File {
        shebang: None,
        attrs: vec![],
        items: vec![item],
    })
}

// Also drops the trailing commas prettyplease adds when it breaks a list over lines
fn squash(code: &str) -> String {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    code.replace(",}", "}").replace(",)", ")").replace(",]", "]")
}

fn assert_contains(code: &str, expected: &str) {
    assert!(
        squash(code).contains(&squash(expected)),
        "expected `{expected}` in:\n{code}"
    );
}

#[test]
fn test_truth_flag_result() {
    let native = native_function(
        "clang_isFileMultipleIncludeGuarded",
        NativeType::new("unsigned int", TypeKind::UInt),
        vec![param("tu", translation_unit()), param("file", file_handle())],
    );
    let code = render_function(&native);

    assert_contains(&code, "impl TranslationUnit");
    assert_contains(&code, "pub fn is_file_multiple_include_guarded(&self, file: File) -> bool");
    // The native result goes through a temporary compared against zero
    assert_contains(&code, "let o = ffi::clang_isFileMultipleIncludeGuarded(self.c, file.c);");
    assert_contains(&code, "o != 0 as ::std::os::raw::c_uint");
}

#[test]
fn test_out_parameter_becomes_return_value() {
    let native = native_function(
        "clang_f",
        NativeType::new("void", TypeKind::Void),
        vec![
            param("x", NativeType::new("int", TypeKind::Int)),
            param("out", NativeType::pointer(NativeType::record("CXResult"))),
        ],
    );
    let code = render_function(&native);

    // No receiver candidate: a free function
    assert!(!code.contains("impl "));
    assert_contains(&code, "pub fn f(x: i16) -> Result");
    assert_contains(&code, "let mut out: Result = ::std::mem::zeroed();");
    assert_contains(&code, "ffi::clang_f(x as ::std::os::raw::c_int, &mut out.c);");
}

#[test]
fn test_string_parameter_is_released() {
    let native = native_function(
        "clang_getFile",
        file_handle(),
        vec![
            param("tu", translation_unit()),
            param(
                "file_name",
                NativeType::pointer(NativeType::new("char", TypeKind::CharS).constified()),
            ),
        ],
    );
    let code = render_function(&native);

    assert_contains(&code, "pub fn file(&self, file_name: &str) -> File");
    assert_contains(
        &code,
        "let c_file_name = ::std::ffi::CString::new(file_name.split('\\0').next().unwrap_or_default())
            .unwrap_or_default()
            .into_raw();",
    );
    // Release is registered before the call
    let release = squash("drop(::std::ffi::CString::from_raw((*c_file_name_ptr)))");
    let call = squash("File { c: ffi::clang_getFile(self.c, c_file_name) }");
    let squashed = squash(&code);
    let release_at = squashed.find(&release).expect("release registered");
    let call_at = squashed.find(&call).expect("native call");
    assert!(release_at < call_at);
}

#[test]
fn test_receiver_name_clash_keeps_both_arguments() {
    let native = native_function(
        "clang_equalCursors",
        NativeType::new("unsigned int", TypeKind::UInt),
        vec![
            param("cursor", NativeType::record("CXCursor")),
            param("c", NativeType::record("CXCursor")),
        ],
    );
    let code = render_function(&native);

    assert_contains(&code, "pub fn equal_cursors(&self, c: Cursor) -> u16");
    assert_contains(&code, "ffi::clang_equalCursors(self.c, c.c)");
    assert!(!squash(&code).contains("(self.c,self.c)"));
}

#[test]
fn test_generated_item_debug_output() {
    let native = native_function("clang_isValid", NativeType::new("float", TypeKind::Float), vec![]);
    let function = describe(&native, &TypeMapper::default(), "clang_").unwrap();
    let item = Emitter::default()
        .emit(&synthesize(&model::Descriptor::Function(function)))
        .unwrap();

    let debug = format!("{item:?}");
    assert!(debug.starts_with("Function("));
    assert!(debug.contains("is_valid"));
}

#[test]
fn test_disposable_string_result() {
    let native = native_function(
        "clang_getTranslationUnitSpelling",
        NativeType::typedef("CXString", NativeType::record("CXString")),
        vec![param("CTUnit", translation_unit())],
    );
    let code = render_function(&native);

    assert_contains(&code, "pub fn spelling(&self) -> String");
    assert_contains(
        &code,
        "let o = CxString { c: ffi::clang_getTranslationUnitSpelling(self.c) };",
    );
    assert_contains(&code, "let o_ptr = ::std::ptr::addr_of!(o);");
    assert_contains(&code, "let _deferred = Deferred(move || { (*o_ptr).dispose(); });");
    assert_contains(&code, "o.string()");
}

#[test]
fn test_float_result_is_cast() {
    let native = native_function("clang_isValid", NativeType::new("float", TypeKind::Float), vec![]);
    let code = render_function(&native);

    assert_contains(&code, "pub fn is_valid() -> f32");
    assert_contains(&code, "ffi::clang_isValid() as f32");
    assert!(!code.contains("!= 0"));
}

#[test]
fn test_timestamp_result() {
    let native = native_function(
        "clang_getFileTime",
        NativeType::typedef("time_t", NativeType::new("long", TypeKind::Long)),
        vec![param("SFile", file_handle())],
    );
    let code = render_function(&native);

    assert_contains(&code, "impl File");
    assert_contains(&code, "pub fn time(&self) -> ::std::time::SystemTime");
    assert_contains(
        &code,
        "::std::time::UNIX_EPOCH + ::std::time::Duration::from_secs(ffi::clang_getFileTime(self.c) as u64)",
    );
}

#[test]
fn test_enum_parameter_and_result() {
    let kind = NativeType::typedef("CXCursorKind", NativeType::enumeration("enum CXCursorKind"));
    let native = native_function(
        "clang_isDeclaration",
        NativeType::new("unsigned int", TypeKind::UInt),
        vec![param("kind", kind.clone())],
    );
    let code = render_function(&native);
    assert_contains(&code, "pub fn is_declaration(kind: CursorKind) -> bool");
    assert_contains(&code, "ffi::clang_isDeclaration(ffi::CXCursorKind::from(kind))");

    let native = native_function(
        "clang_getCursorKind",
        kind,
        vec![param("", NativeType::record("CXCursor"))],
    );
    let code = render_function(&native);
    assert_contains(&code, "pub fn kind(&self) -> CursorKind");
    assert_contains(&code, "CursorKind::from(ffi::clang_getCursorKind(self.c))");
}

#[test]
fn test_slice_of_pointers_with_fixed_length() {
    let element = NativeType::pointer(NativeType::record("CXCursor"));
    let native = NativeStruct {
        name: "CXCursorSet".to_string(),
        fields: vec![NativeField {
            name: "cursors".to_string(),
            ty: NativeType::constant_array(element, 4),
            comment: Some("/** The cursors of the set. */".to_string()),
        }],
        comment: None,
    };
    let descriptors = describe_struct(&native, &TypeMapper::default(), &SliceMembers::new()).unwrap();
    let code = render(&synthesize(&descriptors[0]));

    assert_contains(&code, "/// The cursors of the set.");
    assert_contains(&code, "pub fn cursors(&self) -> Vec<Box<Cursor>>");
    assert_contains(&code, "let length = 4;");
    assert_contains(&code, "::std::slice::from_raw_parts(self.c.cursors.as_ptr(), length)");
    assert_contains(&code, ".map(|element| Box::new(Cursor { c: **element }))");
}

#[test]
fn test_member_getters() {
    let native = NativeStruct {
        name: "CXTUResourceUsage".to_string(),
        fields: vec![
            NativeField {
                name: "numEntries".to_string(),
                ty: NativeType::new("unsigned int", TypeKind::UInt),
                comment: None,
            },
            NativeField {
                name: "entries".to_string(),
                ty: NativeType::pointer(NativeType::record("CXTUResourceUsageEntry")),
                comment: None,
            },
        ],
        comment: None,
    };
    let descriptors = describe_struct(&native, &TypeMapper::default(), &SliceMembers::new()).unwrap();

    let count = render(&synthesize(&descriptors[0]));
    assert_contains(&count, "impl TUResourceUsage");
    assert_contains(&count, "pub fn num_entries(&self) -> u16 { unsafe { self.c.numEntries as u16 } }");

    let entries = render(&synthesize(&descriptors[1]));
    assert_contains(&entries, "pub fn entries(&self) -> Vec<TUResourceUsageEntry>");
    assert_contains(&entries, "let length = self.c.numEntries as usize;");
    assert_contains(&entries, "::std::slice::from_raw_parts(self.c.entries, length)");
    assert_contains(&entries, "TUResourceUsageEntry { c: *element }");
}

#[test]
fn test_custom_ffi_module() {
    let native = native_function("clang_isValid", NativeType::new("float", TypeKind::Float), vec![]);
    let function = describe(&native, &TypeMapper::default(), "clang_").unwrap();
    let result = synthesize(&model::Descriptor::Function(function));

    let item = Emitter::new("crate::sys").unwrap().emit(&result).unwrap();
    assert_eq!(item.name(), "is_valid");
    let GeneratedItem::Function(item) = item else {
        panic!("expected a free function");
    };
    let code = prettyplease::unparse(&syn::File {
        shebang: None,
        attrs: vec![],
        items: vec![syn::Item::Fn(item)],
    });
    assert_contains(&code, "crate::sys::clang_isValid()");
}

#[test]
fn test_invalid_identifier() {
    // A function-type spelling cannot be named in Rust
    let proto = NativeType::new("void (void *)", TypeKind::FunctionProto);
    let native = native_function(
        "clang_setVisitor",
        NativeType::new("void", TypeKind::Void),
        vec![param("visitor", NativeType::pointer(proto))],
    );
    let function = describe(&native, &TypeMapper::default(), "clang_").unwrap();
    let result = synthesize(&model::Descriptor::Function(function));

    let err = Emitter::default().emit(&result).unwrap_err();
    assert!(matches!(
        err,
        crate::error::GenerationError::InvalidIdentifier { ref name } if name == "void (void *)"
    ));
}
