//! Rendering of synthesis results as Rust items.
//!
//! Generated methods live in `impl` blocks of wrapper structs holding the native value
//! in a field named `c`, and call the raw bindings through the configured FFI module.
//! Besides those wrappers the output expects `CxString` (with `dispose` and `string`
//! methods) and the [`DEFERRED_GUARD`] item in scope.

use std::collections::HashMap;

use proc_macro2::{Ident, Literal, TokenStream};
use quote::quote;

use crate::{
    codegen::{
        model::{CastTarget, Expr, LocalType, Param, Signature, Stmt, SynthesisResult, ValueType},
        naming::sanitize_identifier,
        types::TIMESTAMP,
    },
    error::{GenerationError, Result},
};

/// Name of the scope guard running deferred cleanups
pub const DEFERRED_GUARD: &str = "Deferred";

const PRIMITIVES: &[&str] = &[
    "bool", "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64", "String",
];

/// One rendered callable.
#[derive(Debug, Clone)]
pub enum GeneratedItem {
    /// Method of the named wrapper type
    Method {
        receiver: String,
        item: syn::ImplItemFn,
    },
    /// Free function
    Function(syn::ItemFn),
}

impl GeneratedItem {
    pub fn name(&self) -> String {
        match self {
            GeneratedItem::Method { item, .. } => item.sig.ident.to_string(),
            GeneratedItem::Function(item) => item.sig.ident.to_string(),
        }
    }
}

/// The guard item backing deferred cleanups; emitted once per output file
pub fn deferred_guard() -> syn::Item {
    syn::parse_quote! {
        /// Runs the wrapped closure when dropped.
        struct Deferred<F: FnMut()>(F);
    }
}

/// `Drop` implementation of [`deferred_guard`]
pub fn deferred_guard_drop() -> syn::Item {
    syn::parse_quote! {
        impl<F: FnMut()> Drop for Deferred<F> {
            fn drop(&mut self) {
                (self.0)()
            }
        }
    }
}

/// Renders synthesis results against one FFI module.
#[derive(Debug, Clone)]
pub struct Emitter {
    ffi_module: syn::Path,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            ffi_module: syn::parse_quote!(ffi),
        }
    }
}

#[derive(Clone)]
struct Scope<'a> {
    receiver: Option<&'a str>,
    /// Locals read through a raw pointer inside deferred cleanups
    pointers: HashMap<&'a str, Ident>,
}

impl Emitter {
    /// Emitter calling native functions through `ffi_module`, e.g. `crate::sys`
    pub fn new(ffi_module: &str) -> Result<Self> {
        let ffi_module = syn::parse_str(ffi_module).map_err(|_| GenerationError::InvalidIdentifier {
            name: ffi_module.to_string(),
        })?;
        Ok(Self { ffi_module })
    }

    pub fn emit(&self, result: &SynthesisResult) -> Result<GeneratedItem> {
        let signature = &result.signature;
        let scope = Scope {
            receiver: signature.receiver.as_ref().map(|r| r.name.as_str()),
            pointers: HashMap::new(),
        };

        let name = ident(&signature.name)?;
        let params = signature
            .parameters
            .iter()
            .map(|p| self.param(p))
            .collect::<Result<Vec<_>>>()?;
        let output = self.output(signature)?;
        let body = self.body(&result.body, &scope)?;
        let doc = result
            .doc
            .as_ref()
            .map(|doc| {
                let doc = format!(" {doc}");
                quote!(#[doc = #doc])
            })
            .unwrap_or_default();

        let inputs = signature
            .receiver
            .as_ref()
            .map(|_| quote!(&self))
            .into_iter()
            .chain(params);
        let tokens = quote! {
            #doc
            pub fn #name(#(#inputs),*) #output {
                unsafe {
                    #body
                }
            }
        };
        log::trace!("{}: {}", signature.name, tokens);

        let invalid = |e: syn::Error| GenerationError::malformed(&signature.name, e.to_string());
        Ok(match &signature.receiver {
            Some(receiver) => GeneratedItem::Method {
                receiver: ident(&receiver.ty.target_name)?.to_string(),
                item: syn::parse2(tokens).map_err(invalid)?,
            },
            None => GeneratedItem::Function(syn::parse2(tokens).map_err(invalid)?),
        })
    }

    fn param(&self, param: &Param) -> Result<TokenStream> {
        let name = ident(&param.name)?;
        let ty = self.value_type(&param.ty)?;
        Ok(quote!(#name: #ty))
    }

    fn output(&self, signature: &Signature) -> Result<TokenStream> {
        let types = signature
            .returns
            .iter()
            .map(|ty| self.value_type(ty))
            .collect::<Result<Vec<_>>>()?;
        Ok(match types.as_slice() {
            [] => TokenStream::new(),
            [single] => quote!(-> #single),
            many => quote!(-> (#(#many),*)),
        })
    }

    fn value_type(&self, ty: &ValueType) -> Result<TokenStream> {
        Ok(match ty {
            ValueType::Named(name) => self.named_type(name)?,
            ValueType::Str => quote!(&str),
            ValueType::Boxed(name) => {
                let inner = self.named_type(name)?;
                quote!(Box<#inner>)
            }
            ValueType::Borrowed(name) => {
                let inner = self.named_type(name)?;
                quote!(&mut #inner)
            }
            ValueType::Raw { marshal, depth } => self.pointer_type(marshal, *depth)?,
            ValueType::Sequence(element) => {
                let element = self.value_type(element)?;
                quote!(Vec<#element>)
            }
        })
    }

    fn named_type(&self, name: &str) -> Result<TokenStream> {
        if name == TIMESTAMP {
            return Ok(quote!(::std::time::SystemTime));
        }
        let name = ident(name)?;
        Ok(quote!(#name))
    }

    fn marshal_type(&self, name: &str) -> Result<TokenStream> {
        let ffi = &self.ffi_module;
        let ty = ident(name)?;
        Ok(if name.starts_with("c_") {
            quote!(::std::os::raw::#ty)
        } else if PRIMITIVES.contains(&name) {
            quote!(#ty)
        } else {
            quote!(#ffi::#ty)
        })
    }

    fn pointer_type(&self, marshal: &str, depth: usize) -> Result<TokenStream> {
        let mut ty = self.marshal_type(marshal)?;
        for _ in 0..depth {
            ty = quote!(*mut #ty);
        }
        Ok(ty)
    }

    fn body(&self, body: &[Stmt], scope: &Scope) -> Result<TokenStream> {
        let mut tokens = TokenStream::new();
        for stmt in body {
            tokens.extend(self.stmt(stmt, scope)?);
        }
        Ok(tokens)
    }

    fn stmt(&self, stmt: &Stmt, scope: &Scope) -> Result<TokenStream> {
        Ok(match stmt {
            Stmt::DeclareOut { name, ty } => {
                let name = ident(name)?;
                let ty = match ty {
                    LocalType::Marshal(marshal) => self.marshal_type(marshal)?,
                    LocalType::Wrapper(wrapper) => self.named_type(wrapper)?,
                };
                quote!(let mut #name: #ty = ::std::mem::zeroed();)
            }
            Stmt::Let { name, value } => {
                let name = ident(name)?;
                let value = self.expr(value, scope)?;
                quote!(let #name = #value;)
            }
            Stmt::Defer(cleanup) => self.defer(cleanup, scope)?,
            Stmt::Eval(expr) => {
                let expr = self.expr(expr, scope)?;
                quote!(#expr;)
            }
            Stmt::Return(values) => {
                let values = values
                    .iter()
                    .map(|v| self.expr(v, scope))
                    .collect::<Result<Vec<_>>>()?;
                match values.as_slice() {
                    [single] => quote!(#single),
                    many => quote!((#(#many),*)),
                }
            }
        })
    }

    /// The cleanup reads its locals through raw pointers so that they stay usable
    /// (and mutably borrowable) until the guard fires.
    fn defer<'a>(&self, cleanup: &'a Expr, scope: &Scope<'a>) -> Result<TokenStream> {
        let guard = ident(DEFERRED_GUARD)?;
        let mut inner = scope.clone();
        let mut pointers = TokenStream::new();
        for local in cleanup.locals() {
            if Some(local) == scope.receiver {
                continue;
            }
            let name = ident(local)?;
            let pointer = ident(&format!("{local}_ptr"))?;
            pointers.extend(quote!(let #pointer = ::std::ptr::addr_of!(#name);));
            inner.pointers.insert(local, pointer);
        }
        let cleanup = self.expr(cleanup, &inner)?;
        Ok(quote! {
            #pointers
            let _deferred = #guard(move || {
                #cleanup;
            });
        })
    }

    fn expr(&self, expr: &Expr, scope: &Scope) -> Result<TokenStream> {
        let ffi = &self.ffi_module;
        Ok(match expr {
            Expr::Local(name) if scope.receiver == Some(name.as_str()) => quote!(self),
            Expr::Local(name) => match scope.pointers.get(name.as_str()) {
                Some(pointer) => quote!((*#pointer)),
                None => {
                    let name = ident(name)?;
                    quote!(#name)
                }
            },
            Expr::Field { base, field } => {
                let base = self.expr(base, scope)?;
                let field = ident(&sanitize_identifier(field))?;
                quote!(#base.#field)
            }
            Expr::NativeCall { function, args } => {
                let function = ident(function)?;
                let args = args
                    .iter()
                    .map(|a| self.expr(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                quote!(#ffi::#function(#(#args),*))
            }
            Expr::Cast { value, to } => {
                let value = self.expr(value, scope)?;
                match to {
                    CastTarget::Marshal { name, depth, .. } if *depth > 0 => {
                        let ty = self.pointer_type(name, *depth)?;
                        quote!(#value as #ty)
                    }
                    CastTarget::Marshal { name, is_enum, .. } => {
                        let ty = self.marshal_type(name)?;
                        if *is_enum {
                            quote!(#ty::from(#value))
                        } else {
                            quote!(#value as #ty)
                        }
                    }
                    CastTarget::Target { name, is_enum } => {
                        let ty = self.named_type(name)?;
                        if *is_enum {
                            quote!(#ty::from(#value))
                        } else {
                            quote!(#value as #ty)
                        }
                    }
                    CastTarget::Length => quote!(#value as usize),
                }
            }
            Expr::Construct { ty, value } => {
                let ty = self.named_type(ty)?;
                let value = self.expr(value, scope)?;
                quote!(#ty { c: #value })
            }
            Expr::Deref(value) => {
                let value = self.expr(value, scope)?;
                quote!(*#value)
            }
            Expr::AddressOf(value) => {
                let value = self.expr(value, scope)?;
                quote!(&mut #value)
            }
            Expr::Boxed(value) => {
                let value = self.expr(value, scope)?;
                quote!(Box::new(#value))
            }
            Expr::Integer(n) => {
                let n = Literal::u64_unsuffixed(*n);
                quote!(#n)
            }
            Expr::Zero(marshal) => {
                let ty = self.marshal_type(marshal)?;
                quote!(0 as #ty)
            }
            Expr::NotEqual(a, b) => {
                let a = self.expr(a, scope)?;
                let b = self.expr(b, scope)?;
                quote!(#a != #b)
            }
            Expr::AllocNativeString(value) => {
                let value = self.expr(value, scope)?;
                // Text past an interior NUL is unreachable from C anyway
                quote!(::std::ffi::CString::new(#value.split('\0').next().unwrap_or_default())
                    .unwrap_or_default()
                    .into_raw())
            }
            Expr::FreeNativeString(value) => {
                let value = self.expr(value, scope)?;
                quote!(drop(::std::ffi::CString::from_raw(#value)))
            }
            Expr::CopyNativeString(value) => {
                let value = self.expr(value, scope)?;
                quote! {
                    {
                        let ptr = #value;
                        if ptr.is_null() {
                            String::new()
                        } else {
                            ::std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
                        }
                    }
                }
            }
            Expr::Dispose(value) => {
                let value = self.expr(value, scope)?;
                quote!(#value.dispose())
            }
            Expr::StringContent(value) => {
                let value = self.expr(value, scope)?;
                quote!(#value.string())
            }
            Expr::FromEpochSeconds(value) => {
                let value = self.expr(value, scope)?;
                quote!(::std::time::UNIX_EPOCH + ::std::time::Duration::from_secs(#value as u64))
            }
            Expr::ToEpochSeconds(value) => {
                let value = self.expr(value, scope)?;
                quote!(#value.duration_since(::std::time::UNIX_EPOCH).map_or(0, |d| d.as_secs()))
            }
            Expr::NativeSlice {
                source,
                length,
                is_fixed_array,
            } => {
                let source = self.expr(source, scope)?;
                let length = self.expr(length, scope)?;
                let start = if *is_fixed_array {
                    quote!(#source.as_ptr())
                } else {
                    quote!(#source)
                };
                quote! {
                    if #length == 0 {
                        <&[_]>::default()
                    } else {
                        ::std::slice::from_raw_parts(#start, #length)
                    }
                }
            }
            Expr::MapElements {
                slice,
                element,
                convert,
            } => {
                let slice = self.expr(slice, scope)?;
                let element = ident(element)?;
                let convert = self.expr(convert, scope)?;
                quote!(#slice.iter().map(|#element| #convert).collect::<Vec<_>>())
            }
        })
    }
}

/// Parse `name` as an identifier, refusing keywords and malformed names
fn ident(name: &str) -> Result<Ident> {
    syn::parse_str::<Ident>(name).map_err(|_| GenerationError::InvalidIdentifier {
        name: name.to_string(),
    })
}
