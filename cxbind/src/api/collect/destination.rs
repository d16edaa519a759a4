use std::path::{Path, PathBuf};
use std::{env, fs, io};

use crate::{
    api::native::SourceLocation,
    codegen::emit::{deferred_guard, deferred_guard_drop, GeneratedItem},
};

/// A destination for collecting generated wrapper items and writing them as one file.
///
/// Methods are grouped into one `impl` block per receiver type, in the order the types
/// first appear; free functions follow the last `impl` block. The guard used by deferred
/// cleanups is emitted at the top of the file.
///
/// # Usage
///
/// ```no_run
/// use cxbind::{collect::Destination, Generator, Source};
///
/// let source = Source::new("target/declarations").unwrap();
/// let generator = Generator::builder().build().unwrap();
/// let destination: Destination = source
///     .declarations()
///     .map(generator.into_closure())
///     .filter_map(Result::ok)
///     .flatten()
///     .collect();
///
/// // Relative paths land in OUT_DIR
/// let bindings_file = destination.write("clang.rs").unwrap();
/// ```
pub struct Destination {
    file: syn::File,
}

impl FromIterator<GeneratedItem> for Destination {
    fn from_iter<T: IntoIterator<Item = GeneratedItem>>(iter: T) -> Self {
        let mut impls: Vec<(String, Vec<syn::ImplItem>)> = Vec::new();
        let mut functions = Vec::new();
        for item in iter {
            match item {
                GeneratedItem::Method { receiver, item } => {
                    match impls.iter_mut().find(|(name, _)| *name == receiver) {
                        Some((_, methods)) => methods.push(syn::ImplItem::Fn(item)),
                        None => impls.push((receiver, vec![syn::ImplItem::Fn(item)])),
                    }
                }
                GeneratedItem::Function(item) => functions.push(syn::Item::Fn(item)),
            }
        }

        let mut items = vec![deferred_guard(), deferred_guard_drop()];
        for (receiver, methods) in impls {
            let receiver = syn::Ident::new(&receiver, proc_macro2::Span::call_site());
            items.push(syn::parse_quote! {
                impl #receiver {
                    #(#methods)*
                }
            });
        }
        items.extend(functions);

        Self {
            file: syn::File {
                shebang: None,
                attrs: vec![],
                items,
            },
        }
    }
}

impl FromIterator<(GeneratedItem, SourceLocation)> for Destination {
    /// The source location information is discarded during collection
    fn from_iter<T: IntoIterator<Item = (GeneratedItem, SourceLocation)>>(iter: T) -> Self {
        iter.into_iter().map(|(item, _)| item).collect()
    }
}

impl Destination {
    pub fn file(&self) -> &syn::File {
        &self.file
    }

    /// Formatted source of the collected items
    pub fn to_source(&self) -> String {
        prettyplease::unparse(&self.file)
    }

    /// Writes the collected items to a file and returns its path.
    ///
    /// Relative paths are resolved against the `OUT_DIR` environment variable, absolute
    /// paths are used as-is.
    pub fn write<P: AsRef<Path>>(self, filename: P) -> io::Result<PathBuf> {
        let file_path = if filename.as_ref().is_relative() {
            let out_dir = env::var("OUT_DIR").map_err(|_| {
                io::Error::new(io::ErrorKind::NotFound, "OUT_DIR environment variable not set")
            })?;
            PathBuf::from(out_dir).join(filename)
        } else {
            filename.as_ref().to_path_buf()
        };

        fs::write(&file_path, self.to_source())?;
        log::debug!("wrote {}", file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(receiver: &str, item: syn::ImplItemFn) -> GeneratedItem {
        GeneratedItem::Method {
            receiver: receiver.to_string(),
            item,
        }
    }

    #[test]
    fn test_methods_grouped_by_receiver() {
        let destination: Destination = vec![
            method("Cursor", syn::parse_quote!(pub fn kind(&self) {})),
            GeneratedItem::Function(syn::parse_quote!(pub fn null_cursor() {})),
            method("File", syn::parse_quote!(pub fn name(&self) {})),
            method("Cursor", syn::parse_quote!(pub fn spelling(&self) {})),
        ]
        .into_iter()
        .collect();

        // Guard struct, its Drop impl, two receivers, one free function
        let items = &destination.file().items;
        assert_eq!(items.len(), 5);
        let syn::Item::Impl(cursor) = &items[2] else {
            panic!("expected the Cursor impl block");
        };
        assert_eq!(cursor.items.len(), 2);
        assert!(matches!(items[4], syn::Item::Fn(_)));

        let code = destination.to_source();
        assert_eq!(code.matches("impl Cursor {").count(), 1);
        assert!(code.find("impl Cursor").unwrap() < code.find("impl File").unwrap());
        assert!(code.find("impl File").unwrap() < code.find("fn null_cursor").unwrap());
    }

    #[test]
    fn test_empty_destination_still_has_guard() {
        let destination: Destination = Vec::<GeneratedItem>::new().into_iter().collect();
        let code = destination.to_source();
        assert!(code.contains("struct Deferred<F: FnMut()>(F);"));
        assert!(code.contains("impl<F: FnMut()> Drop for Deferred<F>"));
    }

    #[test]
    fn test_write_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let destination: Destination = Vec::<GeneratedItem>::new().into_iter().collect();
        let path = destination.write(dir.path().join("out.rs")).unwrap();
        assert!(path.exists());
        assert!(fs::read_to_string(path).unwrap().contains("Deferred"));
    }
}
