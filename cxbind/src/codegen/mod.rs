pub mod accessor;
pub mod emit;
pub mod function;
pub mod model;
pub mod naming;
pub mod types;

#[cfg(test)]
mod tests;

use crate::codegen::model::{Descriptor, SynthesisResult};

/// Lower any descriptor into its synthesis result
pub fn synthesize(descriptor: &Descriptor) -> SynthesisResult {
    match descriptor {
        Descriptor::Function(function) if function.member_name.is_some() => {
            accessor::synthesize_getter(function)
        }
        Descriptor::Function(function) => function::synthesize(function),
        Descriptor::SliceAccessor(slice) => accessor::synthesize_slice(slice),
    }
}
