//! Accessors for the fields of native structs.
//!
//! Every field becomes either a member getter or, when it holds several elements, a
//! slice accessor copying them out. A fixed array carries its own length; a pointer
//! field needs a sibling field holding the element count.

use std::collections::HashMap;

use crate::{
    api::native::{NativeField, NativeStruct, NativeType},
    codegen::{
        function::{convert_result, pointee},
        model::{
            BodyBuilder, CastTarget, Descriptor, Expr, FunctionDescriptor, LengthSource,
            ParameterDescriptor, ReceiverDescriptor, Signature, SliceAccessorDescriptor,
            SynthesisResult, ValueType,
        },
        naming::{
            derive_array_name, has_boolean_prefix, receiver_name, sanitize_identifier,
            to_snake_case,
        },
        types::{TypeDescriptor, TypeMapper, ValueShape, OPAQUE},
    },
    error::{GenerationError, Result},
    utils::doc::clean_comment,
};

/// Receiver name used when the type name has no uppercase letter
const DEFAULT_RECEIVER: &str = "s";

/// Per-member slice settings: member name to its explicit length field, if any
pub type SliceMembers = HashMap<String, Option<String>>;

/// Describe the accessors of every field of `native`, in field order.
///
/// Pointer fields listed in `slice_members`, or paired with a count field by naming
/// convention, become slice accessors; all other fields get a member getter.
pub fn describe_struct(
    native: &NativeStruct,
    mapper: &TypeMapper,
    slice_members: &SliceMembers,
) -> Result<Vec<Descriptor>> {
    let record = mapper.resolve(&NativeType::record(&native.name))?;
    let receiver = ReceiverDescriptor {
        name: receiver_name(&record.target_name).unwrap_or_else(|| DEFAULT_RECEIVER.to_string()),
        ty: record,
    };

    let fields = native
        .fields
        .iter()
        .map(|field| Ok((field, mapper.resolve(&field.ty)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut descriptors = Vec::with_capacity(fields.len());
    for (field, ty) in &fields {
        let doc_comment = field.comment.as_deref().and_then(clean_comment);

        if ty.is_array {
            let length = ty.fixed_array_length.ok_or_else(|| {
                GenerationError::unresolved_length(&native.name, &field.name)
            })?;
            let mut element = ty.clone();
            element.is_array = false;
            element.fixed_array_length = None;
            descriptors.push(Descriptor::SliceAccessor(slice_descriptor(
                &receiver,
                field,
                element,
                LengthSource::Fixed(length),
                None,
                doc_comment,
            )));
            continue;
        }

        let explicit = slice_members.get(&field.name);
        let length_field = match explicit {
            Some(Some(length_field)) => Some(length_field.clone()),
            Some(None) => Some(
                find_length_field(&fields, &field.name)
                    .ok_or_else(|| GenerationError::unresolved_length(&native.name, &field.name))?,
            ),
            None if is_sliceable(ty) => find_length_field(&fields, &field.name),
            None => None,
        };

        match length_field {
            Some(length_field) => {
                log::debug!("{}.{}: slice sized by {length_field}", native.name, field.name);
                let element = pointee(ty).into_slice(&length_field);
                let name = derive_array_name(&length_field).map(str::to_string);
                descriptors.push(Descriptor::SliceAccessor(slice_descriptor(
                    &receiver,
                    field,
                    element,
                    LengthSource::Field(length_field),
                    name,
                    doc_comment,
                )));
            }
            None => descriptors.push(Descriptor::Function(getter_descriptor(
                &receiver,
                field,
                ty.clone(),
                doc_comment,
            ))),
        }
    }
    Ok(descriptors)
}

fn is_sliceable(ty: &TypeDescriptor) -> bool {
    ty.pointer_depth >= 1
        && !ty.is_function_pointer
        && ty.shape != ValueShape::PlainString
        && ty.target_name != OPAQUE
}

/// Sibling integer field whose derived array name is `member`, ignoring case
fn find_length_field(fields: &[(&NativeField, TypeDescriptor)], member: &str) -> Option<String> {
    fields
        .iter()
        .filter(|(_, ty)| {
            ty.shape == ValueShape::PrimitiveOrEnum && ty.pointer_depth == 0 && !ty.is_enum_literal
        })
        .find(|(field, _)| {
            derive_array_name(&field.name).is_some_and(|name| name.eq_ignore_ascii_case(member))
        })
        .map(|(field, _)| field.name.clone())
}

fn slice_descriptor(
    receiver: &ReceiverDescriptor,
    field: &NativeField,
    element: TypeDescriptor,
    length_source: LengthSource,
    name: Option<String>,
    doc_comment: Option<String>,
) -> SliceAccessorDescriptor {
    let dimension = if element.pointer_depth >= 1
        && matches!(element.shape, ValueShape::Composite | ValueShape::PrimitiveOrEnum)
        && element.target_name != OPAQUE
    {
        2
    } else {
        1
    };
    let name = name.as_deref().unwrap_or(&field.name);
    SliceAccessorDescriptor {
        target_name: sanitize_identifier(&to_snake_case(name)),
        doc_comment,
        receiver: receiver.clone(),
        element_type: element,
        dimension,
        length_source,
        source_member_name: field.name.clone(),
    }
}

fn getter_descriptor(
    receiver: &ReceiverDescriptor,
    field: &NativeField,
    ty: TypeDescriptor,
    doc_comment: Option<String>,
) -> FunctionDescriptor {
    let ty = if has_boolean_prefix(&field.name) && ty.is_short_integer() {
        ty.coerced_to_bool()
    } else {
        ty
    };
    FunctionDescriptor {
        native_name: field.name.clone(),
        target_name: sanitize_identifier(&to_snake_case(&field.name)),
        doc_comment,
        parameters: vec![ParameterDescriptor {
            native_name: String::new(),
            target_name: receiver.name.clone(),
            ty: receiver.ty.clone(),
            is_out_parameter: false,
        }],
        return_type: ty,
        receiver: Some(receiver.clone()),
        member_name: Some(field.name.clone()),
    }
}

/// Getter returning one field of the receiver, converted like a function result.
///
/// `function` must carry a receiver and a member name.
pub fn synthesize_getter(function: &FunctionDescriptor) -> SynthesisResult {
    let receiver = function
        .receiver
        .as_ref()
        .map(|r| r.name.as_str())
        .unwrap_or(DEFAULT_RECEIVER);
    let member = function
        .member_name
        .as_deref()
        .unwrap_or(&function.native_name);
    let field = Expr::local(receiver).field("c").field(member);

    let (value, returns) = convert_result(field, &function.return_type);

    let mut body = BodyBuilder::new();
    body.returns(vec![value]);
    SynthesisResult {
        descriptor: Descriptor::Function(function.clone()),
        doc: function.doc_comment.clone(),
        signature: Signature {
            name: function.target_name.clone(),
            receiver: function.receiver.clone(),
            parameters: Vec::new(),
            returns: vec![returns],
        },
        body: body.build(),
    }
}

/// Accessor copying the elements of an array field into an owned sequence.
pub fn synthesize_slice(slice: &SliceAccessorDescriptor) -> SynthesisResult {
    let receiver = || Expr::local(&slice.receiver.name).field("c");
    let length = match &slice.length_source {
        LengthSource::Fixed(n) => Expr::Integer(*n),
        LengthSource::Field(name) => receiver().field(name).cast(CastTarget::Length),
    };

    let element = &slice.element_type;
    let current = Expr::local("element").deref();
    let (convert, element_type) = if slice.dimension == 2 {
        let mut value = element.clone();
        value.pointer_depth -= 1;
        match convert_result(current.deref(), &value) {
            (converted, ValueType::Named(name)) => (converted.boxed(), ValueType::Boxed(name)),
            other => other,
        }
    } else {
        convert_result(current, element)
    };

    let mut body = BodyBuilder::new();
    body.bind("length", length)
        .bind(
            "elements",
            Expr::NativeSlice {
                source: Box::new(receiver().field(&slice.source_member_name)),
                length: Box::new(Expr::local("length")),
                is_fixed_array: matches!(slice.length_source, LengthSource::Fixed(_)),
            },
        )
        .returns(vec![Expr::MapElements {
            slice: Box::new(Expr::local("elements")),
            element: "element".to_string(),
            convert: Box::new(convert),
        }]);

    SynthesisResult {
        descriptor: Descriptor::SliceAccessor(slice.clone()),
        doc: slice.doc_comment.clone(),
        signature: Signature {
            name: slice.target_name.clone(),
            receiver: Some(slice.receiver.clone()),
            parameters: Vec::new(),
            returns: vec![ValueType::Sequence(Box::new(element_type))],
        },
        body: body.build(),
    }
}
