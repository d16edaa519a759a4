//! Synthesis of wrapper methods around native functions.
//!
//! [`describe`] turns a native declaration into a [`FunctionDescriptor`]; the driver
//! then decides on the receiver and the out-parameters; [`synthesize`] finally lowers
//! the descriptor into a signature and a statement list.

use std::collections::HashSet;

use crate::{
    api::native::NativeFunction,
    codegen::{
        model::{
            BodyBuilder, CastTarget, Descriptor, Expr, FunctionDescriptor, LocalType, Param,
            ParameterDescriptor, ReceiverDescriptor, Signature, SynthesisResult, ValueType,
        },
        naming::{has_boolean_prefix, method_name, receiver_name, sanitize_identifier, to_snake_case},
        types::{TypeDescriptor, TypeMapper, ValueShape, DISPOSABLE_STRING, OPAQUE, STRING},
    },
    error::{GenerationError, Result},
    utils::doc::clean_comment,
};

/// Name of the local holding the primary result while out-parameters are read
const RESULT_LOCAL: &str = "o";

/// Map the return and parameter types of `native`, without binding a receiver.
///
/// Integer results of `is...`/`has...` functions are reinterpreted as truth flags.
pub fn describe(
    native: &NativeFunction,
    mapper: &TypeMapper,
    function_prefix: &str,
) -> Result<FunctionDescriptor> {
    let mut return_type = mapper.resolve(&native.result_type)?;
    let stripped = native
        .name
        .strip_prefix(function_prefix)
        .unwrap_or(&native.name);
    if has_boolean_prefix(stripped) && return_type.is_short_integer() {
        log::debug!("{}: integer result coerced to bool", native.name);
        return_type = return_type.coerced_to_bool();
    }

    let mut used = HashSet::new();
    let mut parameters = Vec::with_capacity(native.arguments.len());
    for (i, argument) in native.arguments.iter().enumerate() {
        let ty = mapper.resolve(&argument.ty)?;
        let base = if argument.name.is_empty() {
            receiver_name(&ty.target_name).unwrap_or_else(|| format!("arg{i}"))
        } else {
            sanitize_identifier(&to_snake_case(&argument.name))
        };
        let target_name = if used.contains(&base) {
            format!("{base}{i}")
        } else {
            base
        };
        used.insert(target_name.clone());
        parameters.push(ParameterDescriptor {
            native_name: argument.name.clone(),
            target_name,
            ty,
            is_out_parameter: false,
        });
    }

    Ok(FunctionDescriptor {
        native_name: native.name.clone(),
        target_name: method_name(&native.name, function_prefix, mapper.library_prefix(), None),
        doc_comment: native.comment.as_deref().and_then(clean_comment),
        parameters,
        return_type,
        receiver: None,
        member_name: None,
    })
}

impl FunctionDescriptor {
    /// Whether the first parameter can become the method receiver
    pub fn can_bind_receiver(&self) -> bool {
        self.parameters
            .first()
            .is_some_and(|p| p.ty.shape == ValueShape::Composite && p.ty.pointer_depth == 0)
    }

    /// Promote the first parameter to the receiver and rename the method after it.
    pub fn bind_receiver(&mut self, function_prefix: &str, library_prefix: &str) {
        let Some(first) = self.parameters.first_mut() else {
            return;
        };
        let receiver_type = first.ty.target_name.clone();
        first.is_out_parameter = false;
        // Keep the declared name when the short one is taken by another parameter
        let short_name = receiver_name(&receiver_type)
            .filter(|name| !self.parameters[1..].iter().any(|p| &p.target_name == name));
        let first = &mut self.parameters[0];
        if let Some(name) = short_name {
            first.target_name = name;
        }
        self.receiver = Some(ReceiverDescriptor {
            name: first.target_name.clone(),
            ty: first.ty.clone(),
        });
        self.target_name = method_name(
            &self.native_name,
            function_prefix,
            library_prefix,
            Some(&receiver_type),
        );
    }

    /// Treat the parameter at `index` as an out-parameter.
    ///
    /// Only single-level pointers to something other than a string or a function can
    /// carry a result back.
    pub fn mark_out_parameter(&mut self, index: usize) -> Result<()> {
        let is_receiver = index == 0 && self.receiver.is_some();
        let native_name = self.native_name.clone();
        let param = self
            .parameters
            .get_mut(index)
            .filter(|_| !is_receiver)
            .ok_or_else(|| {
                GenerationError::malformed(&native_name, format!("no parameter {index} to return"))
            })?;
        if !is_out_candidate(&param.ty) {
            return Err(GenerationError::malformed(
                native_name,
                format!(
                    "parameter {:?} of type {:?} cannot be an out-parameter",
                    param.native_name, param.ty.native_name
                ),
            ));
        }
        param.is_out_parameter = true;
        Ok(())
    }

    /// Indices of the trailing run of parameters that look like out-parameters.
    ///
    /// The first parameter is always an input, and disposal functions take
    /// everything by pointer without writing back.
    pub fn inferred_out_parameters(&self) -> Vec<usize> {
        if self.native_name.contains("dispose") {
            return Vec::new();
        }
        let mut indices: Vec<usize> = self
            .parameters
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .take_while(|(_, p)| is_out_candidate(&p.ty) && !p.ty.points_to_const)
            .map(|(i, _)| i)
            .collect();
        indices.reverse();
        indices
    }
}

fn is_out_candidate(ty: &TypeDescriptor) -> bool {
    ty.pointer_depth == 1
        && !ty.is_function_pointer
        && !ty.is_array
        && ty.shape != ValueShape::PlainString
        && ty.target_name != OPAQUE
}

/// Lower a function descriptor into a signature and its body.
pub fn synthesize(function: &FunctionDescriptor) -> SynthesisResult {
    let mut body = BodyBuilder::new();
    let has_receiver = function.receiver.is_some() && !function.parameters.is_empty();
    let result_local = result_local_name(function);

    // Out-parameters: declared ahead of everything else, read back after the call
    let mut out_values = Vec::new();
    let mut out_types = Vec::new();
    for param in function.out_parameters() {
        let (value, ty) = declare_out(&mut body, param);
        out_values.push(value);
        out_types.push(ty);
    }

    let mut args = Vec::with_capacity(function.parameters.len());
    for (i, param) in function.parameters.iter().enumerate() {
        if has_receiver && i == 0 {
            args.push(Expr::local(&param.target_name).field("c"));
        } else if param.is_out_parameter {
            args.push(out_argument(param));
        } else {
            args.push(input_argument(&mut body, param));
        }
    }
    let call = Expr::native_call(&function.native_name, args);

    let ret = &function.return_type;
    let has_outs = !out_values.is_empty();
    let mut values = Vec::new();
    let mut returns = Vec::new();
    match ret.shape {
        _ if ret.is_void() => {
            body.eval(call);
        }
        ValueShape::CoercedBool => {
            let zero = Expr::Zero(marshal_of(ret));
            body.bind(&result_local, call);
            values.push(Expr::local(&result_local).not_equal(zero));
            returns.push(ValueType::Named(ret.target_name.clone()));
        }
        ValueShape::DisposableString => {
            body.bind(&result_local, call.construct(DISPOSABLE_STRING))
                .defer(Expr::local(&result_local).dispose());
            values.push(Expr::local(&result_local).string_content());
            returns.push(ValueType::Named(STRING.to_string()));
        }
        ValueShape::PlainString => {
            values.push(call.copy_native_string());
            returns.push(ValueType::Named(STRING.to_string()));
        }
        ValueShape::Timestamp => {
            values.push(call.from_epoch_seconds());
            returns.push(ValueType::Named(ret.target_name.clone()));
        }
        _ => {
            let (converted, ty) = convert_result(call, ret);
            if has_outs {
                // The call must happen before any out-parameter is read back
                body.bind(&result_local, converted);
                values.push(Expr::local(&result_local));
            } else {
                values.push(converted);
            }
            returns.push(ty);
        }
    }

    values.extend(out_values);
    returns.extend(out_types);
    if !values.is_empty() {
        body.returns(values);
    }

    let parameters = function
        .input_parameters()
        .map(|p| Param {
            name: p.target_name.clone(),
            ty: input_type(&p.ty),
        })
        .collect();

    SynthesisResult {
        descriptor: Descriptor::Function(function.clone()),
        doc: function.doc_comment.clone(),
        signature: Signature {
            name: function.target_name.clone(),
            receiver: function.receiver.clone(),
            parameters,
            returns,
        },
        body: body.build(),
    }
}

fn result_local_name(function: &FunctionDescriptor) -> String {
    let mut name = RESULT_LOCAL.to_string();
    while function.parameters.iter().any(|p| p.target_name == name) {
        name.push('_');
    }
    name
}

fn declare_out(body: &mut BodyBuilder, param: &ParameterDescriptor) -> (Expr, ValueType) {
    let name = &param.target_name;
    let value = pointee(&param.ty);
    match value.shape {
        ValueShape::DisposableString => {
            body.declare_out(name, LocalType::Wrapper(DISPOSABLE_STRING.to_string()))
                .defer(Expr::local(name).dispose());
            (
                Expr::local(name).string_content(),
                ValueType::Named(STRING.to_string()),
            )
        }
        ValueShape::Composite => {
            body.declare_out(name, LocalType::Wrapper(value.target_name.clone()));
            (
                Expr::local(name),
                ValueType::Named(value.target_name.clone()),
            )
        }
        _ => {
            body.declare_out(name, LocalType::Marshal(marshal_of(&value)));
            convert_result(Expr::local(name), &value)
        }
    }
}

fn out_argument(param: &ParameterDescriptor) -> Expr {
    let local = Expr::local(&param.target_name);
    match param.ty.shape {
        ValueShape::DisposableString | ValueShape::Composite => local.field("c").address_of(),
        _ => local.address_of(),
    }
}

fn input_argument(body: &mut BodyBuilder, param: &ParameterDescriptor) -> Expr {
    let ty = &param.ty;
    let value = Expr::local(&param.target_name);
    match ty.shape {
        ValueShape::PlainString => {
            let transient = format!("c_{}", param.target_name);
            body.bind(&transient, value.alloc_native_string())
                .defer(Expr::local(&transient).free_native_string());
            Expr::local(transient)
        }
        ValueShape::DisposableString => value.field("c"),
        ValueShape::Composite if ty.pointer_depth == 0 => value.field("c"),
        ValueShape::Composite => value.field("c").address_of(),
        ValueShape::Timestamp => value.to_epoch_seconds().cast(marshal_cast(ty)),
        ValueShape::PrimitiveOrEnum => value.cast(marshal_cast(ty)),
        ValueShape::Bool | ValueShape::CoercedBool | ValueShape::Void => value,
    }
}

/// Convert a native value of type `ty` into its Rust-facing form
pub(crate) fn convert_result(value: Expr, ty: &TypeDescriptor) -> (Expr, ValueType) {
    match ty.shape {
        ValueShape::Composite if ty.pointer_depth == 0 => (
            value.construct(&ty.target_name),
            ValueType::Named(ty.target_name.clone()),
        ),
        ValueShape::Composite => (
            value.deref().construct(&ty.target_name).boxed(),
            ValueType::Boxed(ty.target_name.clone()),
        ),
        ValueShape::PrimitiveOrEnum if ty.pointer_depth == 0 => (
            value.cast(CastTarget::Target {
                name: ty.target_name.clone(),
                is_enum: ty.is_enum_literal,
            }),
            ValueType::Named(ty.target_name.clone()),
        ),
        ValueShape::PrimitiveOrEnum | ValueShape::Void => (
            value,
            ValueType::Raw {
                marshal: marshal_of(ty),
                depth: ty.pointer_depth,
            },
        ),
        ValueShape::PlainString => (value.copy_native_string(), ValueType::Named(STRING.to_string())),
        ValueShape::DisposableString => (
            value.construct(DISPOSABLE_STRING),
            ValueType::Named(DISPOSABLE_STRING.to_string()),
        ),
        ValueShape::Timestamp => (
            value.from_epoch_seconds(),
            ValueType::Named(ty.target_name.clone()),
        ),
        ValueShape::Bool => (value, ValueType::Named(ty.target_name.clone())),
        ValueShape::CoercedBool => (
            value.not_equal(Expr::Zero(marshal_of(ty))),
            ValueType::Named(ty.target_name.clone()),
        ),
    }
}

/// Type of an input parameter as seen by callers
pub(crate) fn input_type(ty: &TypeDescriptor) -> ValueType {
    match ty.shape {
        ValueShape::PlainString => ValueType::Str,
        ValueShape::Composite if ty.pointer_depth > 0 => ValueType::Borrowed(ty.target_name.clone()),
        ValueShape::PrimitiveOrEnum | ValueShape::Void if ty.pointer_depth > 0 => ValueType::Raw {
            marshal: marshal_of(ty),
            depth: ty.pointer_depth,
        },
        _ => ValueType::Named(ty.target_name.clone()),
    }
}

/// Descriptor of the value a single-level pointer points to
pub(crate) fn pointee(ty: &TypeDescriptor) -> TypeDescriptor {
    let mut value = ty.clone();
    value.pointer_depth = value.pointer_depth.saturating_sub(1);
    value
}

pub(crate) fn marshal_of(ty: &TypeDescriptor) -> String {
    match (&ty.marshal_name, ty.shape) {
        (Some(name), _) => name.clone(),
        (None, ValueShape::Bool) => "bool".to_string(),
        (None, _) => ty.target_name.clone(),
    }
}

fn marshal_cast(ty: &TypeDescriptor) -> CastTarget {
    CastTarget::Marshal {
        name: marshal_of(ty),
        depth: ty.pointer_depth,
        is_enum: ty.is_enum_literal && ty.pointer_depth == 0,
    }
}
