//! Parser emitter: decodes wire bytes back into the model type.
//!
//! The emitted parser is a tag loop dispatching on field number. Unknown
//! fields are skipped by wire type, packed repeated scalars are accepted
//! alongside the unpacked form, and nested messages are decoded by fencing
//! the cursor limit at the length prefix and handing the same cursor to the
//! sub-parser.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::lookup::ArtifactKind;
use crate::model::{Field, FieldType, Message, SchemaFile, SingleField};
use crate::Error;

use super::names::{to_pascal_case, to_rust_field_name};
use super::{
    field_decl_type, ident, model_item_ref, render_imports, resolved_kind, type_ref_tokens,
    EmitCtx, ResolvedKind,
};

pub(crate) fn generate(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
) -> Result<TokenStream, Error> {
    let mut imports = BTreeSet::new();
    for import in [
        "protoscribe::error::WireError",
        "protoscribe::sequential::ReadableSequentialData",
        "protoscribe::wire::read_tag",
        "protoscribe::wire::skip_field",
    ] {
        imports.insert(import.to_string());
    }

    let parser_name = format_ident!("{}Parser", message.name);
    let model_type = model_item_ref(
        ctx,
        message,
        file,
        &message.name,
        ArtifactKind::Parser,
        &mut imports,
    );
    let parser_doc = format!(" Decodes [`{}`] from the protobuf wire format.", message.name);

    let mut locals = TokenStream::new();
    let mut ctor_args = Vec::new();
    // (field number, match arm), sorted by number below.
    let mut arms: Vec<(u32, TokenStream)> = Vec::new();

    for field in &message.fields {
        match field {
            Field::Single(single) => {
                let name = ident(&to_rust_field_name(&single.name));
                let ty = field_decl_type(
                    ctx,
                    message,
                    file,
                    single,
                    ArtifactKind::Parser,
                    &mut imports,
                );
                locals.extend(quote! { let mut #name: #ty = Default::default(); });
                ctor_args.push(name.clone());
                arms.push((single.number, single_field_arm(ctx, message, file, single, &name, &mut imports)));
            }
            Field::OneOf(oneof) => {
                let name = ident(&to_rust_field_name(&oneof.name));
                let value_type = model_item_ref(
                    ctx,
                    message,
                    file,
                    &format!("{}OneOf", to_pascal_case(&oneof.name)),
                    ArtifactKind::Parser,
                    &mut imports,
                );
                locals.extend(quote! { let mut #name: #value_type = Default::default(); });
                ctor_args.push(name.clone());
                for branch in &oneof.fields {
                    let variant = ident(&to_pascal_case(&branch.name));
                    let decoded = decode_expr(ctx, message, file, branch, &mut imports);
                    let boxed = resolved_kind(ctx, branch) == ResolvedKind::Message
                        && ctx.is_boxed(&message.name, branch);
                    let payload = match (branch.optional, boxed) {
                        (true, true) => quote!(Some(Box::new(#decoded))),
                        (true, false) => quote!(Some(#decoded)),
                        (false, true) => quote!(Box::new(#decoded)),
                        (false, false) => quote!(#decoded),
                    };
                    let number = proc_macro2::Literal::u32_unsuffixed(branch.number);
                    arms.push((
                        branch.number,
                        quote! { #number => { #name = #value_type::#variant(#payload); } },
                    ));
                }
            }
        }
    }

    arms.sort_by_key(|(number, _)| *number);
    let arm_tokens: Vec<_> = arms.into_iter().map(|(_, tokens)| tokens).collect();

    let use_block = render_imports(&imports);
    let allow = super::allow_deprecated(message);

    Ok(quote! {
        #use_block

        #[doc = #parser_doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #parser_name;

        #allow
        impl #parser_name {
            /// Reads one message from the readable range of `data`.
            ///
            /// Unknown fields are skipped per their wire type. The builder is
            /// finalized when the cursor reaches its limit.
            pub fn parse<R: ReadableSequentialData>(
                &self,
                data: &mut R,
            ) -> Result<#model_type, WireError> {
                #locals
                while data.has_remaining() {
                    let (tag, wire_type) = read_tag(data)?;
                    match tag {
                        #(#arm_tokens)*
                        _ => skip_field(data, wire_type)?,
                    }
                }
                Ok(#model_type::new(#(#ctor_args),*))
            }
        }
    })
}

/// Match arm for one plain field.
fn single_field_arm(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    name: &proc_macro2::Ident,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let number = proc_macro2::Literal::u32_unsuffixed(field.number);
    let decoded = decode_expr(ctx, message, file, field, imports);
    let kind = resolved_kind(ctx, field);

    if field.repeated {
        let packable = match kind {
            ResolvedKind::Message => false,
            ResolvedKind::Enum => true,
            ResolvedKind::Scalar => {
                !matches!(field.field_type, FieldType::String | FieldType::Bytes)
            }
        };
        if packable {
            imports.insert("protoscribe::wire::WireType".to_string());
            // Accept both packed and unpacked encodings.
            return quote! {
                #number => {
                    if wire_type == WireType::Len {
                        let len = data.read_varint32()? as usize;
                        if len > data.remaining() {
                            return Err(WireError::LengthOverflow { value: len as u64 });
                        }
                        let end = data.position() + len;
                        while data.position() < end {
                            #name.push(#decoded);
                        }
                    } else {
                        #name.push(#decoded);
                    }
                }
            };
        }
        let element = if kind == ResolvedKind::Message && ctx.is_boxed(&message.name, field) {
            quote!(Box::new(#decoded))
        } else {
            quote!(#decoded)
        };
        return quote! { #number => { #name.push(#element); } };
    }

    let stored = if kind == ResolvedKind::Message {
        if ctx.is_boxed(&message.name, field) {
            quote!(Some(Box::new(#decoded)))
        } else {
            quote!(Some(#decoded))
        }
    } else if field.optional {
        quote!(Some(#decoded))
    } else {
        quote!(#decoded)
    };
    quote! { #number => { #name = #stored; } }
}

/// Expression decoding one value of the field's base type from `data`.
fn decode_expr(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match resolved_kind(ctx, field) {
        ResolvedKind::Message => {
            let info = ctx
                .lookup
                .resolve(field.message_type.as_deref().expect("message field"))
                .expect("references verified before emission");
            let sub_parser = type_ref_tokens(
                ctx,
                ArtifactKind::Parser,
                info,
                file,
                ArtifactKind::Parser,
                &message.name,
                imports,
            );
            quote! {
                {
                    let len = data.read_varint32()? as usize;
                    if len > data.remaining() {
                        return Err(WireError::LengthOverflow { value: len as u64 });
                    }
                    let saved_limit = data.limit();
                    data.set_limit(data.position() + len);
                    let value = #sub_parser.parse(data)?;
                    data.set_limit(saved_limit);
                    value
                }
            }
        }
        ResolvedKind::Enum => {
            let enum_type = super::named_model_type(
                ctx,
                message,
                file,
                field.message_type.as_deref().expect("enum field"),
                ArtifactKind::Parser,
                imports,
            );
            // Unknown discriminants fall back to the zero value.
            quote!(#enum_type::from_number(data.read_varint64()? as i32).unwrap_or_default())
        }
        ResolvedKind::Scalar => match field.field_type {
            FieldType::Int32 => quote!(data.read_varint64()? as i32),
            FieldType::Sint32 => quote!(data.read_signed_varint32()?),
            FieldType::Uint32 => quote!(data.read_varint64()? as u32),
            FieldType::Int64 => quote!(data.read_varint64()? as i64),
            FieldType::Sint64 => quote!(data.read_signed_varint64()?),
            FieldType::Uint64 => quote!(data.read_varint64()?),
            FieldType::Fixed32 => quote!(data.read_fixed32()?),
            FieldType::Sfixed32 => quote!(data.read_fixed32()? as i32),
            FieldType::Fixed64 => quote!(data.read_fixed64()?),
            FieldType::Sfixed64 => quote!(data.read_fixed64()? as i64),
            FieldType::Float => quote!(data.read_float()?),
            FieldType::Double => quote!(data.read_double()?),
            FieldType::Bool => quote!(data.read_varint64()? != 0),
            FieldType::String => quote! {
                {
                    let len = data.read_varint32()? as usize;
                    data.read_utf8(len)?
                }
            },
            FieldType::Bytes => quote! {
                {
                    let len = data.read_varint32()? as usize;
                    data.read_byte_sequence(len)?
                }
            },
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}
