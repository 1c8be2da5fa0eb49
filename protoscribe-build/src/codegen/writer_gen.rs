//! Writer emitter: serializes the model type in canonical form.
//!
//! Fields are written in ascending field-number order with proto3
//! default-value elision; wrapper-present values and live oneof branches are
//! written even when they hold the type's default. `measure` mirrors `write`
//! exactly so nested length prefixes are computed without a second buffer.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::lookup::ArtifactKind;
use crate::model::{Field, FieldType, Message, OneOfField, SchemaFile, SingleField};
use crate::Error;

use super::names::{to_pascal_case, to_rust_field_name};
use super::{
    allow_deprecated, ident, model_item_ref, render_imports, resolved_kind, type_ref_tokens,
    EmitCtx, ResolvedKind,
};

pub(crate) fn generate(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
) -> Result<TokenStream, Error> {
    let mut imports = BTreeSet::new();
    imports.insert("protoscribe::error::WireError".to_string());
    imports.insert("protoscribe::sequential::WritableSequentialData".to_string());

    let writer_name = format_ident!("{}Writer", message.name);
    let model_type = model_item_ref(
        ctx,
        message,
        file,
        &message.name,
        ArtifactKind::Writer,
        &mut imports,
    );
    let writer_doc = format!(" Encodes [`{}`] to the protobuf wire format.", message.name);

    // Fields ordered by their lowest wire number; a present oneof writes the
    // single live branch at that branch's own number.
    let mut ordered: Vec<&Field> = message.fields.iter().collect();
    ordered.sort_by_key(|field| match field {
        Field::Single(f) => f.number,
        Field::OneOf(o) => o.fields.iter().map(|f| f.number).min().unwrap_or(u32::MAX),
    });

    let mut write_stmts = TokenStream::new();
    let mut measure_stmts = TokenStream::new();
    for field in ordered {
        match field {
            Field::Single(single) => {
                write_stmts.extend(single_field_stmts(
                    ctx, message, file, single, Mode::Write, &mut imports,
                ));
                measure_stmts.extend(single_field_stmts(
                    ctx, message, file, single, Mode::Measure, &mut imports,
                ));
            }
            Field::OneOf(oneof) => {
                write_stmts.extend(oneof_stmts(
                    ctx, message, file, oneof, Mode::Write, &mut imports,
                ));
                measure_stmts.extend(oneof_stmts(
                    ctx, message, file, oneof, Mode::Measure, &mut imports,
                ));
            }
        }
    }

    let has_fields = !message.fields.is_empty();
    let (msg_param, out_param) = if has_fields {
        (quote!(msg), quote!(out))
    } else {
        (quote!(_msg), quote!(_out))
    };
    let measure_msg_param = if has_fields { quote!(msg) } else { quote!(_msg) };
    let measure_body = if has_fields {
        quote! {
            let mut len = 0usize;
            #measure_stmts
            len
        }
    } else {
        quote!(0)
    };

    let use_block = render_imports(&imports);
    let allow = allow_deprecated(message);

    Ok(quote! {
        #use_block

        #[doc = #writer_doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #writer_name;

        #allow
        impl #writer_name {
            /// Writes `msg` in canonical form: ascending field numbers,
            /// packed repeated scalars, default values elided.
            pub fn write<W: WritableSequentialData>(
                &self,
                #msg_param: &#model_type,
                #out_param: &mut W,
            ) -> Result<(), WireError> {
                #write_stmts
                Ok(())
            }

            /// Exact number of bytes `write` will produce for `msg`.
            pub fn measure(&self, #measure_msg_param: &#model_type) -> usize {
                #measure_body
            }
        }
    })
}

#[derive(Copy, Clone, PartialEq)]
enum Mode {
    Write,
    Measure,
}

fn single_field_stmts(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    mode: Mode,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let name = ident(&to_rust_field_name(&field.name));
    let number = proc_macro2::Literal::u32_unsuffixed(field.number);
    let kind = resolved_kind(ctx, field);
    let wire_type = wire_type_tokens(ctx, field, imports);
    let tag = tag_stmt(&number, &wire_type, mode, imports);
    let payload = payload_stmt(ctx, message, file, field, mode, imports);

    if field.repeated {
        let packable = match kind {
            ResolvedKind::Message => false,
            ResolvedKind::Enum => true,
            ResolvedKind::Scalar => {
                !matches!(field.field_type, FieldType::String | FieldType::Bytes)
            }
        };
        if packable {
            let len_tag = tag_stmt(&number, &quote!(WireType::Len), mode, imports);
            // Fixed-width elements have a constant length; skip the loop.
            let packed_len_stmt = match const_payload_len(ctx, field) {
                Some(width) => {
                    let width = proc_macro2::Literal::usize_unsuffixed(width);
                    quote! { let packed_len = msg.#name.len() * #width; }
                }
                None => {
                    let payload_len = payload_len_expr(ctx, message, file, field, imports);
                    quote! {
                        let mut packed_len = 0usize;
                        for value in &msg.#name {
                            packed_len += #payload_len;
                        }
                    }
                }
            };
            let emit = match mode {
                Mode::Write => quote! {
                    out.write_varint32(packed_len as u32)?;
                    for value in &msg.#name {
                        #payload
                    }
                },
                Mode::Measure => quote! {
                    len += encoded_len32(packed_len as u32) + packed_len;
                },
            };
            if mode == Mode::Measure {
                imports.insert("protoscribe::varint::encoded_len32".to_string());
            }
            return quote! {
                if !msg.#name.is_empty() {
                    #packed_len_stmt
                    #len_tag
                    #emit
                }
            };
        }
        return quote! {
            for value in &msg.#name {
                #tag
                #payload
            }
        };
    }

    if field.optional || kind == ResolvedKind::Message {
        // Present-or-absent semantics: presence alone decides, defaults are
        // written.
        let binding = if payload_uses_value(ctx, field, mode) {
            quote!(Some(value))
        } else {
            quote!(Some(_))
        };
        return quote! {
            if let #binding = &msg.#name {
                #tag
                #payload
            }
        };
    }

    let guard = nondefault_guard(kind, field.field_type, &name);
    let binding = if payload_uses_value(ctx, field, mode) {
        quote! { let value = &msg.#name; }
    } else {
        TokenStream::new()
    };
    quote! {
        if #guard {
            #binding
            #tag
            #payload
        }
    }
}

/// Byte width of the payload when it is constant, e.g. fixed-width scalars.
fn const_payload_len(ctx: &EmitCtx, field: &SingleField) -> Option<usize> {
    if resolved_kind(ctx, field) != ResolvedKind::Scalar {
        return None;
    }
    match field.field_type {
        FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => Some(4),
        FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => Some(8),
        FieldType::Bool => Some(1),
        _ => None,
    }
}

/// Whether the payload statement for this mode reads the `value` binding.
fn payload_uses_value(ctx: &EmitCtx, field: &SingleField, mode: Mode) -> bool {
    match mode {
        Mode::Write => true,
        Mode::Measure => const_payload_len(ctx, field).is_none(),
    }
}

fn oneof_stmts(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    oneof: &OneOfField,
    mode: Mode,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let name = ident(&to_rust_field_name(&oneof.name));
    let value_type = model_item_ref(
        ctx,
        message,
        file,
        &format!("{}OneOf", to_pascal_case(&oneof.name)),
        ArtifactKind::Writer,
        imports,
    );

    let mut arms = TokenStream::new();
    for branch in &oneof.fields {
        let variant = ident(&to_pascal_case(&branch.name));
        let number = proc_macro2::Literal::u32_unsuffixed(branch.number);
        let wire_type = wire_type_tokens(ctx, branch, imports);
        let tag = tag_stmt(&number, &wire_type, mode, imports);
        let payload = payload_stmt(ctx, message, file, branch, mode, imports);

        // A live branch is written even when it holds the default value.
        let uses_value = payload_uses_value(ctx, branch, mode);
        let (binding, body) = if branch.optional {
            let inner = if uses_value {
                quote!(Some(value))
            } else {
                quote!(Some(_))
            };
            (
                quote!(value),
                quote! {
                    if let #inner = value {
                        #tag
                        #payload
                    }
                },
            )
        } else {
            let binding = if uses_value { quote!(value) } else { quote!(_) };
            (
                binding,
                quote! {
                    #tag
                    #payload
                },
            )
        };
        arms.extend(quote! { #value_type::#variant(#binding) => { #body } });
    }

    quote! {
        match &msg.#name {
            #value_type::Unset => {}
            #arms
        }
    }
}

fn tag_stmt(
    number: &proc_macro2::Literal,
    wire_type: &TokenStream,
    mode: Mode,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match mode {
        Mode::Write => {
            imports.insert("protoscribe::wire::write_tag".to_string());
            quote! { write_tag(out, #number, #wire_type)?; }
        }
        Mode::Measure => {
            imports.insert("protoscribe::wire::tag_len".to_string());
            quote! { len += tag_len(#number); }
        }
    }
}

fn wire_type_tokens(
    ctx: &EmitCtx,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    imports.insert("protoscribe::wire::WireType".to_string());
    match resolved_kind(ctx, field) {
        ResolvedKind::Message => quote!(WireType::Len),
        ResolvedKind::Enum => quote!(WireType::Varint),
        ResolvedKind::Scalar => match field.field_type {
            FieldType::Int32
            | FieldType::Sint32
            | FieldType::Uint32
            | FieldType::Int64
            | FieldType::Sint64
            | FieldType::Uint64
            | FieldType::Bool => quote!(WireType::Varint),
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => quote!(WireType::I32),
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => quote!(WireType::I64),
            FieldType::String | FieldType::Bytes => quote!(WireType::Len),
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}

/// Statement writing (or measuring) one payload bound as `value: &T`.
fn payload_stmt(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    mode: Mode,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match mode {
        Mode::Write => payload_write_stmt(ctx, message, file, field, imports),
        Mode::Measure => {
            let len = payload_len_expr(ctx, message, file, field, imports);
            quote! { len += #len; }
        }
    }
}

fn payload_write_stmt(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match resolved_kind(ctx, field) {
        ResolvedKind::Message => {
            let sub_writer = sub_writer(ctx, message, file, field, imports);
            quote! {
                out.write_varint32(#sub_writer.measure(value) as u32)?;
                #sub_writer.write(value, out)?;
            }
        }
        ResolvedKind::Enum => quote! {
            out.write_varint64(value.number() as i64 as u64)?;
        },
        ResolvedKind::Scalar => match field.field_type {
            FieldType::Int32 => quote!(out.write_varint64((*value) as i64 as u64)?;),
            FieldType::Sint32 => quote!(out.write_signed_varint32(*value)?;),
            FieldType::Uint32 => quote!(out.write_varint64(u64::from(*value))?;),
            FieldType::Int64 => quote!(out.write_varint64((*value) as u64)?;),
            FieldType::Sint64 => quote!(out.write_signed_varint64(*value)?;),
            FieldType::Uint64 => quote!(out.write_varint64(*value)?;),
            FieldType::Fixed32 => quote!(out.write_fixed32(*value)?;),
            FieldType::Sfixed32 => quote!(out.write_fixed32((*value) as u32)?;),
            FieldType::Fixed64 => quote!(out.write_fixed64(*value)?;),
            FieldType::Sfixed64 => quote!(out.write_fixed64((*value) as u64)?;),
            FieldType::Float => quote!(out.write_float(*value)?;),
            FieldType::Double => quote!(out.write_double(*value)?;),
            FieldType::Bool => quote!(out.write_varint64(u64::from(*value))?;),
            FieldType::String => {
                imports.insert("protoscribe::utf8::encoded_length".to_string());
                quote! {
                    out.write_varint32(encoded_length(value) as u32)?;
                    out.write_utf8(value)?;
                }
            }
            FieldType::Bytes => quote! {
                out.write_varint32(value.len() as u32)?;
                out.write_bytes(value.as_slice())?;
            },
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}

/// Encoded payload length (without the tag) for one value bound as `value`.
fn payload_len_expr(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let varint64 = |imports: &mut BTreeSet<String>| {
        imports.insert("protoscribe::varint::encoded_len64".to_string());
    };
    let varint32 = |imports: &mut BTreeSet<String>| {
        imports.insert("protoscribe::varint::encoded_len32".to_string());
    };
    match resolved_kind(ctx, field) {
        ResolvedKind::Message => {
            varint32(imports);
            let sub_writer = sub_writer(ctx, message, file, field, imports);
            quote! {
                {
                    let n = #sub_writer.measure(value);
                    encoded_len32(n as u32) + n
                }
            }
        }
        ResolvedKind::Enum => {
            varint64(imports);
            quote!(encoded_len64(value.number() as i64 as u64))
        }
        ResolvedKind::Scalar => match field.field_type {
            FieldType::Int32 => {
                varint64(imports);
                quote!(encoded_len64((*value) as i64 as u64))
            }
            FieldType::Sint32 => {
                varint32(imports);
                imports.insert("protoscribe::varint::zigzag_encode32".to_string());
                quote!(encoded_len32(zigzag_encode32(*value)))
            }
            FieldType::Uint32 => {
                varint64(imports);
                quote!(encoded_len64(u64::from(*value)))
            }
            FieldType::Int64 => {
                varint64(imports);
                quote!(encoded_len64((*value) as u64))
            }
            FieldType::Sint64 => {
                varint64(imports);
                imports.insert("protoscribe::varint::zigzag_encode64".to_string());
                quote!(encoded_len64(zigzag_encode64(*value)))
            }
            FieldType::Uint64 => {
                varint64(imports);
                quote!(encoded_len64(*value))
            }
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => quote!(4),
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => quote!(8),
            FieldType::Bool => quote!(1),
            FieldType::String => {
                varint32(imports);
                imports.insert("protoscribe::utf8::encoded_length".to_string());
                quote! {
                    {
                        let n = encoded_length(value);
                        encoded_len32(n as u32) + n
                    }
                }
            }
            FieldType::Bytes => {
                varint32(imports);
                quote! {
                    {
                        let n = value.len();
                        encoded_len32(n as u32) + n
                    }
                }
            }
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}

fn sub_writer(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let info = ctx
        .lookup
        .resolve(field.message_type.as_deref().expect("message field"))
        .expect("references verified before emission");
    type_ref_tokens(
        ctx,
        ArtifactKind::Writer,
        info,
        file,
        ArtifactKind::Writer,
        &message.name,
        imports,
    )
}

/// Default-elision guard for an implicit-presence scalar field.
fn nondefault_guard(
    kind: ResolvedKind,
    field_type: FieldType,
    name: &proc_macro2::Ident,
) -> TokenStream {
    match kind {
        ResolvedKind::Enum => quote!(msg.#name.number() != 0),
        ResolvedKind::Message => unreachable!("message fields are presence-tracked"),
        ResolvedKind::Scalar => match field_type {
            FieldType::Int32
            | FieldType::Sint32
            | FieldType::Sfixed32
            | FieldType::Int64
            | FieldType::Sint64
            | FieldType::Sfixed64 => quote!(msg.#name != 0),
            FieldType::Uint32 | FieldType::Fixed32 | FieldType::Uint64 | FieldType::Fixed64 => {
                quote!(msg.#name != 0)
            }
            FieldType::Float => quote!(msg.#name != 0.0),
            FieldType::Double => quote!(msg.#name != 0.0),
            FieldType::Bool => quote!(msg.#name),
            FieldType::String | FieldType::Bytes => quote!(!msg.#name.is_empty()),
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}
