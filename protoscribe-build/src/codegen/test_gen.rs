//! Test emitter: a round-trip unit test per message.
//!
//! `create_model_test_arguments` builds a representative value list per field
//! and zips them to the longest list (cartesian-lite, not a full cross
//! product). Message-typed fields reuse the referenced message's test
//! arguments, which is also why the emitted function is public. Oneof
//! branches named in the cycle-break set are left out of the sample data so
//! generation over recursive key schemas terminates.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::lookup::ArtifactKind;
use crate::model::{Enum, Field, FieldType, Message, OneOfField, SchemaFile, SingleField};
use crate::Error;

use super::names::{to_pascal_case, to_snake_case, to_upper_snake, to_variant_name};
use super::{
    allow_deprecated, field_decl_type, ident, model_item_ref, path_ts, render_imports,
    resolved_kind, EmitCtx, ResolvedKind,
};

pub(crate) fn generate(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
) -> Result<TokenStream, Error> {
    let mut imports = BTreeSet::new();
    imports.insert("protoscribe::BufferedData".to_string());

    let model_type = model_item_ref(
        ctx,
        message,
        file,
        &message.name,
        ArtifactKind::Test,
        &mut imports,
    );
    let parser_type = artifact_ref(ctx, message, file, ArtifactKind::Parser, &mut imports);
    let writer_type = artifact_ref(ctx, message, file, ArtifactKind::Writer, &mut imports);

    let mut list_decls = TokenStream::new();
    let mut list_names = Vec::new();
    let mut ctor_args = TokenStream::new();

    for field in &message.fields {
        let (list_name, decl) = match field {
            Field::Single(single) => {
                let list_name = ident(&format!("{}_list", to_snake_case(&single.name)));
                let ty = field_decl_type(
                    ctx,
                    message,
                    file,
                    single,
                    ArtifactKind::Test,
                    &mut imports,
                );
                let expr = single_field_list(ctx, message, file, single, &mut imports);
                (list_name.clone(), quote! { let #list_name: Vec<#ty> = #expr; })
            }
            Field::OneOf(oneof) => {
                let list_name = ident(&format!("{}_list", to_snake_case(&oneof.name)));
                let value_type = model_item_ref(
                    ctx,
                    message,
                    file,
                    &format!("{}OneOf", to_pascal_case(&oneof.name)),
                    ArtifactKind::Test,
                    &mut imports,
                );
                let expr = oneof_list(ctx, message, file, oneof, &value_type, &mut imports);
                (
                    list_name.clone(),
                    quote! { let #list_name: Vec<#value_type> = #expr; },
                )
            }
        };
        list_decls.extend(decl);
        ctor_args.extend(quote! {
            #list_name[i.min(#list_name.len() - 1)].clone(),
        });
        list_names.push(list_name);
    }

    let index = if message.fields.is_empty() {
        quote!(_i)
    } else {
        quote!(i)
    };
    let args_doc = format!(
        " All test permutations of [`{}`]. Reused by the tests of messages\n \
         that embed this one.",
        message.name
    );
    let round_trip_name = format_ident!("test_{}_round_trip", to_snake_case(&message.name));
    let default_name = format_ident!(
        "test_{}_default_encodes_to_zero_bytes",
        to_snake_case(&message.name)
    );

    let use_block = render_imports(&imports);
    let allow = allow_deprecated(message);

    Ok(quote! {
        #use_block

        #[doc = #args_doc]
        #allow
        pub fn create_model_test_arguments() -> Vec<#model_type> {
            #list_decls
            // The longest list decides how many permutations we test; the
            // shorter lists repeat their last value.
            let max_values = [#(#list_names.len()),*].into_iter().max().unwrap_or(1);
            (0..max_values)
                .map(|#index| #model_type::new(#ctor_args))
                .collect()
        }

        /// Writes each permutation, parses it back, and checks value and
        /// hash equality.
        #[test]
        fn #round_trip_name() {
            for model in create_model_test_arguments() {
                let mut buf = BufferedData::allocate(#writer_type.measure(&model));
                #writer_type.write(&model, &mut buf).expect("write");
                buf.flip();
                let decoded = #parser_type.parse(&mut buf).expect("parse");
                assert_eq!(model, decoded);
                assert_eq!(model.hash_code(), decoded.hash_code());
            }
        }

        /// The default instance is all default values, which proto3 elides
        /// entirely; parsing zero bytes yields it back.
        #[test]
        fn #default_name() {
            let default = #model_type::default_instance();
            assert_eq!(#writer_type.measure(default), 0);
            let mut buf = BufferedData::allocate(0);
            #writer_type.write(default, &mut buf).expect("write");
            buf.flip();
            let decoded = #parser_type.parse(&mut buf).expect("parse");
            assert_eq!(default, &decoded);
        }
    })
}

fn artifact_ref(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    kind: ArtifactKind,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let info = ctx
        .lookup
        .resolve(&message.name)
        .expect("every emitted message is registered");
    super::type_ref_tokens(ctx, kind, info, file, ArtifactKind::Test, &message.name, imports)
}

/// Sample-value list for one plain field, shaped to the field's full type.
fn single_field_list(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let element = element_list(ctx, message, file, field, imports);

    if field.repeated {
        // Representative list shapes over the element list.
        return quote! {
            {
                let base = #element;
                vec![Vec::new(), base[..1].to_vec(), base.clone()]
            }
        };
    }
    if field.optional {
        return quote! {
            {
                let mut list = vec![None];
                list.extend((#element).into_iter().map(Some));
                list
            }
        };
    }
    if resolved_kind(ctx, field) == ResolvedKind::Message {
        return quote! { (#element).into_iter().map(Some).collect() };
    }
    element
}

/// Base-type sample list (boxed when the field is boxed, no other wrapping).
fn element_list(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match resolved_kind(ctx, field) {
        ResolvedKind::Message => {
            let args = referenced_test_arguments(ctx, field);
            if ctx.is_boxed(&message.name, field) {
                quote! { #args.into_iter().map(Box::new).collect::<Vec<_>>() }
            } else {
                quote!(#args)
            }
        }
        ResolvedKind::Enum => {
            let reference = field.message_type.as_deref().expect("enum field");
            let info = ctx
                .lookup
                .resolve(reference)
                .expect("references verified before emission");
            let enum_type = super::named_model_type(
                ctx,
                message,
                file,
                reference,
                ArtifactKind::Test,
                imports,
            );
            let enumeration: &Enum = ctx
                .enums
                .get(&info.rust_name)
                .expect("every registered enum has a definition");
            let variants = enumeration.values.iter().map(|value| {
                let variant = ident(&to_variant_name(&value.name));
                quote!(#enum_type::#variant)
            });
            quote! { vec![#(#variants),*] }
        }
        ResolvedKind::Scalar => scalar_list(field.field_type, imports),
    }
}

/// `create_model_test_arguments()` of the referenced message's test, called
/// by its full path so names never collide.
fn referenced_test_arguments(ctx: &EmitCtx, field: &SingleField) -> TokenStream {
    let info = ctx
        .lookup
        .resolve(field.message_type.as_deref().expect("message field"))
        .expect("references verified before emission");
    let path = format!(
        "super::super::super::{}::{}::{}::create_model_test_arguments",
        ctx.lookup.artifact_module(ArtifactKind::Test),
        info.bucket,
        ctx.lookup.file_module(ArtifactKind::Test, &info.rust_name),
    );
    let path = path_ts(&path);
    quote!(#path())
}

fn scalar_list(field_type: FieldType, imports: &mut BTreeSet<String>) -> TokenStream {
    match field_type {
        FieldType::Int32 | FieldType::Sint32 | FieldType::Sfixed32 => {
            quote! { vec![i32::MIN, -42, -21, 0, 21, 42, i32::MAX] }
        }
        FieldType::Uint32 => quote! { vec![0, 1, 2, u32::MAX] },
        FieldType::Int64 | FieldType::Sint64 | FieldType::Sfixed64 => {
            quote! { vec![i64::MIN, -42, -21, 0, 21, 42, i64::MAX] }
        }
        FieldType::Uint64 => quote! { vec![0, 21, 42, u64::MAX] },
        FieldType::Fixed32 => quote! { vec![0, 3, 5, 42, u32::MAX] },
        FieldType::Fixed64 => quote! { vec![0, 3, 5, 42, u64::MAX] },
        FieldType::Float => quote! {
            vec![
                f32::NEG_INFINITY,
                f32::MIN_POSITIVE,
                -102.7,
                -5.0,
                1.7,
                0.0,
                3.0,
                5.2,
                42.1,
                f32::MAX,
                f32::INFINITY,
                f32::NAN,
            ]
        },
        FieldType::Double => quote! {
            vec![
                f64::NEG_INFINITY,
                f64::MIN_POSITIVE,
                -102.7,
                -5.0,
                1.7,
                0.0,
                3.0,
                5.2,
                42.1,
                f64::MAX,
                f64::INFINITY,
                f64::NAN,
            ]
        },
        FieldType::Bool => quote! { vec![true, false] },
        FieldType::String => quote! { vec!["".to_string(), "Dude".to_string()] },
        FieldType::Bytes => {
            imports.insert("protoscribe::Bytes".to_string());
            quote! {
                vec![
                    Bytes::default(),
                    Bytes::copy_from_slice(&[0b001]),
                    Bytes::copy_from_slice(&[0b001, 0b010, 0b011]),
                ]
            }
        }
        FieldType::Enum | FieldType::Message => unreachable!("resolved before"),
    }
}

/// Unset plus each branch's sample list mapped into the branch constructor.
/// Branches in the cycle-break set are omitted; without that, sample data for
/// recursive key schemas would never finish building.
fn oneof_list(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    oneof: &OneOfField,
    value_type: &TokenStream,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let mut extends = TokenStream::new();
    for branch in &oneof.fields {
        if ctx.config.cycle_break.contains(&to_upper_snake(&branch.name)) {
            continue;
        }
        let variant = ident(&to_pascal_case(&branch.name));
        let element = element_list(ctx, message, file, branch, imports);
        let mapped = if branch.optional {
            // The optional branch list is null-prepended; the `(branch,
            // None)` entry normalizes to unset in the constructor.
            quote! {
                {
                    let mut branch_list = vec![None];
                    branch_list.extend((#element).into_iter().map(Some));
                    branch_list.into_iter().map(#value_type::#variant)
                }
            }
        } else {
            quote! { (#element).into_iter().map(#value_type::#variant) }
        };
        extends.extend(quote! { list.extend(#mapped); });
    }

    quote! {
        {
            let mut list = vec![#value_type::Unset];
            #extends
            list
        }
    }
}
