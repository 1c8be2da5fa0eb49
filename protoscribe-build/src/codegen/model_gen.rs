//! Model emitter: one immutable value type per message.
//!
//! The emitted file holds the struct, its constructor (which normalizes the
//! wrapper-optional oneof edge case), the codec references, the stable
//! `hash_code`, convenience accessors, a builder, the oneof sum types, and any
//! nested enums.

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::lookup::ArtifactKind;
use crate::model::{Enum, Field, FieldType, Message, OneOfField, SchemaFile, SingleField};
use crate::Error;

use super::names::{to_pascal_case, to_rust_field_name, to_variant_name};
use super::{
    deprecated_attr, doc_attrs, ident, render_imports, resolved_kind, EmitCtx, ResolvedKind,
};

pub(crate) fn generate(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
) -> Result<TokenStream, Error> {
    let mut imports = BTreeSet::new();
    let struct_name = ident(&message.name);
    let builder_name = format_ident!("{}Builder", message.name);
    let struct_doc = doc_attrs(&message.doc);
    let deprecated = deprecated_attr(message.deprecated);
    let allow = allow_deprecated(message);

    // Codec references live in their own namespaces.
    let parser_type = type_ref(ctx, ArtifactKind::Parser, message, file, &mut imports);
    let writer_type = type_ref(ctx, ArtifactKind::Writer, message, file, &mut imports);
    imports.insert("std::sync::OnceLock".to_string());

    let mut field_decls = TokenStream::new();
    let mut ctor_params = TokenStream::new();
    let mut ctor_names = Vec::new();
    let mut normalizations = TokenStream::new();
    let mut hash_statements = TokenStream::new();
    let mut eq_terms = Vec::new();
    let mut accessors = TokenStream::new();
    let mut builder_methods = TokenStream::new();
    let mut oneof_defs = TokenStream::new();

    for field in &message.fields {
        match field {
            Field::Single(single) => {
                let name = ident(&to_rust_field_name(&single.name));
                let ty = field_decl_type(ctx, message, file, single, &mut imports);
                let doc = doc_attrs(&single.doc);
                let dep = deprecated_attr(single.deprecated);
                field_decls.extend(quote! { #doc #dep pub #name: #ty, });
                ctor_params.extend(quote! { #name: #ty, });
                ctor_names.push(name.clone());
                hash_statements.extend(single_field_hash(ctx, message, single));
                eq_terms.push(single_field_eq(ctx, single));
                accessors.extend(message_field_accessors(ctx, message, file, single, &mut imports));
                builder_methods.extend(single_builder_method(ctx, message, file, single, &mut imports));
            }
            Field::OneOf(oneof) => {
                let name = ident(&to_rust_field_name(&oneof.name));
                let value_name = format_ident!("{}OneOf", to_pascal_case(&oneof.name));
                let doc = doc_attrs(&oneof.doc);
                field_decls.extend(quote! { #doc pub #name: #value_name, });
                ctor_params.extend(quote! { #name: #value_name, });
                ctor_names.push(name.clone());
                normalizations.extend(oneof_normalization(oneof, &name, &value_name));
                hash_statements.extend(quote! {
                    result = result.wrapping_mul(31).wrapping_add(self.#name.hash_code());
                });
                eq_terms.push(quote! { self.#name == other.#name });
                accessors.extend(oneof_branch_accessors(ctx, message, file, oneof, &mut imports));
                builder_methods.extend(oneof_builder_methods(ctx, message, file, oneof, &mut imports));
                oneof_defs.extend(generate_oneof_types(ctx, message, file, oneof, &mut imports));
            }
        }
    }

    let eq_body = if eq_terms.is_empty() {
        quote!(true)
    } else {
        quote!(#(#eq_terms)&&*)
    };

    let builder_fields = builder_field_decls(ctx, message, file, &mut imports);
    let copy_builder_fields = ctor_names.iter().map(|name| {
        quote! { #name: self.#name.clone(), }
    });

    let nested_enums: TokenStream = message
        .enums
        .iter()
        .map(generate_enum)
        .collect();

    let use_block = render_imports(&imports);

    Ok(quote! {
        #use_block

        #struct_doc
        #deprecated
        #[derive(Debug, Clone)]
        pub struct #struct_name {
            #field_decls
        }

        #allow
        impl #struct_name {
            /// Protobuf codec pair (parser, writer) for this message.
            pub const PROTOBUF: (#parser_type, #writer_type) = (#parser_type, #writer_type);

            /// Creates a new value, normalizing oneof branches protobuf
            /// cannot represent.
            pub fn new(#ctor_params) -> Self {
                #normalizations
                Self { #(#ctor_names),* }
            }

            /// Default instance with all fields set to default values.
            ///
            /// Lazily built; repeated calls return the same reference.
            pub fn default_instance() -> &'static Self {
                static DEFAULT: OnceLock<#struct_name> = OnceLock::new();
                DEFAULT.get_or_init(|| #struct_name::builder().build())
            }

            /// Content hash, stable across processes.
            ///
            /// Equal values always hash identically.
            pub fn hash_code(&self) -> i32 {
                let mut result: i32 = 1;
                #hash_statements
                let mut hash = i64::from(result);
                // Shifts: 30, 27, 16, 20, 5, 18, 10, 24, 30
                hash = hash.wrapping_add(hash << 30);
                hash ^= ((hash as u64) >> 27) as i64;
                hash = hash.wrapping_add(hash << 16);
                hash ^= ((hash as u64) >> 20) as i64;
                hash = hash.wrapping_add(hash << 5);
                hash ^= ((hash as u64) >> 18) as i64;
                hash = hash.wrapping_add(hash << 10);
                hash ^= ((hash as u64) >> 24) as i64;
                hash = hash.wrapping_add(hash << 30);
                hash as i32
            }

            #accessors

            /// Returns a new builder with every field at its default.
            pub fn builder() -> #builder_name {
                #builder_name::new()
            }

            /// Returns a builder pre-populated with this value's fields.
            pub fn copy_builder(&self) -> #builder_name {
                #builder_name {
                    #(#copy_builder_fields)*
                }
            }
        }

        #allow
        impl PartialEq for #struct_name {
            fn eq(&self, other: &Self) -> bool {
                #eq_body
            }
        }

        /// Builder for incremental construction of the message.
        #allow
        #[derive(Debug, Clone, Default)]
        pub struct #builder_name {
            #builder_fields
        }

        #allow
        impl #builder_name {
            /// Creates an empty builder.
            pub fn new() -> Self {
                Self::default()
            }

            #builder_methods

            /// Builds the final value.
            pub fn build(self) -> #struct_name {
                #struct_name::new(#(self.#ctor_names),*)
            }
        }

        #oneof_defs
        #nested_enums
    })
}

/// A top-level enum gets a model file of its own.
pub(crate) fn generate_standalone_enum(enumeration: &Enum) -> TokenStream {
    generate_enum(enumeration)
}

fn allow_deprecated(message: &Message) -> TokenStream {
    super::allow_deprecated(message)
}

/// Resolves the artifact type of `message` itself, importing it unless it is
/// declared in the file being emitted.
fn type_ref(
    ctx: &EmitCtx,
    kind: ArtifactKind,
    message: &Message,
    file: &SchemaFile,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let info = ctx
        .lookup
        .resolve(&message.name)
        .expect("every emitted message is registered");
    super::type_ref_tokens(ctx, kind, info, file, ArtifactKind::Model, &message.name, imports)
}

/// Base (unwrapped) Rust type of a single field, as seen from the model file.
fn base_type(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    super::base_type(ctx, message, file, field, ArtifactKind::Model, imports)
}

/// Full declared type: base plus `Box` / `Option` / `Vec` wrapping.
fn field_decl_type(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    super::field_decl_type(ctx, message, file, field, ArtifactKind::Model, imports)
}

/// `result = result * 31 + hash(field)` in wrapping arithmetic, honoring the
/// null-is-zero and fold-repeated rules.
fn single_field_hash(ctx: &EmitCtx, message: &Message, field: &SingleField) -> TokenStream {
    let name = ident(&to_rust_field_name(&field.name));
    let kind = resolved_kind(ctx, field);
    let is_message = kind == ResolvedKind::Message;

    if field.repeated {
        let value_hash = hash_value_expr(ctx, field, quote!(value), true);
        return quote! {
            for value in &self.#name {
                result = result.wrapping_mul(31).wrapping_add(#value_hash);
            }
        };
    }
    if field.optional || is_message {
        let value_hash = hash_value_expr(ctx, field, quote!(value), true);
        return quote! {
            result = result.wrapping_mul(31).wrapping_add(match &self.#name {
                Some(value) => #value_hash,
                None => 0,
            });
        };
    }
    let value_hash = hash_value_expr(ctx, field, quote!(self.#name), false);
    quote! {
        result = result.wrapping_mul(31).wrapping_add(#value_hash);
    }
}

/// An `i32`-valued hash expression for one value of the field's base type.
///
/// `by_ref` is true when `value` is a reference (match bindings, loop
/// variables); copy scalars then need a deref.
fn hash_value_expr(
    ctx: &EmitCtx,
    field: &SingleField,
    value: TokenStream,
    by_ref: bool,
) -> TokenStream {
    let kind = resolved_kind(ctx, field);
    let deref = |tokens: TokenStream| {
        if by_ref {
            quote!((*#tokens))
        } else {
            quote!(#tokens)
        }
    };
    match kind {
        ResolvedKind::Message => quote!(#value.hash_code()),
        ResolvedKind::Enum => quote!(#value.number()),
        ResolvedKind::Scalar => match field.field_type {
            FieldType::Int32 | FieldType::Sint32 | FieldType::Sfixed32 => deref(value),
            FieldType::Uint32 | FieldType::Fixed32 => {
                let v = deref(value);
                quote!((#v as i32))
            }
            FieldType::Int64 | FieldType::Sint64 | FieldType::Sfixed64 => {
                let v = deref(value);
                quote!(((#v ^ (((#v as u64) >> 32) as i64)) as i32))
            }
            FieldType::Uint64 | FieldType::Fixed64 => {
                let v = deref(value);
                quote!(((#v ^ (#v >> 32)) as i32))
            }
            FieldType::Float => {
                let v = deref(value);
                quote!((#v.to_bits() as i32))
            }
            FieldType::Double => {
                let v = deref(value);
                quote!(((#v.to_bits() ^ (#v.to_bits() >> 32)) as i32))
            }
            FieldType::Bool => {
                let v = deref(value);
                quote!((if #v { 1231 } else { 1237 }))
            }
            FieldType::String => quote! {
                #value.bytes().fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(b)))
            },
            FieldType::Bytes => quote! {
                #value
                    .as_slice()
                    .iter()
                    .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(*b)))
            },
            FieldType::Enum | FieldType::Message => unreachable!("resolved above"),
        },
    }
}

/// Equality term for one field; floats compare bitwise so NaN-carrying values
/// still satisfy `parse(write(m)) == m`.
fn single_field_eq(ctx: &EmitCtx, field: &SingleField) -> TokenStream {
    let name = ident(&to_rust_field_name(&field.name));
    let is_float = matches!(field.field_type, FieldType::Float | FieldType::Double)
        && resolved_kind(ctx, field) == ResolvedKind::Scalar;
    if !is_float {
        return quote!(self.#name == other.#name);
    }
    if field.repeated {
        quote! {
            (self.#name.len() == other.#name.len()
                && self.#name
                    .iter()
                    .zip(&other.#name)
                    .all(|(a, b)| a.to_bits() == b.to_bits()))
        }
    } else if field.optional {
        quote! {
            (match (&self.#name, &other.#name) {
                (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
                (None, None) => true,
                _ => false,
            })
        }
    } else {
        quote!(self.#name.to_bits() == other.#name.to_bits())
    }
}

/// `has_x` / `x_or` / `x_or_throw` / `if_x` for message-typed fields.
fn message_field_accessors(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    if field.repeated || resolved_kind(ctx, field) != ResolvedKind::Message {
        return TokenStream::new();
    }
    let name = ident(&to_rust_field_name(&field.name));
    let has_name = format_ident!("has_{}", to_rust_field_name(&field.name));
    let or_name = format_ident!("{}_or", to_rust_field_name(&field.name));
    let or_throw_name = format_ident!("{}_or_throw", to_rust_field_name(&field.name));
    let if_name = format_ident!("if_{}", to_rust_field_name(&field.name));
    let base = base_type(ctx, message, file, field, imports);
    let missing = format!("field {} is not set", field.name);

    let unwrap = if ctx.is_boxed(&message.name, field) {
        quote!(self.#name.as_deref())
    } else {
        quote!(self.#name.as_ref())
    };

    quote! {
        /// Whether this field holds a value.
        pub fn #has_name(&self) -> bool {
            self.#name.is_some()
        }

        /// The value of this field, or the supplied default when unset.
        pub fn #or_name<'a>(&'a self, default: &'a #base) -> &'a #base {
            #unwrap.unwrap_or(default)
        }

        /// The value of this field; panics when unset.
        pub fn #or_throw_name(&self) -> &#base {
            #unwrap.expect(#missing)
        }

        /// Runs `f` with the value of this field, if one is set.
        pub fn #if_name(&self, f: impl FnOnce(&#base)) {
            if let Some(value) = #unwrap {
                f(value);
            }
        }
    }
}

/// Direct typed getters plus `has` / `or` / `or_throw` per oneof branch.
fn oneof_branch_accessors(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    oneof: &OneOfField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let field_name = ident(&to_rust_field_name(&oneof.name));
    let value_name = format_ident!("{}OneOf", to_pascal_case(&oneof.name));
    let mut out = TokenStream::new();

    for branch in &oneof.fields {
        let branch_getter = ident(&to_rust_field_name(&branch.name));
        let has_name = format_ident!("has_{}", to_rust_field_name(&branch.name));
        let or_name = format_ident!("{}_or", to_rust_field_name(&branch.name));
        let or_throw_name = format_ident!("{}_or_throw", to_rust_field_name(&branch.name));
        let variant = ident(&to_pascal_case(&branch.name));
        let base = base_type(ctx, message, file, branch, imports);
        let missing = format!("oneof branch {} is not set", branch.name);

        let boxed = resolved_kind(ctx, branch) == ResolvedKind::Message
            && ctx.is_boxed(&message.name, branch);
        let extract = match (branch.optional, boxed) {
            (true, true) => quote!(value.as_deref()),
            (true, false) => quote!(value.as_ref()),
            (false, true) => quote!(Some(value.as_ref())),
            (false, false) => quote!(Some(value)),
        };

        out.extend(quote! {
            /// The value of this branch, when it is the live one.
            pub fn #branch_getter(&self) -> Option<&#base> {
                match &self.#field_name {
                    #value_name::#variant(value) => #extract,
                    _ => None,
                }
            }

            /// Whether this branch is the live one.
            pub fn #has_name(&self) -> bool {
                matches!(&self.#field_name, #value_name::#variant(_))
            }

            /// The value of this branch, or the supplied default.
            pub fn #or_name<'a>(&'a self, default: &'a #base) -> &'a #base {
                self.#branch_getter().unwrap_or(default)
            }

            /// The value of this branch; panics when it is not the live one.
            pub fn #or_throw_name(&self) -> &#base {
                self.#branch_getter().expect(#missing)
            }
        });
    }
    out
}

/// Constructor statements mapping a set wrapper branch holding no value to
/// the unset state; protobuf cannot tell the two apart on the wire.
fn oneof_normalization(
    oneof: &OneOfField,
    field_name: &proc_macro2::Ident,
    value_name: &proc_macro2::Ident,
) -> TokenStream {
    let optional_branches: Vec<_> = oneof.fields.iter().filter(|f| f.optional).collect();
    if optional_branches.is_empty() {
        return TokenStream::new();
    }
    let arms = optional_branches.iter().map(|branch| {
        let variant = ident(&to_pascal_case(&branch.name));
        quote! { #value_name::#variant(None) => #value_name::Unset, }
    });
    quote! {
        let #field_name = match #field_name {
            #(#arms)*
            other => other,
        };
    }
}

fn builder_field_decls(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let mut out = TokenStream::new();
    for field in &message.fields {
        match field {
            Field::Single(single) => {
                let name = ident(&to_rust_field_name(&single.name));
                let ty = field_decl_type(ctx, message, file, single, imports);
                out.extend(quote! { #name: #ty, });
            }
            Field::OneOf(oneof) => {
                let name = ident(&to_rust_field_name(&oneof.name));
                let value_name = format_ident!("{}OneOf", to_pascal_case(&oneof.name));
                out.extend(quote! { #name: #value_name, });
            }
        }
    }
    out
}

/// Builder setters for one plain field.
fn single_builder_method(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let name = ident(&to_rust_field_name(&field.name));
    let doc = doc_attrs(&field.doc);
    let base = base_type(ctx, message, file, field, imports);
    let kind = resolved_kind(ctx, field);
    let boxed = kind == ResolvedKind::Message && ctx.is_boxed(&message.name, field);

    if field.repeated {
        let boxed_base = if boxed { quote!(Box<#base>) } else { base };
        return quote! {
            #doc
            pub fn #name(mut self, values: impl Into<Vec<#boxed_base>>) -> Self {
                self.#name = values.into();
                self
            }
        };
    }

    let stored = match (boxed, field.optional || kind == ResolvedKind::Message) {
        (true, _) => quote!(Some(Box::new(value))),
        (false, true) => quote!(Some(value)),
        (false, false) => quote!(value),
    };

    let mut out = quote! {
        #doc
        pub fn #name(mut self, value: #base) -> Self {
            self.#name = #stored;
            self
        }
    };

    if field.optional || kind == ResolvedKind::Message {
        let clear_name = format_ident!("clear_{}", to_rust_field_name(&field.name));
        out.extend(quote! {
            /// Resets this field to unset.
            pub fn #clear_name(mut self) -> Self {
                self.#name = None;
                self
            }
        });
    }

    // Message fields also accept a pre-populated builder.
    if kind == ResolvedKind::Message && !field.optional {
        let builder_param = builder_type_of(ctx, message, file, field, imports);
        let builder_method = format_ident!("{}_builder", to_rust_field_name(&field.name));
        let built = if boxed {
            quote!(Some(Box::new(builder.build())))
        } else {
            quote!(Some(builder.build()))
        };
        out.extend(quote! {
            #doc
            pub fn #builder_method(mut self, builder: #builder_param) -> Self {
                self.#name = #built;
                self
            }
        });
    }

    out
}

/// The `<Name>Builder` type of a message-typed field.
fn builder_type_of(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    field: &SingleField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let reference = field.message_type.as_deref().expect("message field");
    let info = ctx
        .lookup
        .resolve(reference)
        .expect("references verified before emission");
    let builder_name = format!("{}Builder", info.rust_name);
    let own_module = ctx.lookup.file_module(ArtifactKind::Model, &message.name);
    let same_file = info.bucket == super::names::to_module_name(&file.bucket)
        && ctx.lookup.file_module(ArtifactKind::Model, &info.rust_name) == own_module;
    if !same_file {
        let mut path = ctx.lookup.qualified_type(ArtifactKind::Model, info);
        // Swap the type segment for its builder.
        if let Some(split) = path.rfind("::") {
            path.truncate(split + 2);
            path.push_str(&builder_name);
        }
        imports.insert(path);
    }
    let builder_ident = ident(&builder_name);
    quote!(#builder_ident)
}

/// One setter per oneof branch, plus a clear method for the whole oneof.
fn oneof_builder_methods(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    oneof: &OneOfField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let field_name = ident(&to_rust_field_name(&oneof.name));
    let value_name = format_ident!("{}OneOf", to_pascal_case(&oneof.name));
    let mut out = TokenStream::new();

    for branch in &oneof.fields {
        let setter = ident(&to_rust_field_name(&branch.name));
        let doc = doc_attrs(&branch.doc);
        let base = base_type(ctx, message, file, branch, imports);
        let variant = ident(&to_pascal_case(&branch.name));
        let boxed = resolved_kind(ctx, branch) == ResolvedKind::Message
            && ctx.is_boxed(&message.name, branch);
        let stored = match (branch.optional, boxed) {
            (true, true) => quote!(#value_name::#variant(Some(Box::new(value)))),
            (true, false) => quote!(#value_name::#variant(Some(value))),
            (false, true) => quote!(#value_name::#variant(Box::new(value))),
            (false, false) => quote!(#value_name::#variant(value)),
        };
        out.extend(quote! {
            #doc
            pub fn #setter(mut self, value: #base) -> Self {
                self.#field_name = #stored;
                self
            }
        });
    }

    let clear_name = format_ident!("clear_{}", to_rust_field_name(&oneof.name));
    out.extend(quote! {
        /// Resets the oneof to unset.
        pub fn #clear_name(mut self) -> Self {
            self.#field_name = #value_name::Unset;
            self
        }
    });
    out
}

/// The discriminant enum and the payload-carrying sum type for one oneof.
fn generate_oneof_types(
    ctx: &EmitCtx,
    message: &Message,
    file: &SchemaFile,
    oneof: &OneOfField,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let kind_name = format_ident!("{}OneOfType", to_pascal_case(&oneof.name));
    let value_name = format_ident!("{}OneOf", to_pascal_case(&oneof.name));
    let kind_doc = format!(" Discriminant for the `{}` oneof.", oneof.name);
    let value_doc = format!(" Value of the `{}` oneof.", oneof.name);

    let mut kind_variants = TokenStream::new();
    let mut value_variants = TokenStream::new();
    let mut kind_arms = TokenStream::new();
    let mut hash_arms = TokenStream::new();
    let mut eq_arms = TokenStream::new();

    for branch in &oneof.fields {
        let variant = ident(&to_pascal_case(&branch.name));
        let number = proc_macro2::Literal::i32_unsuffixed(branch.number as i32);
        let base = base_type(ctx, message, file, branch, imports);
        let boxed = resolved_kind(ctx, branch) == ResolvedKind::Message
            && ctx.is_boxed(&message.name, branch);
        let payload = match (branch.optional, boxed) {
            (true, true) => quote!(Option<Box<#base>>),
            (true, false) => quote!(Option<#base>),
            (false, true) => quote!(Box<#base>),
            (false, false) => quote!(#base),
        };
        let doc = doc_attrs(&branch.doc);
        let dep = deprecated_attr(branch.deprecated);

        kind_variants.extend(quote! { #doc #dep #variant = #number, });
        value_variants.extend(quote! { #doc #dep #variant(#payload), });
        kind_arms.extend(quote! { Self::#variant(_) => #kind_name::#variant, });

        let value_hash = branch_hash_expr(ctx, branch);
        hash_arms.extend(quote! {
            Self::#variant(value) => {
                let mut h = 1i32;
                h = h.wrapping_mul(31).wrapping_add(#kind_name::#variant as i32);
                h.wrapping_mul(31).wrapping_add(#value_hash)
            }
        });

        let eq_term = branch_eq_expr(ctx, branch);
        eq_arms.extend(quote! { (Self::#variant(a), Self::#variant(b)) => #eq_term, });
    }

    quote! {
        #[doc = #kind_doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum #kind_name {
            /// No branch set.
            Unset = 0,
            #kind_variants
        }

        #[doc = #value_doc]
        #[derive(Debug, Clone, Default)]
        pub enum #value_name {
            /// No branch set.
            #[default]
            Unset,
            #value_variants
        }

        impl #value_name {
            /// The discriminant identifying the live branch.
            pub fn kind(&self) -> #kind_name {
                match self {
                    Self::Unset => #kind_name::Unset,
                    #kind_arms
                }
            }

            /// Stable content hash of the live branch.
            pub fn hash_code(&self) -> i32 {
                match self {
                    Self::Unset => 0,
                    #hash_arms
                }
            }
        }

        impl PartialEq for #value_name {
            fn eq(&self, other: &Self) -> bool {
                match (self, other) {
                    (Self::Unset, Self::Unset) => true,
                    #eq_arms
                    _ => false,
                }
            }
        }
    }
}

/// Hash expression for a oneof branch payload bound as `value` by reference.
fn branch_hash_expr(ctx: &EmitCtx, branch: &SingleField) -> TokenStream {
    if branch.optional {
        let inner = hash_value_expr(ctx, branch, quote!(inner), true);
        quote! {
            (match value {
                Some(inner) => #inner,
                None => 0,
            })
        }
    } else {
        hash_value_expr(ctx, branch, quote!(value), true)
    }
}

/// Equality expression for a oneof branch with payloads bound as `a` and `b`.
fn branch_eq_expr(ctx: &EmitCtx, branch: &SingleField) -> TokenStream {
    let is_float = matches!(branch.field_type, FieldType::Float | FieldType::Double)
        && resolved_kind(ctx, branch) == ResolvedKind::Scalar;
    if !is_float {
        return quote!(a == b);
    }
    if branch.optional {
        quote! {
            (match (a, b) {
                (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
                (None, None) => true,
                _ => false,
            })
        }
    } else {
        quote!(a.to_bits() == b.to_bits())
    }
}

/// A protobuf enum as a Rust enum with stable numbers.
fn generate_enum(enumeration: &Enum) -> TokenStream {
    let name = ident(&enumeration.name);
    let doc = doc_attrs(&enumeration.doc);

    let mut variants = TokenStream::new();
    let mut from_arms = TokenStream::new();
    for value in &enumeration.values {
        let variant = ident(&to_variant_name(&value.name));
        let number = proc_macro2::Literal::i32_unsuffixed(value.number);
        let value_doc = doc_attrs(&value.doc);
        let dep = deprecated_attr(value.deprecated);
        let default_attr = if value.number == 0 {
            quote!(#[default])
        } else {
            TokenStream::new()
        };
        variants.extend(quote! { #value_doc #dep #default_attr #variant = #number, });
        from_arms.extend(quote! { #number => Some(#name::#variant), });
    }

    let allow = if enumeration.values.iter().any(|v| v.deprecated) {
        quote!(#[allow(deprecated)])
    } else {
        TokenStream::new()
    };

    quote! {
        #doc
        #allow
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum #name {
            #variants
        }

        #allow
        impl #name {
            /// The protobuf number of this value.
            pub fn number(self) -> i32 {
                self as i32
            }

            /// Maps a decoded number back to a value, or `None` when the
            /// number is unknown to this schema.
            pub fn from_number(number: i32) -> Option<Self> {
                match number {
                    #from_arms
                    _ => None,
                }
            }
        }
    }
}
