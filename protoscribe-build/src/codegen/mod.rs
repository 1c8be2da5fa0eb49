//! Artifact emission from the normalized schema model.
//!
//! Four emitters, one per artifact kind, all walking the same model: the
//! model type, its parser, its writer, and its unit test. Output is
//! deterministic by construction: fields are visited in declaration order,
//! write statements in field-number order, and every collected set (imports,
//! module listings) is a `BTreeSet`.

mod model_gen;
pub mod names;
mod parser_gen;
mod recursion;
mod test_gen;
mod writer_gen;

pub use recursion::{find_recursive_fields, RecursiveField};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use quote::quote;

use crate::config::Config;
use crate::lookup::{ArtifactKind, LookupHelper, SymbolKind};
use crate::model::{FieldType, SchemaFile, SingleField};
use crate::Error;

const GENERATED_HEADER: &str = "// @generated by protoscribe-build - do not edit\n\n";

/// Main entry point: compile every `.proto` under `proto_dir`.
pub fn compile(config: &Config, proto_dir: &Path) -> Result<(), Error> {
    let out_dir = config
        .out_dir
        .clone()
        .or_else(|| std::env::var_os("OUT_DIR").map(Into::into))
        .ok_or(Error::MissingOutDir)?;

    let mut proto_paths = Vec::new();
    collect_proto_paths(proto_dir, &mut proto_paths)?;
    proto_paths.sort();

    let mut files = Vec::new();
    for path in &proto_paths {
        let source = std::fs::read_to_string(path)?;
        let ast = crate::parser::parse_proto(&source).map_err(|e| Error::Parse {
            path: path.clone(),
            line: e.line,
            column: e.column,
            message: e.message,
        })?;
        files.push(SchemaFile::build(&ast, path, config)?);
    }

    let lookup = LookupHelper::new(config, &files)?;
    lookup.verify_references(&files)?;
    let recursive = find_recursive_fields(&files, &lookup);
    let enums = collect_enums(&files);

    let ctx = EmitCtx {
        config,
        lookup: &lookup,
        recursive: &recursive,
        enums: &enums,
    };

    // kind module -> bucket -> file modules
    let mut tree: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
    let mut record = |kind: ArtifactKind, bucket: &str, module: String| {
        tree.entry(lookup.artifact_module(kind).to_string())
            .or_default()
            .entry(names::to_module_name(bucket))
            .or_default()
            .insert(module);
    };

    for file in &files {
        for message in file.all_messages() {
            let artifacts = [
                (ArtifactKind::Model, model_gen::generate(&ctx, message, file)?),
                (ArtifactKind::Parser, parser_gen::generate(&ctx, message, file)?),
                (ArtifactKind::Writer, writer_gen::generate(&ctx, message, file)?),
                (ArtifactKind::Test, test_gen::generate(&ctx, message, file)?),
            ];
            for (kind, tokens) in artifacts {
                let module = lookup.file_module(kind, &message.name);
                let path = artifact_path(&out_dir, &lookup, kind, &file.bucket, &module);
                write_artifact(&path, tokens, config)?;
                record(kind, &file.bucket, module);
            }
        }
        for enumeration in &file.enums {
            let tokens = model_gen::generate_standalone_enum(enumeration);
            let module = names::to_module_name(&enumeration.name);
            let path = artifact_path(&out_dir, &lookup, ArtifactKind::Model, &file.bucket, &module);
            write_artifact(&path, tokens, config)?;
            record(ArtifactKind::Model, &file.bucket, module);
        }
    }

    write_module_tree(&out_dir, config, &tree)?;
    Ok(())
}

fn collect_enums(files: &[SchemaFile]) -> BTreeMap<String, crate::model::Enum> {
    let mut enums = BTreeMap::new();
    for file in files {
        for enumeration in &file.enums {
            enums.insert(enumeration.name.clone(), enumeration.clone());
        }
        for message in file.all_messages() {
            for enumeration in &message.enums {
                enums.insert(enumeration.name.clone(), enumeration.clone());
            }
        }
    }
    enums
}

fn collect_proto_paths(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_proto_paths(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "proto") {
            out.push(path);
        }
    }
    Ok(())
}

fn artifact_path(
    out_dir: &Path,
    lookup: &LookupHelper,
    kind: ArtifactKind,
    bucket: &str,
    module: &str,
) -> PathBuf {
    out_dir
        .join(lookup.artifact_module(kind))
        .join(names::to_module_name(bucket))
        .join(format!("{module}.rs"))
}

fn write_artifact(path: &Path, tokens: TokenStream, config: &Config) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = if config.skip_format {
        tokens.to_string()
    } else {
        format_tokens(tokens)?
    };
    std::fs::write(path, format!("{GENERATED_HEADER}{body}"))?;
    Ok(())
}

fn format_tokens(tokens: TokenStream) -> Result<String, Error> {
    let file = syn::parse2(tokens).map_err(|e| Error::EmitFailed(e.to_string()))?;
    Ok(prettyplease::unparse(&file))
}

/// Writes the `mod.rs` chain for the generated tree: one at the root listing
/// the artifact-kind modules, one per kind listing its buckets, and one per
/// bucket listing its files. Everything is sorted.
fn write_module_tree(
    out_dir: &Path,
    config: &Config,
    tree: &BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
) -> Result<(), Error> {
    let mut root = String::from(GENERATED_HEADER);
    for kind_module in tree.keys() {
        if kind_module == &config.test_module {
            root.push_str(&format!("#[cfg(test)]\npub mod {kind_module};\n"));
        } else {
            root.push_str(&format!("pub mod {kind_module};\n"));
        }
    }
    std::fs::write(out_dir.join("mod.rs"), root)?;

    for (kind_module, buckets) in tree {
        let mut listing = String::from(GENERATED_HEADER);
        for bucket in buckets.keys() {
            listing.push_str(&format!("pub mod {bucket};\n"));
        }
        std::fs::write(out_dir.join(kind_module).join("mod.rs"), listing)?;

        for (bucket, modules) in buckets {
            let mut listing = String::from(GENERATED_HEADER);
            for module in modules {
                listing.push_str(&format!("pub mod {module};\n"));
            }
            std::fs::write(out_dir.join(kind_module).join(bucket).join("mod.rs"), listing)?;
        }
    }
    Ok(())
}

/// Shared state for the four emitters.
pub(crate) struct EmitCtx<'a> {
    pub config: &'a Config,
    pub lookup: &'a LookupHelper,
    pub recursive: &'a BTreeSet<RecursiveField>,
    /// Every enum in the compile, by simple name; the test emitter needs the
    /// value lists of referenced enums.
    pub enums: &'a BTreeMap<String, crate::model::Enum>,
}

impl EmitCtx<'_> {
    /// True if this field closed a type cycle and must be boxed.
    ///
    /// Repeated fields already live behind a `Vec` and need no extra
    /// indirection.
    pub fn is_boxed(&self, message_name: &str, field: &SingleField) -> bool {
        !field.repeated
            && self
                .recursive
                .contains(&(message_name.to_string(), field.name.clone()))
    }
}

/// How a named field reference resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ResolvedKind {
    Scalar,
    Enum,
    Message,
}

pub(crate) fn resolved_kind(ctx: &EmitCtx, field: &SingleField) -> ResolvedKind {
    match (&field.message_type, field.field_type) {
        (Some(name), _) => match ctx.lookup.resolve(name).map(|info| info.kind) {
            Some(SymbolKind::Enum) => ResolvedKind::Enum,
            // Verified during reference resolution; emitters never see an
            // unresolvable name.
            _ => ResolvedKind::Message,
        },
        (None, _) => ResolvedKind::Scalar,
    }
}

/// Parses an internally-constructed identifier, raw (`r#type`) forms included.
pub(crate) fn ident(name: &str) -> proc_macro2::Ident {
    syn::parse_str(name).expect("internally constructed identifier")
}

/// Parses an internally-constructed `::`-separated path.
pub(crate) fn path_ts(path: &str) -> TokenStream {
    let parsed: syn::Path = syn::parse_str(path).expect("internally constructed path");
    quote!(#parsed)
}

/// Renders a doc comment carried over from the proto source.
pub(crate) fn doc_attrs(doc: &Option<String>) -> TokenStream {
    match doc {
        None => TokenStream::new(),
        Some(text) => {
            let lines: Vec<String> = text.lines().map(|line| format!(" {line}")).collect();
            quote! { #(#[doc = #lines])* }
        }
    }
}

/// `#[allow(deprecated)]` for artifacts of a message with deprecated fields;
/// generated code touches its own deprecated members.
pub(crate) fn allow_deprecated(message: &crate::model::Message) -> TokenStream {
    let has_deprecated = message.fields.iter().any(|field| match field {
        crate::model::Field::Single(f) => f.deprecated,
        crate::model::Field::OneOf(o) => o.fields.iter().any(|f| f.deprecated),
    });
    if has_deprecated {
        quote!(#[allow(deprecated)])
    } else {
        TokenStream::new()
    }
}

pub(crate) fn deprecated_attr(deprecated: bool) -> TokenStream {
    if deprecated {
        quote!(#[deprecated])
    } else {
        TokenStream::new()
    }
}

/// Base Rust type of a scalar field (no `Option` / `Vec` / `Box` wrapper).
pub(crate) fn scalar_type_tokens(field_type: FieldType) -> TokenStream {
    match field_type {
        FieldType::Int32 | FieldType::Sint32 | FieldType::Sfixed32 => quote!(i32),
        FieldType::Uint32 | FieldType::Fixed32 => quote!(u32),
        FieldType::Int64 | FieldType::Sint64 | FieldType::Sfixed64 => quote!(i64),
        FieldType::Uint64 | FieldType::Fixed64 => quote!(u64),
        FieldType::Float => quote!(f32),
        FieldType::Double => quote!(f64),
        FieldType::Bool => quote!(bool),
        FieldType::String => quote!(String),
        FieldType::Bytes => quote!(Bytes),
        FieldType::Enum | FieldType::Message => unreachable!("named types resolve via lookup"),
    }
}

/// Resolves the Rust type tokens for a referenced symbol's artifact,
/// recording an import unless the symbol is declared in the file currently
/// being emitted (importing a name into the module that defines it would
/// clash).
pub(crate) fn type_ref_tokens(
    ctx: &EmitCtx,
    kind: ArtifactKind,
    info: &crate::lookup::SymbolInfo,
    file: &SchemaFile,
    current_kind: ArtifactKind,
    current_message: &str,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let type_name = match info.kind {
        SymbolKind::Enum => info.rust_name.clone(),
        SymbolKind::Message => ctx.lookup.unqualified_type(kind, &info.rust_name),
    };
    let target_module = match info.kind {
        SymbolKind::Enum => info.module.clone(),
        SymbolKind::Message => ctx.lookup.file_module(kind, &info.rust_name),
    };
    let same_file = kind == current_kind
        && info.bucket == names::to_module_name(&file.bucket)
        && target_module == ctx.lookup.file_module(current_kind, current_message);
    if !same_file {
        imports.insert(ctx.lookup.qualified_type(kind, info));
    }
    let type_ident = ident(&type_name);
    quote!(#type_ident)
}

/// Resolves a named field reference (message or enum) to its model type,
/// importing it into the file being emitted when needed.
pub(crate) fn named_model_type(
    ctx: &EmitCtx,
    current_message: &crate::model::Message,
    file: &SchemaFile,
    reference: &str,
    current_kind: ArtifactKind,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let info = ctx
        .lookup
        .resolve(reference)
        .expect("references verified before emission");
    type_ref_tokens(
        ctx,
        ArtifactKind::Model,
        info,
        file,
        current_kind,
        &current_message.name,
        imports,
    )
}

/// Base (unwrapped) Rust type of a single field, from the point of view of an
/// artifact of `current_kind`.
pub(crate) fn base_type(
    ctx: &EmitCtx,
    message: &crate::model::Message,
    file: &SchemaFile,
    field: &SingleField,
    current_kind: ArtifactKind,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    match resolved_kind(ctx, field) {
        ResolvedKind::Scalar => {
            if field.field_type == FieldType::Bytes {
                imports.insert("protoscribe::Bytes".to_string());
            }
            scalar_type_tokens(field.field_type)
        }
        ResolvedKind::Enum | ResolvedKind::Message => {
            let reference = field.message_type.as_deref().expect("named reference");
            named_model_type(ctx, message, file, reference, current_kind, imports)
        }
    }
}

/// Full declared type of a single field: base plus `Box` / `Option` / `Vec`.
pub(crate) fn field_decl_type(
    ctx: &EmitCtx,
    message: &crate::model::Message,
    file: &SchemaFile,
    field: &SingleField,
    current_kind: ArtifactKind,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let base = base_type(ctx, message, file, field, current_kind, imports);
    let is_message = resolved_kind(ctx, field) == ResolvedKind::Message;
    let base = if is_message && ctx.is_boxed(&message.name, field) {
        quote!(Box<#base>)
    } else {
        base
    };
    if field.repeated {
        quote!(Vec<#base>)
    } else if field.optional || is_message {
        quote!(Option<#base>)
    } else {
        base
    }
}

/// References an item (oneof type, builder, test fn module) declared in a
/// message's model-file namespace, importing it unless the emitting file is
/// that very file.
pub(crate) fn model_item_ref(
    ctx: &EmitCtx,
    message: &crate::model::Message,
    file: &SchemaFile,
    item: &str,
    current_kind: ArtifactKind,
    imports: &mut BTreeSet<String>,
) -> TokenStream {
    let same_file = current_kind == ArtifactKind::Model;
    if !same_file {
        imports.insert(format!(
            "super::super::super::{}::{}::{}::{}",
            ctx.lookup.artifact_module(ArtifactKind::Model),
            names::to_module_name(&file.bucket),
            ctx.lookup.file_module(ArtifactKind::Model, &message.name),
            item
        ));
    }
    let item_ident = ident(item);
    quote!(#item_ident)
}

/// Renders sorted `use` statements from collected import paths.
pub(crate) fn render_imports(imports: &BTreeSet<String>) -> TokenStream {
    let mut tokens = TokenStream::new();
    for import in imports {
        let path = path_ts(import);
        tokens.extend(quote! { use #path; });
    }
    tokens
}
