//! Cross-file symbol resolution and artifact namespace computation.
//!
//! After every schema file is loaded, the [`LookupHelper`] aggregates them
//! into one symbol table. Emitters use it for two things: deciding whether a
//! named field reference is a message or an enum, and computing the module
//! path of any artifact of any message, so cross-namespace references are
//! spelled consistently everywhere. All maps are ordered; emission order is a
//! pure function of the input.

use std::collections::BTreeMap;

use crate::codegen::names::{to_module_name, to_snake_case};
use crate::config::Config;
use crate::model::{Field, Message, SchemaFile};
use crate::Error;

/// The kind of generated artifact a namespace is computed for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Parser,
    Writer,
    Test,
    /// Reserved namespace; no emitter targets it.
    Codec,
    /// Reserved namespace; no emitter targets it.
    JsonCodec,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Message,
    Enum,
}

/// Where a resolved symbol lives.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    /// Directory bucket of the declaring file.
    pub bucket: String,
    /// Module (file) name of the declaring model artifact. For a nested enum
    /// this is the module of the enclosing message.
    pub module: String,
    /// Rust type name.
    pub rust_name: String,
}

#[derive(Debug)]
pub struct LookupHelper {
    model_module: String,
    parser_module: String,
    writer_module: String,
    test_module: String,
    codec_module: String,
    json_codec_module: String,
    symbols: BTreeMap<String, SymbolInfo>,
}

impl LookupHelper {
    /// Builds the merged symbol table from every loaded file.
    pub fn new(config: &Config, files: &[SchemaFile]) -> Result<LookupHelper, Error> {
        let mut helper = LookupHelper {
            model_module: config.model_module.clone(),
            parser_module: config.parser_module.clone(),
            writer_module: config.writer_module.clone(),
            test_module: config.test_module.clone(),
            codec_module: config.codec_module.clone(),
            json_codec_module: config.json_codec_module.clone(),
            symbols: BTreeMap::new(),
        };

        for file in files {
            let bucket = to_module_name(&file.bucket);
            for message in &file.messages {
                helper.register_message(message, &bucket, None)?;
            }
            for enumeration in &file.enums {
                helper.register(
                    &enumeration.name,
                    None,
                    SymbolInfo {
                        kind: SymbolKind::Enum,
                        bucket: bucket.clone(),
                        module: to_module_name(&enumeration.name),
                        rust_name: enumeration.name.clone(),
                    },
                )?;
            }
        }

        Ok(helper)
    }

    fn register_message(
        &mut self,
        message: &Message,
        bucket: &str,
        parent: Option<&str>,
    ) -> Result<(), Error> {
        let qualified = match parent {
            Some(parent) => format!("{parent}.{}", message.name),
            None => message.name.clone(),
        };
        self.register(
            &message.name,
            parent.map(|_| qualified.as_str()),
            SymbolInfo {
                kind: SymbolKind::Message,
                bucket: bucket.to_string(),
                module: to_module_name(&message.name),
                rust_name: message.name.clone(),
            },
        )?;

        for nested_enum in &message.enums {
            let enum_qualified = format!("{qualified}.{}", nested_enum.name);
            self.register(
                &nested_enum.name,
                Some(&enum_qualified),
                SymbolInfo {
                    kind: SymbolKind::Enum,
                    bucket: bucket.to_string(),
                    // Nested enums are emitted inside the owning message's
                    // model file.
                    module: to_module_name(&message.name),
                    rust_name: nested_enum.name.clone(),
                },
            )?;
        }
        for nested in &message.messages {
            self.register_message(nested, bucket, Some(&qualified))?;
        }
        Ok(())
    }

    fn register(
        &mut self,
        simple: &str,
        qualified: Option<&str>,
        info: SymbolInfo,
    ) -> Result<(), Error> {
        if self.symbols.insert(simple.to_string(), info.clone()).is_some() {
            return Err(Error::DuplicateSymbol {
                symbol: simple.to_string(),
            });
        }
        if let Some(qualified) = qualified {
            if self.symbols.insert(qualified.to_string(), info).is_some() {
                return Err(Error::DuplicateSymbol {
                    symbol: qualified.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Looks up a type reference, trying the name as written and then its
    /// last segment.
    pub fn resolve(&self, name: &str) -> Option<&SymbolInfo> {
        let trimmed = name.trim_start_matches('.');
        self.symbols.get(trimmed).or_else(|| {
            trimmed
                .rsplit('.')
                .next()
                .and_then(|simple| self.symbols.get(simple))
        })
    }

    pub fn resolve_or_err(&self, name: &str, referenced_by: &str) -> Result<&SymbolInfo, Error> {
        self.resolve(name).ok_or_else(|| Error::UnresolvedReference {
            symbol: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })
    }

    /// Fails with [`Error::UnresolvedReference`] if any field in any file
    /// references a type that is not in the table.
    pub fn verify_references(&self, files: &[SchemaFile]) -> Result<(), Error> {
        for file in files {
            for message in file.all_messages() {
                for field in &message.fields {
                    let singles: Vec<_> = match field {
                        Field::Single(f) => vec![f],
                        Field::OneOf(o) => o.fields.iter().collect(),
                    };
                    for single in singles {
                        if let Some(reference) = &single.message_type {
                            self.resolve_or_err(
                                reference,
                                &format!("{}.{}", message.name, single.name),
                            )?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The configured module root for an artifact kind.
    pub fn artifact_module(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Model => &self.model_module,
            ArtifactKind::Parser => &self.parser_module,
            ArtifactKind::Writer => &self.writer_module,
            ArtifactKind::Test => &self.test_module,
            ArtifactKind::Codec => &self.codec_module,
            ArtifactKind::JsonCodec => &self.json_codec_module,
        }
    }

    /// Module path of a bucket's artifacts, e.g. `model::services`.
    pub fn package(&self, kind: ArtifactKind, bucket: &str) -> String {
        format!("{}::{}", self.artifact_module(kind), to_module_name(bucket))
    }

    pub fn model_package(&self, bucket: &str) -> String {
        self.package(ArtifactKind::Model, bucket)
    }

    pub fn parser_package(&self, bucket: &str) -> String {
        self.package(ArtifactKind::Parser, bucket)
    }

    pub fn writer_package(&self, bucket: &str) -> String {
        self.package(ArtifactKind::Writer, bucket)
    }

    pub fn test_package(&self, bucket: &str) -> String {
        self.package(ArtifactKind::Test, bucket)
    }

    /// Unqualified Rust type name of a message's artifact,
    /// e.g. `AccountParser` for [`ArtifactKind::Parser`].
    pub fn unqualified_type(&self, kind: ArtifactKind, message_name: &str) -> String {
        match kind {
            ArtifactKind::Model => message_name.to_string(),
            ArtifactKind::Parser => format!("{message_name}Parser"),
            ArtifactKind::Writer => format!("{message_name}Writer"),
            ArtifactKind::Test => format!("{message_name}Test"),
            ArtifactKind::Codec => format!("{message_name}Codec"),
            ArtifactKind::JsonCodec => format!("{message_name}JsonCodec"),
        }
    }

    /// Module (file) name of a message's artifact, e.g. `account_parser`.
    pub fn file_module(&self, kind: ArtifactKind, message_name: &str) -> String {
        let base = to_snake_case(message_name);
        match kind {
            ArtifactKind::Model => to_module_name(&base),
            ArtifactKind::Parser => format!("{base}_parser"),
            ArtifactKind::Writer => format!("{base}_writer"),
            ArtifactKind::Test => format!("{base}_test"),
            ArtifactKind::Codec => format!("{base}_codec"),
            ArtifactKind::JsonCodec => format!("{base}_json_codec"),
        }
    }

    /// Module path of the artifacts for the file a symbol was declared in,
    /// e.g. `model::services`.
    pub fn package_for_message(&self, kind: ArtifactKind, info: &SymbolInfo) -> String {
        self.package(kind, &info.bucket)
    }

    /// Fully qualified path of a message's artifact type, spelled relative to
    /// any generated file. All artifacts sit three modules below the
    /// generated root, so `super::super::super` always reaches it.
    pub fn qualified_type(&self, kind: ArtifactKind, info: &SymbolInfo) -> String {
        let type_name = match info.kind {
            // Enum symbols only have a model artifact; their file module is
            // precomputed in `info.module`.
            SymbolKind::Enum => info.rust_name.clone(),
            SymbolKind::Message => self.unqualified_type(kind, &info.rust_name),
        };
        let module = match info.kind {
            SymbolKind::Enum => info.module.clone(),
            SymbolKind::Message => self.file_module(kind, &info.rust_name),
        };
        format!(
            "super::super::super::{}::{}::{}::{}",
            self.artifact_module(kind),
            info.bucket,
            module,
            type_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_proto;
    use std::path::PathBuf;

    fn load(sources: &[(&str, &str)]) -> Vec<SchemaFile> {
        let config = Config::new();
        sources
            .iter()
            .map(|(path, source)| {
                let ast = parse_proto(source).unwrap();
                SchemaFile::build(&ast, &PathBuf::from(path), &config).unwrap()
            })
            .collect()
    }

    #[test]
    fn resolves_across_files() {
        let files = load(&[
            (
                "schemas/services/account.proto",
                r#"syntax = "proto3"; message Account { AccountId id = 1; }"#,
            ),
            (
                "schemas/base/ids.proto",
                r#"syntax = "proto3"; message AccountId { int64 num = 1; }"#,
            ),
        ]);
        let lookup = LookupHelper::new(&Config::new(), &files).unwrap();
        lookup.verify_references(&files).unwrap();

        let info = lookup.resolve("AccountId").unwrap();
        assert_eq!(info.kind, SymbolKind::Message);
        assert_eq!(info.bucket, "base");
        assert_eq!(
            lookup.package_for_message(ArtifactKind::Model, info),
            "model::base"
        );
        assert_eq!(
            lookup.qualified_type(ArtifactKind::Model, info),
            "super::super::super::model::base::account_id::AccountId"
        );
        assert_eq!(
            lookup.qualified_type(ArtifactKind::Parser, info),
            "super::super::super::parser::base::account_id_parser::AccountIdParser"
        );
    }

    #[test]
    fn unresolved_reference_is_fatal() {
        let files = load(&[(
            "schemas/services/account.proto",
            r#"syntax = "proto3"; message Account { Missing m = 1; }"#,
        )]);
        let lookup = LookupHelper::new(&Config::new(), &files).unwrap();
        let err = lookup.verify_references(&files).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn nested_enum_points_at_owner_module() {
        let files = load(&[(
            "schemas/services/account.proto",
            r#"
            syntax = "proto3";
            message Account {
                enum Status { UNKNOWN = 0; OPEN = 1; }
                Status status = 1;
            }
            "#,
        )]);
        let lookup = LookupHelper::new(&Config::new(), &files).unwrap();
        let info = lookup.resolve("Status").unwrap();
        assert_eq!(info.kind, SymbolKind::Enum);
        assert_eq!(info.module, "account");
        assert_eq!(
            lookup.qualified_type(ArtifactKind::Model, info),
            "super::super::super::model::services::account::Status"
        );
    }

    #[test]
    fn duplicate_symbol_is_fatal() {
        let files = load(&[
            (
                "schemas/a/one.proto",
                r#"syntax = "proto3"; message Thing { int32 x = 1; }"#,
            ),
            (
                "schemas/b/two.proto",
                r#"syntax = "proto3"; message Thing { int32 y = 1; }"#,
            ),
        ]);
        let err = LookupHelper::new(&Config::new(), &files).unwrap_err();
        assert!(matches!(err, Error::DuplicateSymbol { .. }));
    }

    #[test]
    fn package_computation() {
        let lookup = LookupHelper::new(&Config::new(), &[]).unwrap();
        assert_eq!(lookup.model_package("services"), "model::services");
        assert_eq!(lookup.parser_package("services"), "parser::services");
        assert_eq!(lookup.writer_package("Base"), "writer::base");
        assert_eq!(lookup.test_package("services"), "tests::services");
        assert_eq!(lookup.package(ArtifactKind::Codec, "services"), "codec::services");
    }
}
