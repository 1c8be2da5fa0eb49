//! Normalized schema model.
//!
//! One [`SchemaFile`] per input. The model is built once per compile and never
//! mutated afterwards; the emitters only read it. Named type references stay
//! as names here ([`FieldType::Message`] plus `message_type`) and are resolved
//! against the merged symbol table before emission.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::parser::ast::*;
use crate::Error;

/// The wire-level type of a single field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldType {
    Int32,
    Sint32,
    Uint32,
    Int64,
    Sint64,
    Uint64,
    Fixed32,
    Sfixed32,
    Fixed64,
    Sfixed64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    /// A named reference resolved to an enum.
    Enum,
    /// A named reference to another message (or not yet resolved).
    Message,
}

impl FieldType {
    /// Maps a proto scalar keyword, or returns `None` for named references.
    fn from_keyword(keyword: &str) -> Option<FieldType> {
        Some(match keyword {
            "int32" => FieldType::Int32,
            "sint32" => FieldType::Sint32,
            "uint32" => FieldType::Uint32,
            "int64" => FieldType::Int64,
            "sint64" => FieldType::Sint64,
            "uint64" => FieldType::Uint64,
            "fixed32" => FieldType::Fixed32,
            "sfixed32" => FieldType::Sfixed32,
            "fixed64" => FieldType::Fixed64,
            "sfixed64" => FieldType::Sfixed64,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "bool" => FieldType::Bool,
            "string" => FieldType::String,
            "bytes" => FieldType::Bytes,
            _ => return None,
        })
    }
}

/// The scalar hiding inside a `google.protobuf.*Value` wrapper, if any.
///
/// A field declared with one of these types models an absent-or-present
/// scalar; the message dependency is dropped entirely.
fn wrapper_inner_type(type_name: &str) -> Option<FieldType> {
    let short = type_name
        .trim_start_matches('.')
        .strip_prefix("google.protobuf.")
        .unwrap_or(type_name);
    Some(match short {
        "StringValue" => FieldType::String,
        "Int32Value" => FieldType::Int32,
        "UInt32Value" => FieldType::Uint32,
        "SInt32Value" => FieldType::Sint32,
        "Int64Value" => FieldType::Int64,
        "UInt64Value" => FieldType::Uint64,
        "SInt64Value" => FieldType::Sint64,
        "FloatValue" => FieldType::Float,
        "DoubleValue" => FieldType::Double,
        "BoolValue" => FieldType::Bool,
        "BytesValue" => FieldType::Bytes,
        _ => return None,
    })
}

/// One plain protobuf field, inside or outside a oneof.
#[derive(Debug, Clone)]
pub struct SingleField {
    pub name: String,
    pub number: u32,
    pub field_type: FieldType,
    pub repeated: bool,
    /// Present-or-absent semantics: a recognized wrapper type or proto3
    /// `optional`.
    pub optional: bool,
    /// Named type reference, kept verbatim until resolution.
    pub message_type: Option<String>,
    pub doc: Option<String>,
    pub deprecated: bool,
    /// Name of the enclosing oneof, if this field is a branch.
    pub oneof_name: Option<String>,
}

/// A oneof with its branch fields.
#[derive(Debug, Clone)]
pub struct OneOfField {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<SingleField>,
}

#[derive(Debug, Clone)]
pub enum Field {
    Single(SingleField),
    OneOf(OneOfField),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: String,
    pub doc: Option<String>,
    pub deprecated: bool,
    /// Fields in declaration order; a oneof counts as one field.
    pub fields: Vec<Field>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub name: String,
    pub doc: Option<String>,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    pub deprecated: bool,
    pub doc: Option<String>,
}

impl Enum {
    /// The value numbered zero, which proto3 guarantees to exist.
    pub fn zero_value(&self) -> &EnumValue {
        self.values
            .iter()
            .find(|v| v.number == 0)
            .expect("validated at model build")
    }
}

/// One parsed and normalized input file.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub package: Option<String>,
    /// Emitted-namespace override from `option java_package`.
    pub package_override: Option<String>,
    /// Lowercased name of the directory the file came from; becomes the
    /// namespace suffix for every artifact of this file.
    pub bucket: String,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
}

impl SchemaFile {
    /// Normalizes one parse tree.
    ///
    /// Map fields are rejected here (fatal), unknown elements and options are
    /// routed to the warning sink, and the §3 invariants (unique field
    /// numbers, enum zero value) are enforced.
    pub fn build(
        ast: &ProtoFileAst,
        path: &Path,
        config: &Config,
    ) -> Result<SchemaFile, Error> {
        let bucket = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "proto".to_string());

        let mut package_override = None;
        for option in &ast.options {
            if option.name == "java_package" {
                package_override = Some(option.value.clone());
            } else {
                config.warn(&format!(
                    "{}: unknown file option '{}'",
                    path.display(),
                    option.name
                ));
            }
        }

        let messages = ast
            .messages
            .iter()
            .map(|m| build_message(m, path, config))
            .collect::<Result<Vec<_>, _>>()?;
        let enums = ast
            .enums
            .iter()
            .map(build_enum)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SchemaFile {
            path: path.to_path_buf(),
            package: ast.package.clone(),
            package_override,
            bucket,
            messages,
            enums,
        })
    }

    /// Every message in this file, outermost first, nested ones flattened in.
    pub fn all_messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        fn visit<'a>(message: &'a Message, out: &mut Vec<&'a Message>) {
            out.push(message);
            for nested in &message.messages {
                visit(nested, out);
            }
        }
        for message in &self.messages {
            visit(message, &mut out);
        }
        out
    }
}

fn build_message(ast: &MessageAst, path: &Path, config: &Config) -> Result<Message, Error> {
    let mut fields = Vec::new();
    let mut messages = Vec::new();
    let mut enums = Vec::new();
    let mut deprecated = false;

    for element in &ast.elements {
        match element {
            MessageElement::Field(field) => {
                fields.push(Field::Single(build_single_field(field, None, config)));
            }
            MessageElement::Oneof(oneof) => {
                let children = oneof
                    .fields
                    .iter()
                    .map(|f| build_single_field(f, Some(&oneof.name), config))
                    .collect();
                fields.push(Field::OneOf(OneOfField {
                    name: oneof.name.clone(),
                    doc: oneof.doc.clone(),
                    fields: children,
                }));
            }
            MessageElement::Map(map) => {
                return Err(Error::UnsupportedMap {
                    message: ast.name.clone(),
                    field: map.name.clone(),
                });
            }
            MessageElement::Message(nested) => {
                messages.push(build_message(nested, path, config)?);
            }
            MessageElement::Enum(nested) => {
                enums.push(build_enum(nested)?);
            }
            MessageElement::Option(option) => {
                if option.name == "deprecated" && option.value == "true" {
                    deprecated = true;
                } else {
                    config.warn(&format!(
                        "{}: unknown option '{}' in message '{}'",
                        path.display(),
                        option.name,
                        ast.name
                    ));
                }
            }
            MessageElement::Reserved(_) => {}
            MessageElement::Unknown { keyword, span } => {
                config.warn(&format!(
                    "{}:{}:{}: unknown element '{}' in message '{}'",
                    path.display(),
                    span.line,
                    span.column,
                    keyword,
                    ast.name
                ));
            }
        }
    }

    // Field numbers must be unique across the whole message, oneof branches
    // included.
    let mut numbers = BTreeSet::new();
    for field in &fields {
        let field_numbers: Vec<u32> = match field {
            Field::Single(f) => vec![f.number],
            Field::OneOf(o) => o.fields.iter().map(|f| f.number).collect(),
        };
        for number in field_numbers {
            if !numbers.insert(number) {
                return Err(Error::DuplicateFieldNumber {
                    message: ast.name.clone(),
                    number,
                });
            }
        }
    }

    Ok(Message {
        name: ast.name.clone(),
        doc: ast.doc.clone(),
        deprecated,
        fields,
        messages,
        enums,
    })
}

fn build_single_field(ast: &FieldAst, oneof_name: Option<&str>, config: &Config) -> SingleField {
    let mut deprecated = false;
    for option in &ast.options {
        if option.name == "deprecated" {
            deprecated = option.value == "true";
        } else {
            config.warn(&format!(
                "unknown option '{}' on field '{}'",
                option.name, ast.name
            ));
        }
    }

    let (field_type, optional, message_type) =
        if let Some(scalar) = FieldType::from_keyword(&ast.type_name) {
            (scalar, ast.optional, None)
        } else if let Some(inner) = wrapper_inner_type(&ast.type_name) {
            // Wrapper types model an absent-or-present scalar; the MESSAGE
            // dependency is dropped.
            (inner, true, None)
        } else {
            (
                FieldType::Message,
                ast.optional,
                Some(ast.type_name.trim_start_matches('.').to_string()),
            )
        };

    SingleField {
        name: ast.name.clone(),
        number: ast.number,
        field_type,
        repeated: ast.repeated,
        optional,
        message_type,
        doc: ast.doc.clone(),
        deprecated,
        oneof_name: oneof_name.map(str::to_string),
    }
}

fn build_enum(ast: &EnumAst) -> Result<Enum, Error> {
    let mut numbers = BTreeSet::new();
    for value in &ast.values {
        if !numbers.insert(value.number) {
            return Err(Error::DuplicateEnumNumber {
                enum_name: ast.name.clone(),
                number: value.number,
            });
        }
    }
    if !numbers.contains(&0) {
        return Err(Error::MissingZeroValue {
            enum_name: ast.name.clone(),
        });
    }

    Ok(Enum {
        name: ast.name.clone(),
        doc: ast.doc.clone(),
        values: ast
            .values
            .iter()
            .map(|v| EnumValue {
                name: v.name.clone(),
                number: v.number,
                deprecated: v.deprecated,
                doc: v.doc.clone(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_proto;
    use std::path::PathBuf;

    fn build(source: &str) -> Result<SchemaFile, Error> {
        let ast = parse_proto(source).unwrap();
        SchemaFile::build(&ast, &PathBuf::from("schemas/services/test.proto"), &Config::new())
    }

    #[test]
    fn bucket_is_lowercased_parent_dir() {
        let file = build("syntax = \"proto3\";").unwrap();
        assert_eq!(file.bucket, "services");
    }

    #[test]
    fn wrapper_types_become_optional_scalars() {
        let file = build(
            r#"
            syntax = "proto3";
            message Account {
                google.protobuf.StringValue alias = 1;
                google.protobuf.Int64Value balance = 2;
                string memo = 3;
            }
            "#,
        )
        .unwrap();

        let Field::Single(alias) = &file.messages[0].fields[0] else {
            panic!()
        };
        assert_eq!(alias.field_type, FieldType::String);
        assert!(alias.optional);
        assert_eq!(alias.message_type, None);

        let Field::Single(balance) = &file.messages[0].fields[1] else {
            panic!()
        };
        assert_eq!(balance.field_type, FieldType::Int64);
        assert!(balance.optional);

        let Field::Single(memo) = &file.messages[0].fields[2] else {
            panic!()
        };
        assert!(!memo.optional);
    }

    #[test]
    fn oneof_children_point_back_at_parent() {
        let file = build(
            r#"
            syntax = "proto3";
            message Key {
                oneof key {
                    bytes ed25519 = 1;
                    string alias = 2;
                }
            }
            "#,
        )
        .unwrap();

        let Field::OneOf(oneof) = &file.messages[0].fields[0] else {
            panic!()
        };
        assert_eq!(oneof.name, "key");
        assert_eq!(oneof.fields.len(), 2);
        assert_eq!(oneof.fields[0].oneof_name.as_deref(), Some("key"));
        assert_eq!(oneof.fields[1].number, 2);
    }

    #[test]
    fn map_fields_are_fatal() {
        let err = build(
            r#"
            syntax = "proto3";
            message Table { map<string, int32> counts = 1; }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMap { .. }));
        assert!(err.to_string().contains("map fields not supported"));
    }

    #[test]
    fn duplicate_field_numbers_are_fatal() {
        let err = build(
            r#"
            syntax = "proto3";
            message M {
                int32 a = 1;
                oneof choice { string b = 1; }
            }
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateFieldNumber { number: 1, .. }
        ));
    }

    #[test]
    fn enum_without_zero_is_fatal() {
        let err = build(
            r#"
            syntax = "proto3";
            enum Kind { FIRST = 1; }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingZeroValue { .. }));
    }

    #[test]
    fn package_override_is_recorded() {
        let file = build(
            r#"
            syntax = "proto3";
            option java_package = "com.example.services";
            "#,
        )
        .unwrap();
        assert_eq!(
            file.package_override.as_deref(),
            Some("com.example.services")
        );
    }

    #[test]
    fn nested_messages_flatten_in_order() {
        let file = build(
            r#"
            syntax = "proto3";
            message A { message B { message C { int32 x = 1; } } }
            message D { bool y = 1; }
            "#,
        )
        .unwrap();
        let names: Vec<_> = file.all_messages().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }
}
