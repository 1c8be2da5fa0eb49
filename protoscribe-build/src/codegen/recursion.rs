//! Recursive type detection for automatic boxing.
//!
//! Message types may reference themselves, directly or through a cycle of
//! other messages (key lists holding keys holding key lists). Rust needs
//! indirection for such types to have a known size, so fields that close a
//! cycle are emitted behind `Box`.

use std::collections::{BTreeMap, BTreeSet};

use crate::lookup::{LookupHelper, SymbolKind};
use crate::model::{Field, SchemaFile};

/// A field that needs to be boxed to break a recursive cycle, as
/// `(message name, field name)`.
pub type RecursiveField = (String, String);

/// Analyzes all loaded files and returns the fields that need boxing.
pub fn find_recursive_fields(
    files: &[SchemaFile],
    lookup: &LookupHelper,
) -> BTreeSet<RecursiveField> {
    // message name -> [(field name, referenced message name)]
    let mut graph: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();

    for file in files {
        for message in file.all_messages() {
            let mut edges = Vec::new();
            for field in &message.fields {
                let singles: Vec<_> = match field {
                    Field::Single(f) => vec![f],
                    Field::OneOf(o) => o.fields.iter().collect(),
                };
                for single in singles {
                    let Some(reference) = &single.message_type else {
                        continue;
                    };
                    // Only message references can close a cycle.
                    let Some(info) = lookup.resolve(reference) else {
                        continue;
                    };
                    if info.kind == SymbolKind::Message {
                        edges.push((single.name.clone(), info.rust_name.clone()));
                    }
                }
            }
            graph.insert(message.name.clone(), edges);
        }
    }

    let mut result = BTreeSet::new();
    for start in graph.keys() {
        let mut in_path = BTreeSet::new();
        in_path.insert(start.clone());
        dfs_find_cycles(&graph, start, start, &mut in_path, &mut result);
    }
    result
}

/// DFS marking fields whose edge completes a cycle back to `target`.
fn dfs_find_cycles(
    graph: &BTreeMap<String, Vec<(String, String)>>,
    current: &str,
    target: &str,
    in_path: &mut BTreeSet<String>,
    result: &mut BTreeSet<RecursiveField>,
) {
    let Some(edges) = graph.get(current) else {
        return;
    };

    for (field_name, referenced) in edges {
        if referenced == target {
            result.insert((current.to_string(), field_name.clone()));
            continue;
        }
        if in_path.contains(referenced) {
            continue;
        }
        in_path.insert(referenced.clone());
        dfs_find_cycles(graph, referenced, target, in_path, result);
        in_path.remove(referenced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::SchemaFile;
    use crate::parser::parse_proto;
    use std::path::PathBuf;

    fn analyze(source: &str) -> BTreeSet<RecursiveField> {
        let ast = parse_proto(source).unwrap();
        let file =
            SchemaFile::build(&ast, &PathBuf::from("schemas/keys/key.proto"), &Config::new())
                .unwrap();
        let files = vec![file];
        let lookup = LookupHelper::new(&Config::new(), &files).unwrap();
        find_recursive_fields(&files, &lookup)
    }

    #[test]
    fn direct_recursion() {
        let recursive = analyze(
            r#"
            syntax = "proto3";
            message Node { Node child = 1; }
            "#,
        );
        assert!(recursive.contains(&("Node".to_string(), "child".to_string())));
    }

    #[test]
    fn indirect_recursion_marks_a_field_in_the_cycle() {
        let recursive = analyze(
            r#"
            syntax = "proto3";
            message Key { KeyList keys = 1; }
            message KeyList { repeated Key key = 1; }
            "#,
        );
        assert!(
            recursive.contains(&("Key".to_string(), "keys".to_string()))
                || recursive.contains(&("KeyList".to_string(), "key".to_string()))
        );
    }

    #[test]
    fn oneof_branches_participate() {
        let recursive = analyze(
            r#"
            syntax = "proto3";
            message Key {
                oneof key {
                    bytes ed25519 = 1;
                    ThresholdKey threshold_key = 2;
                }
            }
            message ThresholdKey { Key key = 1; }
            "#,
        );
        assert!(!recursive.is_empty());
    }

    #[test]
    fn no_recursion_no_boxing() {
        let recursive = analyze(
            r#"
            syntax = "proto3";
            message A { B b = 1; }
            message B { int32 x = 1; }
            "#,
        );
        assert!(recursive.is_empty());
    }
}
