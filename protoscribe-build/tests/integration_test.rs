//! Integration tests for protoscribe-build.

use protoscribe_build::Config;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn compile_fixtures(out_dir: &Path) {
    Config::new()
        .out_dir(out_dir)
        .compile_protos("tests/proto/")
        .expect("failed to compile fixture protos");
}

#[test]
fn test_emits_four_artifacts_per_message() {
    let out_dir = tempdir().expect("failed to create temp dir");
    compile_fixtures(out_dir.path());

    for path in [
        "model/services/token_balance.rs",
        "parser/services/token_balance_parser.rs",
        "writer/services/token_balance_writer.rs",
        "tests/services/token_balance_test.rs",
        "model/base/account_id.rs",
        "parser/base/account_id_parser.rs",
        "writer/base/account_id_writer.rs",
        "tests/base/account_id_test.rs",
    ] {
        assert!(
            out_dir.path().join(path).exists(),
            "{path} should be generated"
        );
    }

    // mod.rs chain all the way down.
    for path in [
        "mod.rs",
        "model/mod.rs",
        "model/services/mod.rs",
        "parser/keys/mod.rs",
        "tests/base/mod.rs",
    ] {
        assert!(out_dir.path().join(path).exists(), "{path} should exist");
    }
}

#[test]
fn test_model_artifact_shape() {
    let out_dir = tempdir().expect("failed to create temp dir");
    compile_fixtures(out_dir.path());

    let content = fs::read_to_string(out_dir.path().join("model/services/token_balance.rs"))
        .expect("failed to read model");

    assert!(content.contains("pub struct TokenBalance"));
    assert!(content.contains("pub struct TokenBalanceBuilder"));

    // Doc comments survive from the proto source.
    assert!(content.contains("A fungible token balance entry."));
    assert!(content.contains("Owning account."));

    // Wrapper-optional fields become Option over the inner scalar.
    assert!(content.contains("pub alias: Option<String>"));
    // Message fields are presence-tracked.
    assert!(content.contains("pub account: Option<AccountId>"));
    // Packed repeated scalar.
    assert!(content.contains("pub serial_numbers: Vec<i64>"));
    // Deprecated field option carries through.
    assert!(content.contains("#[deprecated]"));

    // Oneof: discriminant enum with UNSET = 0 plus numbered branches.
    assert!(content.contains("pub enum SupplyOneOfType"));
    assert!(content.contains("Unset = 0"));
    assert!(content.contains("MaxSupply = 8"));
    assert!(content.contains("Registry = 9"));
    assert!(content.contains("pub enum SupplyOneOf"));

    // Nested enum with its zero default.
    assert!(content.contains("pub enum Status"));
    assert!(content.contains("StatusUnknown = 0"));
    assert!(content.contains("fn from_number"));

    // Stable hash with the exact avalanche shifts.
    assert!(content.contains("pub fn hash_code(&self) -> i32"));
    assert!(content.contains("hash = hash.wrapping_add(hash << 30)"));
    assert!(content.contains(">> 27"));
    assert!(content.contains("hash << 16"));
    assert!(content.contains(">> 24"));

    // Codec references and the lazily built default singleton.
    assert!(content.contains("pub const PROTOBUF"));
    assert!(content.contains("pub fn default_instance()"));

    // Message-field conveniences and builder.
    assert!(content.contains("pub fn has_account"));
    assert!(content.contains("pub fn account_or_throw"));
    assert!(content.contains("pub fn copy_builder"));
}

#[test]
fn test_parser_and_writer_artifact_shape() {
    let out_dir = tempdir().expect("failed to create temp dir");
    compile_fixtures(out_dir.path());

    let parser = fs::read_to_string(
        out_dir
            .path()
            .join("parser/services/token_balance_parser.rs"),
    )
    .expect("failed to read parser");
    assert!(parser.contains("pub struct TokenBalanceParser"));
    // Nested messages go through the sub-parser.
    assert!(parser.contains("AccountIdParser"));
    // Unknown fields are skipped by wire type.
    assert!(parser.contains("skip_field(data, wire_type)?"));
    // Packed repeated scalars accept both encodings.
    assert!(parser.contains("if wire_type == WireType::Len"));

    let writer = fs::read_to_string(
        out_dir
            .path()
            .join("writer/services/token_balance_writer.rs"),
    )
    .expect("failed to read writer");
    assert!(writer.contains("pub struct TokenBalanceWriter"));
    assert!(writer.contains("pub fn measure"));
    // Default-value elision guards.
    assert!(writer.contains("if !msg.memo.is_empty()"));
    // Wrapper-present values are written unconditionally.
    assert!(writer.contains("if let Some(value) = &msg.alias"));
    // Nested length prefixes come from the sub-writer's measure.
    assert!(writer.contains("AccountIdWriter"));
}

#[test]
fn test_test_artifact_shape() {
    let out_dir = tempdir().expect("failed to create temp dir");
    compile_fixtures(out_dir.path());

    let test = fs::read_to_string(out_dir.path().join("tests/services/token_balance_test.rs"))
        .expect("failed to read test");
    assert!(test.contains("pub fn create_model_test_arguments"));
    assert!(test.contains("fn test_token_balance_round_trip"));
    // Message-typed fields reuse the referenced message's arguments.
    assert!(test.contains("account_id_test::create_model_test_arguments"));
    // Sample values from the representative table.
    assert!(test.contains("\"Dude\""));
    assert!(test.contains("u64::MAX"));
}

#[test]
fn test_cycle_break_omits_recursive_branch() {
    let out_dir = tempdir().expect("failed to create temp dir");
    compile_fixtures(out_dir.path());

    let test = fs::read_to_string(out_dir.path().join("tests/keys/key_test.rs"))
        .expect("failed to read key test");
    // The ed25519 branch is sampled; the THRESHOLD_KEY branch is in the
    // default cycle-break set and must not be.
    assert!(test.contains("Ed25519"));
    assert!(!test.contains("threshold_key_test::create_model_test_arguments"));

    // The recursive model field is boxed.
    let model = fs::read_to_string(out_dir.path().join("model/keys/key.rs"))
        .expect("failed to read key model");
    assert!(model.contains("Box<ThresholdKey>"));
}

#[test]
fn test_map_fields_are_rejected() {
    let dir = tempdir().expect("failed to create temp dir");
    let proto_dir = dir.path().join("schemas");
    fs::create_dir_all(&proto_dir).expect("create schema dir");
    fs::write(
        proto_dir.join("bad.proto"),
        "syntax = \"proto3\";\nmessage Bad { map<string, int32> counts = 1; }\n",
    )
    .expect("write schema");

    let out_dir = tempdir().expect("failed to create temp dir");
    let err = Config::new()
        .out_dir(out_dir.path())
        .compile_protos(&proto_dir)
        .expect_err("map fields must be fatal");
    assert!(err.to_string().contains("map fields not supported"));
}

#[test]
fn test_parse_errors_carry_location() {
    let dir = tempdir().expect("failed to create temp dir");
    let proto_dir = dir.path().join("schemas");
    fs::create_dir_all(&proto_dir).expect("create schema dir");
    fs::write(
        proto_dir.join("broken.proto"),
        "syntax = \"proto3\";\nmessage Broken {\n  int32 = 1;\n}\n",
    )
    .expect("write schema");

    let out_dir = tempdir().expect("failed to create temp dir");
    let err = Config::new()
        .out_dir(out_dir.path())
        .compile_protos(&proto_dir)
        .expect_err("syntax errors must be fatal");
    let message = err.to_string();
    assert!(message.contains("broken.proto"));
    assert!(message.contains(":3:"), "line number in: {message}");
}

#[test]
fn test_output_is_deterministic() {
    let first = tempdir().expect("failed to create temp dir");
    let second = tempdir().expect("failed to create temp dir");
    compile_fixtures(first.path());
    compile_fixtures(second.path());

    for path in [
        "model/services/token_balance.rs",
        "parser/keys/key_parser.rs",
        "writer/base/account_id_writer.rs",
        "tests/services/token_balance_test.rs",
        "mod.rs",
    ] {
        let a = fs::read_to_string(first.path().join(path)).expect("read first");
        let b = fs::read_to_string(second.path().join(path)).expect("read second");
        assert_eq!(a, b, "{path} differs between runs");
    }
}
