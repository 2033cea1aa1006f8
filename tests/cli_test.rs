//! CLI integration tests for ucp-codegen binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("ucp-codegen"))
}

// Helper to create a temp schema file, with parent directories
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

const BUYER: &str = r#"{
    "title": "Buyer",
    "required": ["email"],
    "properties": { "email": { "type": "string" } }
}"#;

const CHECKOUT: &str = r#"{
    "title": "Checkout",
    "required": ["currency", "line_items"],
    "properties": {
        "currency": { "type": "string" },
        "line_items": { "type": "array", "items": { "type": "object" } },
        "buyer": { "$ref": "types/buyer.json" },
        "status": { "enum": ["incomplete", "completed"] }
    }
}"#;

mod compile_command {
    use super::*;

    #[test]
    fn prints_module_to_stdout() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schemas/2026-01-11/shopping/types/buyer.json", BUYER);
        let schema =
            write_temp_file(&dir, "schemas/2026-01-11/shopping/checkout.json", CHECKOUT);

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "pub const MODULE: &str = \"Ucp.Schemas.Shopping.Checkout\";",
            ))
            .stdout(predicate::str::contains(
                "Kind::Reference(\"Ucp.Schemas.Shopping.Types.Buyer\")",
            ))
            .stdout(predicate::str::contains(
                "pub const REQUIRED: &[&str] = &[\"currency\", \"line_items\"];",
            ));
    }

    #[test]
    fn prefix_flag_and_env() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schemas/2026-01-11/shopping/types/buyer.json", BUYER);

        cmd()
            .args([
                "compile",
                schema.to_str().unwrap(),
                "--prefix",
                "Example.Schemas",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "\"Example.Schemas.Shopping.Types.Buyer\"",
            ));

        cmd()
            .env("UCP_CODEGEN_PREFIX", "Env.Schemas")
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"Env.Schemas.Shopping.Types.Buyer\""));
    }

    #[test]
    fn explicit_module_name() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "buyer.json", BUYER);

        cmd()
            .args(["compile", schema.to_str().unwrap(), "--module", "Acme.Buyer"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pub const MODULE: &str = \"Acme.Buyer\";"))
            .stdout(predicate::str::contains("pub struct Buyer {"));
    }

    #[test]
    fn writes_output_file() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "buyer.json", BUYER);
        let output = dir.path().join("buyer.rs");

        cmd()
            .args([
                "compile",
                schema.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("pub struct Buyer {"));
    }

    #[test]
    fn spec_output_is_json() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "buyer.json", BUYER);

        let output = cmd()
            .args(["compile", schema.to_str().unwrap(), "--spec"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let spec: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(spec["required_fields"], serde_json::json!(["email"]));
        assert_eq!(spec["source_file_basename"], "buyer.json");
    }

    #[test]
    fn relative_schema_root() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schemas/2026-01-11/shopping/types/buyer.json", BUYER);

        cmd()
            .current_dir(dir.path())
            .args([
                "compile",
                "schemas/2026-01-11/shopping/types/buyer.json",
                "--schema-root",
                "schemas",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "pub const MODULE: &str = \"Ucp.Schemas.Shopping.Types.Buyer\";",
            ));
    }

    #[test]
    fn fallback_warns_but_succeeds() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "order.json",
            r#"{"properties": {"id": {"type": "string"}, "buyer": {"$ref": "missing.json"}}}"#,
        );

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("pub struct Order {"))
            .stderr(predicate::str::contains("direct pass"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn file_not_found() {
        cmd()
            .args(["compile", "/nonexistent/schema.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_json_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", "{ not valid json }");

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn undecodable_schema_is_invalid_json() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("latin1.json");
        fs::write(&schema, b"{\"title\": \"caf\xe9\"}").unwrap();

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn definition_container_is_rejected() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "defs.json", r#"{"$defs": {"a": {"type": "string"}}}"#);

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("no properties or compositions"));
    }

    #[test]
    fn circular_reference_falls_back() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "node.json",
            r##"{"properties": {"name": {"type": "string"}, "child": {"$ref": "#"}}}"##,
        );

        cmd()
            .args(["compile", schema.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("direct pass"))
            .stdout(predicate::str::contains("name: \"child\","));
    }
}

mod batch_command {
    use super::*;

    #[test]
    fn reports_per_file_and_summary() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schemas/2026-01-11/shopping/types/buyer.json", BUYER);
        write_temp_file(&dir, "schemas/2026-01-11/shopping/checkout.json", CHECKOUT);
        write_temp_file(&dir, "schemas/2026-01-11/shopping/broken.json", "{ nope");
        let out = dir.path().join("generated");

        cmd()
            .args([
                "batch",
                dir.path().join("schemas").to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 generated, 1 failed"))
            .stdout(predicate::str::contains("broken.json"))
            .stdout(predicate::str::contains("shopping_checkout.rs"));

        assert!(out.join("shopping_checkout.rs").exists());
        assert!(out.join("shopping_types_buyer.rs").exists());
        assert!(out.join("mod.rs").exists());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schemas/buyer.json", BUYER);
        let out = dir.path().join("generated");

        cmd()
            .args([
                "batch",
                dir.path().join("schemas").to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
                "--dry-run",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("dry run"))
            .stdout(predicate::str::contains("buyer.rs"))
            .stdout(predicate::str::contains("1 generated, 0 failed"));

        assert!(!out.exists());
    }

    #[test]
    fn json_report() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schemas/buyer.json", BUYER);
        write_temp_file(&dir, "schemas/defs.json", r#"{"$defs": {}}"#);

        let output = cmd()
            .args([
                "batch",
                dir.path().join("schemas").to_str().unwrap(),
                "--output",
                dir.path().join("out").to_str().unwrap(),
                "--format",
                "json",
                "--dry-run",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["generated"], 1);
        assert_eq!(report["skipped"], 1);
        assert_eq!(report["failed"], 0);
        assert_eq!(report["outcomes"][0]["status"], "generated");
        assert_eq!(report["outcomes"][1]["status"], "skipped");
    }

    #[test]
    fn missing_path_is_an_error() {
        cmd()
            .arg("batch")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("no schema directory"));
    }

    #[test]
    fn nonexistent_path() {
        cmd()
            .args(["batch", "/nonexistent/schemas", "--dry-run"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("compile"))
            .stdout(predicate::str::contains("batch"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ucp-codegen"));
    }

    #[test]
    fn batch_help() {
        cmd()
            .args(["batch", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--dry-run"));
    }
}
