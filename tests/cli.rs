//! Integration tests for the readyflow binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INVENTORY_PAGE: &str = r#"export const STORE_PRODUCTS = {
  backpack: {
    name: 'Sauce Labs Backpack',
    price: '$29.99',
  },
  onesie: {
    name: 'Sauce Labs Onesie',
    price: '$7.99',
  },
} as const;
"#;

/// Command with a clean token environment and no targeted test runs.
fn readyflow(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("readyflow");
    cmd.current_dir(dir)
        .env_remove("GH_PROJECT_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_API_URL")
        .env_remove("WORK_CMD")
        .env_remove("PROJECT_READY_WORK_CMD")
        .env_remove("DRY_RUN")
        .env_remove("RUST_LOG")
        .env("RUN_TARGETED_TESTS", "0");
    cmd
}

fn shop_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("pages")).unwrap();
    fs::create_dir_all(dir.path().join("tests/inventory")).unwrap();
    fs::write(dir.path().join("pages/InventoryPage.ts"), INVENTORY_PAGE).unwrap();
    dir
}

fn project_response(items: Value) -> Value {
    json!({
        "data": { "repositoryOwner": { "projectV2": {
            "id": "PVT_1",
            "title": "QA Board",
            "fields": { "nodes": [
                { "id": "F_status", "name": "Status", "options": [
                    { "id": "o_ready", "name": "Ready" },
                    { "id": "o_done", "name": "Done" }
                ]}
            ]},
            "items": { "nodes": items }
        }}}
    })
}

fn ready_issue(id: &str, number: u64, labels: &[&str]) -> Value {
    json!({
        "id": id,
        "content": {
            "__typename": "Issue",
            "number": number,
            "title": format!("Card {number}"),
            "body": "",
            "url": format!("https://github.com/acme/shop/issues/{number}"),
            "repository": { "nameWithOwner": "acme/shop" },
            "labels": { "nodes": labels.iter().map(|l| json!({ "name": l })).collect::<Vec<_>>() }
        },
        "fieldValues": { "nodes": [ { "name": "Ready", "field": { "name": "Status" } } ] }
    })
}

async fn board_server(response: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&server)
        .await;
    server
}

mod cli_basics {
    use super::*;

    #[test]
    fn help_lists_commands() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("select-ready"))
            .stdout(predicate::str::contains("merge-to-done"))
            .stdout(predicate::str::contains("verify-setup"));
    }

    #[test]
    fn version() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path()).arg("--version").assert().success();
    }

    #[test]
    fn missing_token_is_a_configuration_failure() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .args(["select-ready", "acme", "3"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("configuration"))
            .stderr(predicate::str::contains("GH_PROJECT_TOKEN"));
    }

    #[test]
    fn invalid_repo_argument() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .args(["ready-to-pr", "acme", "3", "not-a-repo"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("expected owner/repo"));
    }
}

mod usage_errors {
    use super::*;

    #[test]
    fn non_numeric_project_exits_one() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .args(["select-ready", "acme", "abc"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("NO_WORK").not())
            .stderr(predicate::str::contains("abc"));
    }

    #[test]
    fn project_zero_is_rejected() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .args(["select-ready", "acme", "0"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("NO_WORK").not());
    }

    #[test]
    fn missing_argument_exits_one() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .args(["move-item", "acme", "3"])
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn missing_subcommand_exits_one() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path()).assert().code(1);
    }
}

mod select_ready {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn prints_the_best_ready_item() {
        let server = board_server(project_response(json!([
            ready_issue("I_2", 2, &["p0"]),
            ready_issue("I_5", 5, &["bug"]),
        ])))
        .await;
        let dir = TempDir::new().unwrap();

        let output = readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .env("GITHUB_API_URL", server.uri())
            .args(["select-ready", "acme", "3", "acme/shop"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(payload["status"], "READY_ITEM_FOUND");
        assert_eq!(payload["item_id"], "I_5");
        assert_eq!(payload["issue_number"], 5);
        assert_eq!(payload["work_type"], "bugfix");
        assert_eq!(payload["work_type_source"], "label");
        assert_eq!(payload["status_field_id"], "F_status");
        assert_eq!(payload["repository"], "acme/shop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_ready_items_exits_with_no_work() {
        let server = board_server(project_response(json!([]))).await;
        let dir = TempDir::new().unwrap();

        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .env("GITHUB_API_URL", server.uri())
            .args(["select-ready", "acme", "3"])
            .assert()
            .code(2)
            .stdout(predicate::str::contains("\"status\":\"NO_WORK\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_project_is_reported() {
        let server = board_server(json!({ "data": { "repositoryOwner": { "projectV2": null } } })).await;
        let dir = TempDir::new().unwrap();

        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .env("GITHUB_API_URL", server.uri())
            .args(["select-ready", "acme", "9"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Project not found"));
    }
}

mod move_item {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_status_lists_options() {
        let server = board_server(project_response(json!([]))).await;
        let dir = TempDir::new().unwrap();

        readyflow(dir.path())
            .env("GH_TOKEN", "ghp_test")
            .env("GITHUB_API_URL", server.uri())
            .args(["move-item", "acme", "3", "I_1", "Shipped"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Ready"))
            .stderr(predicate::str::contains("Done"));
    }
}

mod verify_setup {
    use super::*;

    #[test]
    fn outside_a_repository_is_a_preflight_failure() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .arg("verify-setup")
            .assert()
            .code(2);
    }

    #[test]
    fn rejects_malformed_repo() {
        let dir = TempDir::new().unwrap();
        readyflow(dir.path())
            .args(["verify-setup", "--repo", "acme"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("expected owner/repo"));
    }
}

mod ready_work {
    use super::*;

    #[test]
    fn creates_inventory_spec_for_named_product() {
        let dir = shop_repo();
        readyflow(dir.path())
            .env("PROJECT_CARD_TITLE", "Create a new test for the Sauce Labs Onesie product")
            .env("PROJECT_CARD_BODY", "")
            .env("PROJECT_CARD_WORK_TYPE", "newTest")
            .env("PROJECT_CARD_ISSUE_NUMBER", "4")
            .arg("ready-work")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Generated: tests/inventory/inv-001-onesie-product-details.spec.ts",
            ))
            .stdout(predicate::str::contains("\"status\":\"WORKFLOW_COMPLETED\""));

        let spec = fs::read_to_string(
            dir.path()
                .join("tests/inventory/inv-001-onesie-product-details.spec.ts"),
        )
        .unwrap();
        assert!(spec.contains("Onesie Product Details"));
    }

    #[test]
    fn delete_without_paths_fails_without_changes() {
        let dir = shop_repo();
        fs::write(dir.path().join("tests/inventory/inv-001-backpack.spec.ts"), "").unwrap();

        readyflow(dir.path())
            .env("PROJECT_CARD_TITLE", "Delete the old tests")
            .env("PROJECT_CARD_BODY", "")
            .env("PROJECT_CARD_WORK_TYPE", "bugfix")
            .arg("ready-work")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("artifact conflict"));

        assert!(dir.path().join("tests/inventory/inv-001-backpack.spec.ts").exists());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = shop_repo();
        readyflow(dir.path())
            .env("DRY_RUN", "1")
            .env("PROJECT_CARD_TITLE", "Create a new test for the Sauce Labs Onesie product")
            .arg("ready-work")
            .assert()
            .success()
            .stdout(predicate::str::contains("Generated:"));

        let entries = fs::read_dir(dir.path().join("tests/inventory")).unwrap().count();
        assert_eq!(entries, 0);
    }
}
