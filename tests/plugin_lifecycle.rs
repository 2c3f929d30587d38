//! End-to-end plugin lifecycle tests against a fake package manager

mod common;

use common::{FakeInstaller, REGISTRY, Workspace, plugin_package};
use plugdeck::PluginError;
use plugdeck::plugins::{PluginStatus, Severity};
use serde_json::json;

#[tokio::test]
async fn test_install_path_then_validate() {
    let workspace = Workspace::new();
    let source =
        workspace.write_source("sample", &plugin_package("sample-plugin", "sample", &["hello"]));

    let mut facility = workspace.facility("2.0.0");
    let outcomes = facility
        .install(&[source.display().to_string()], None)
        .await
        .unwrap();

    let record = &outcomes[0].record;
    assert_eq!(record.name, "sample-plugin");
    assert_eq!(record.package_locator, source.display().to_string());
    assert_eq!(record.registry, REGISTRY);

    let registered = workspace.store().load().unwrap();
    assert_eq!(registered.names(), vec!["sample-plugin"]);

    let report = facility.validate(None).unwrap();
    let sample = report.get("sample-plugin").unwrap();
    assert_eq!(sample.status, PluginStatus::Accepted);
    assert_eq!(sample.count(Severity::Error), 0);
    assert_eq!(sample.count(Severity::Warning), 1);
    assert!(sample.issues[0].message.contains("pluginHealthCheck"));
    assert!(report.is_success(true, false));
}

#[tokio::test]
async fn test_second_plugin_with_same_group_is_rejected() {
    let workspace = Workspace::new();
    let alpha = workspace.write_source("db-alpha", &plugin_package("db-alpha", "db", &["query"]));
    let beta = workspace.write_source("db-beta", &plugin_package("db-beta", "DB", &["migrate"]));

    let mut facility = workspace.facility("2.0.0");
    facility
        .install(
            &[alpha.display().to_string(), beta.display().to_string()],
            Some(REGISTRY),
        )
        .await
        .unwrap();

    let host_tree = facility.host().command_tree();
    let tree = facility.load_all(host_tree).unwrap();

    assert!(tree.find(&["db", "query"]).is_some());
    assert!(tree.find(&["db", "migrate"]).is_none());
    assert_eq!(
        tree.children().iter().filter(|c| c.answers_to("db")).count(),
        1
    );

    let issues = facility.issues().issues_for("db-beta");
    assert!(
        issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("'DB'") && i.message.contains("'db'"))
    );
    assert!(!facility.issues().has_errors("db-alpha"));

    let report = facility.validate(None).unwrap();
    assert_eq!(report.get("db-alpha").unwrap().status, PluginStatus::Accepted);
    assert_eq!(report.get("db-beta").unwrap().status, PluginStatus::Rejected);
    assert!(!report.is_success(true, false));
    assert!(report.is_success(false, false));
}

#[tokio::test]
async fn test_host_version_mismatch_warns_and_merges() {
    let workspace = Workspace::new();
    let mut package = plugin_package("legacy-plugin", "legacy", &["run"]);
    package["peerDependencies"] = json!({ "plugdeck": "^1.0.0" });
    package["plugdeck"]["pluginHealthCheck"] = json!("./lib/healthCheck.js");
    let source = workspace.write_source("legacy", &package);

    let mut facility = workspace.facility("2.0.0");
    facility
        .install(&[source.display().to_string()], None)
        .await
        .unwrap();

    let host_tree = facility.host().command_tree();
    let tree = facility.load_all(host_tree).unwrap();

    assert!(tree.find(&["legacy", "run"]).is_some());
    let issues = facility.issues().issues_for("legacy-plugin");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert!(issues[0].message.contains("^1.0.0"));
    assert!(issues[0].message.contains("2.0.0"));
}

#[tokio::test]
async fn test_uninstall_removes_package_and_record() {
    let workspace = Workspace::new();
    let source = workspace.write_source("sample", &plugin_package("sample-plugin", "sample", &["hello"]));

    let mut facility = workspace.facility("1.0.0");
    facility
        .install(&[source.display().to_string()], None)
        .await
        .unwrap();
    assert!(workspace.modules_dir().join("sample-plugin").is_dir());

    let removed = facility.uninstall("sample-plugin").await.unwrap();
    assert_eq!(removed.name, "sample-plugin");
    assert!(!workspace.modules_dir().join("sample-plugin").exists());
    assert!(facility.list().unwrap().is_empty());

    let again = facility.uninstall("sample-plugin").await;
    assert!(matches!(again, Err(PluginError::NotFound(_))));
}

#[tokio::test]
async fn test_update_registry_plugin_reports_new_version() {
    let workspace = Workspace::new();
    let mut package = plugin_package("remote-plugin", "remote", &["fetch"]);
    let source = workspace.write_source("remote", &package);

    let installer = FakeInstaller::new(workspace.modules_dir());
    installer.publish("remote-plugin", source);
    let mut facility = workspace.facility_with("1.0.0", installer);

    let outcomes = facility
        .install(&["remote-plugin@1.0.0".to_string()], None)
        .await
        .unwrap();
    assert_eq!(outcomes[0].record.package_locator, "remote-plugin");
    assert_eq!(outcomes[0].record.version, "1.0.0");

    package["version"] = json!("1.3.0-beta.2");
    workspace.write_source("remote", &package);

    let version = facility.update("remote-plugin", None).await.unwrap();
    assert_eq!(version, "1.3.0-beta.2");

    let records = facility.list().unwrap();
    assert_eq!(records[0].version, "1.3.0-beta.2");
}

#[tokio::test]
async fn test_install_from_file_and_reinstall_all() {
    let workspace = Workspace::new();
    let first = workspace.write_source("first", &plugin_package("first-plugin", "first", &["a"]));
    let second = workspace.write_source("second", &plugin_package("second-plugin", "second", &["b"]));

    let listing = workspace.dir.path().join("listing.json");
    std::fs::write(
        &listing,
        json!({
            "first-plugin": { "package": first.display().to_string(), "registry": REGISTRY, "version": "1.0.0" },
            "second-plugin": { "package": second.display().to_string(), "registry": "https://mirror.example.com/", "version": "1.0.0" }
        })
        .to_string(),
    )
    .unwrap();

    let mut facility = workspace.facility("1.0.0");
    let outcomes = facility.install_from_file(&listing, None).await.unwrap();
    assert_eq!(outcomes.len(), 2);

    let records = facility.list().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].registry, "https://mirror.example.com/");

    std::fs::remove_dir_all(workspace.modules_dir()).unwrap();
    let outcomes = facility.reinstall_all(None).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(workspace.modules_dir().join("first-plugin").is_dir());
    assert!(workspace.modules_dir().join("second-plugin").is_dir());
}

#[tokio::test]
async fn test_failed_install_keeps_registry_empty() {
    let workspace = Workspace::new();
    let mut facility = workspace.facility("1.0.0");

    let result = facility
        .install(&["not-published".to_string()], None)
        .await;

    assert!(matches!(result, Err(PluginError::Install { .. })));
    assert!(workspace.store().load().unwrap().is_empty());
}

#[tokio::test]
async fn test_broken_plugin_does_not_stop_others() {
    let workspace = Workspace::new();
    let good = workspace.write_source("good", &plugin_package("good-plugin", "good", &["run"]));
    let mut broken = plugin_package("broken-plugin", "broken", &[]);
    broken["plugdeck"]["definitions"] = json!([
        { "name": "empty", "type": "group", "description": "No children" }
    ]);
    let broken = workspace.write_source("broken", &broken);

    let mut facility = workspace.facility("1.0.0");
    facility
        .install(&[broken.display().to_string(), good.display().to_string()], None)
        .await
        .unwrap();

    let host_tree = facility.host().command_tree();
    let tree = facility.load_all(host_tree).unwrap();

    assert!(tree.child("broken").is_none());
    assert!(tree.find(&["good", "run"]).is_some());
    assert_eq!(facility.issues().count("broken-plugin", Severity::Error), 1);
}
