#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn fleetsweep() -> Command {
    let mut cmd = Command::cargo_bin("fleetsweep").unwrap();
    // 自動検出される設定ファイルや AWS への接続の影響を受けないようにする
    cmd.env_remove("FLEETSWEEP_CONFIG_PATH")
        .env("FLEETSWEEP_DISABLE_TELEMETRY", "1")
        .current_dir(std::env::temp_dir());
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    fleetsweep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aws"))
        .stdout(predicate::str::contains("inspect-aws"))
        .stdout(predicate::str::contains("resource-types"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    fleetsweep()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetsweep"));
}

/// awsコマンドのヘルプに主要なオプションが含まれることを確認
#[test]
fn test_aws_help() {
    fleetsweep()
        .args(["aws", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--older-than"))
        .stdout(predicate::str::contains("--exclude-resource-type"))
        .stdout(predicate::str::contains("--timeout"));
}

/// 対応リソースタイプが一覧表示されることを確認
#[test]
fn test_resource_types() {
    fleetsweep()
        .arg("resource-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("ec2-keypairs"))
        .stdout(predicate::str::contains("transit-gateway-attachment"))
        .stdout(predicate::str::contains("dynamodb"))
        .stdout(predicate::str::contains("cloudwatch-alarm"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    fleetsweep().arg("invalid-command").assert().failure();
}

/// 未知のリソースタイプは AWS に接続する前にエラーになる
#[test]
fn test_unknown_resource_type() {
    fleetsweep()
        .args(["inspect-aws", "--region", "us-east-1", "--resource-type", "s3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("未知のリソースタイプです: s3"));
}

/// 期間指定の形式が不正ならエラー
#[test]
fn test_invalid_older_than() {
    fleetsweep()
        .args(["aws", "--region", "us-east-1", "--older-than", "ten-days"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("期間の形式が不正です"));
}

/// 設定ファイルの未知のリソースタイプはエラー
#[test]
fn test_config_with_unknown_kind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetsweep.yaml");
    fs::write(
        &path,
        "s3-bucket:\n  include:\n    names_regex:\n      - \"^test-\"\n",
    )
    .unwrap();

    fleetsweep()
        .args(["inspect-aws", "--region", "us-east-1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("未知のリソースタイプです: s3-bucket"));
}

/// 設定ファイルの不正な正規表現はエラー
#[test]
fn test_config_with_invalid_regex() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleetsweep.yaml");
    fs::write(&path, "ecr:\n  exclude:\n    names_regex:\n      - \"(unclosed\"\n").unwrap();

    fleetsweep()
        .args(["aws", "--dry-run", "--region", "us-east-1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ecr.exclude.names_regex"));
}

/// 存在しない設定ファイルを指定するとエラー
#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    fleetsweep()
        .args(["inspect-aws", "--region", "us-east-1", "--config"])
        .arg(dir.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定ファイルを読み込めません"));
}
