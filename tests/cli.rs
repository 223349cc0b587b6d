//! End-to-end tests for the command line interface against fixture files

mod common;

use std::io::Write;

use marketplace_query::cli::{self, Command};
use marketplace_query::config::Config;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

fn fixture_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", common::fixtures()).unwrap();
    file
}

fn command(args: &[&str]) -> Command {
    Command::parse(args.iter().map(|a| a.to_string())).unwrap()
}

async fn run(args: &[&str]) -> anyhow::Result<Value> {
    let output = cli::run(command(args), &Config::default()).await?;
    Ok(serde_json::from_str(&output)?)
}

#[tokio::test]
async fn test_compile_prints_store_query() {
    let query = run(&[
        "compile",
        "bookings",
        r#"--filter={"id":{"eq":"65e000000000000000000001"},"status":{"between":["PENDING","ACCEPTED"]}}"#,
    ])
    .await
    .unwrap();

    assert_eq!(
        query,
        json!({
            "_id": { "$eq": { "$oid": "65e000000000000000000001" } },
            "status": { "$in": ["PENDING", "ACCEPTED"] }
        })
    );
}

#[tokio::test]
async fn test_list_customers_page() {
    let fixtures = fixture_file();
    let path = fixtures.path().to_str().unwrap();

    let page = run(&["list", "customers", "--fixtures", path, "--limit", "2"])
        .await
        .unwrap();

    assert_eq!(page["totalCount"], json!(3));
    assert_eq!(page["totalPages"], json!(2));
    assert_eq!(page["hasNextPage"], json!(true));
    assert_eq!(page["items"][0]["name"], json!("Grace Hopper"));
    assert_eq!(page["items"][0]["_id"], json!({ "$oid": "65a000000000000000000003" }));
}

#[tokio::test]
async fn test_list_providers_near_with_filter_file() {
    let fixtures = fixture_file();
    let mut filter = NamedTempFile::new().unwrap();
    write!(
        filter,
        "{}",
        json!({ "location": { "near": { "latitude": 52.52, "longitude": 13.405 } } })
    )
    .unwrap();
    let filter_arg = format!("--filter=@{}", filter.path().display());

    let conn = run(&[
        "list",
        "providers",
        "--fixtures",
        fixtures.path().to_str().unwrap(),
        &filter_arg,
        "--near",
        "--first",
        "3",
    ])
    .await
    .unwrap();

    let names: Vec<&str> = conn["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["node"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mitte", "Kreuzberg", "Spandau"]);
    assert_eq!(conn["pageInfo"]["endCursor"], json!("4.5"));
    assert_eq!(conn["totalCount"], json!(4));
}

#[tokio::test]
async fn test_list_rejects_mismatched_pagination() {
    let fixtures = fixture_file();
    let path = fixtures.path().to_str().unwrap();

    assert!(run(&["list", "bookings", "--fixtures", path, "--page", "2"]).await.is_err());
    assert!(run(&["list", "customers", "--fixtures", path, "--first", "2"]).await.is_err());
}

#[tokio::test]
async fn test_list_reports_missing_fixtures() {
    let err = run(&["list", "customers", "--fixtures", "/nonexistent/fixtures.json"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read fixtures"));
}

#[tokio::test]
async fn test_help() {
    let output = cli::run(Command::Help, &Config::default()).await.unwrap();
    assert!(output.starts_with("Usage:"));
}
