use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("mindsprout-cli"));
    cmd.env_remove("MINDSPROUT_LOG");
    cmd
}

#[test]
fn offline_generate_prints_svg() {
    let output = cli()
        .args(["--offline", "Plan", "a", "trip"])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let svg = String::from_utf8(output.stdout).expect("utf-8 svg");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(">Plan a trip</tspan>"));
    assert!(svg.contains("section-root"));
}

#[test]
fn offline_generate_writes_json_model_with_expansion() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("trip.json");

    cli()
        .args([
            "generate",
            "--offline",
            "--stable-ids",
            "--expand",
            "Test and debug",
            "--format",
            "json",
            "--out",
            out.to_string_lossy().as_ref(),
            "Plan a trip",
        ])
        .assert()
        .success();

    let model: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read json")).expect("json");
    let nodes = model["nodes"].as_array().expect("nodes");
    let edges = model["edges"].as_array().expect("edges");
    assert_eq!(nodes[0]["id"], "node-1");
    assert_eq!(nodes[0]["label"], "Plan a trip");
    assert_eq!(edges.len(), nodes.len() - 1);
    assert!(
        nodes
            .iter()
            .any(|n| n["label"] == "Define test criteria for Test and debug")
    );
}

#[test]
fn offline_generate_renders_png() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("trip.png");

    cli()
        .args([
            "--offline",
            "--format",
            "png",
            "--out",
            out.to_string_lossy().as_ref(),
            "Plan a trip",
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );
}

#[test]
fn raster_output_defaults_to_a_slug_path() {
    let tmp = tempfile::tempdir().expect("tempdir");

    cli()
        .current_dir(tmp.path())
        .args(["--offline", "--format", "pdf", "Launch a Podcast!"])
        .assert()
        .success();

    let bytes = fs::read(tmp.path().join("launch-a-podcast.pdf")).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn offline_subtopics_prints_a_json_list() {
    let output = cli()
        .args(["subtopics", "--offline", "Design", "the", "logo"])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let list: Vec<String> = serde_json::from_slice(&output.stdout).expect("json list");
    assert_eq!(list.len(), 5);
    assert_eq!(list[0], "Research best practices for Design the logo");
}

#[test]
fn usage_errors_exit_with_two() {
    cli().assert().failure().code(2);
    cli().args(["--format", "gif", "x"]).assert().failure().code(2);
}

#[test]
fn unknown_expand_label_exits_with_three() {
    cli()
        .args(["--offline", "--expand", "Nope", "Plan a trip"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn unreachable_backend_exits_with_one() {
    cli()
        .args([
            "--backend",
            "http://127.0.0.1:9",
            "--timeout-ms",
            "2000",
            "Plan a trip",
        ])
        .assert()
        .failure()
        .code(1);
}
