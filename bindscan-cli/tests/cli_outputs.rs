mod common;

use assert_cmd::Command;
use insta::assert_snapshot;
use tempfile::TempDir;

use crate::common::{AT_PFM, G_MODEL, run_bindscan, write_fasta, write_json_models, write_pfm_models};

// Hand-checked scan of a two-position matrix over two short sequences
#[test]
fn pfm_scan_tsv_snapshot() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "AATT"), ("s2", "CAT")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM)]);

    let output = run_bindscan(&input, &models, &[]);
    assert_snapshot!("pfm_scan_tsv", output.trim_end());
}

#[test]
fn pfm_scan_both_strands_json() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "AATT"), ("s2", "CAT")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM)]);

    let output = run_bindscan(&input, &models, &["--strand", "both", "--pmaps", "-f", "json"]);
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["ids"], serde_json::json!(["s1", "s2"]));
    assert_eq!(
        value["results"]["AT.pmaps"],
        serde_json::json!([[0.0, 0.0, 2.0, 0.0, 0.0], [0.0, 0.0, 2.0, 0.0]])
    );
    assert!(value["results"]["AT.direct"][0][0].is_null());
}

#[test]
fn isolation_does_not_change_output() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "AATT"), ("s2", "GATTACA")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM), ("TA", AT_PFM)]);

    let pooled = run_bindscan(&input, &models, &["--devices", "2"]);
    let sequential = run_bindscan(&input, &models, &["--no-isolation"]);
    assert_eq!(pooled, sequential);
    assert!(pooled.starts_with("id\tAT.avg\tAT.direct\tAT.max\tAT.sum\tTA.avg"));
}

#[test]
fn evaluable_model_direct_tsv() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("a", "GATTACA"), ("b", "TTTT")]);
    let models = write_json_models(dir.path(), &[("M1", G_MODEL)]);

    let output = run_bindscan(&input, &models, &[]);
    assert_eq!(output, "id\tM1\na\t1\nb\t0\n");
}

#[test]
fn evaluable_model_scan_with_attribution() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("a", "GATTACA")]);
    let models = write_json_models(dir.path(), &[("M1", G_MODEL)]);

    let output = run_bindscan(
        &input,
        &models,
        &["--scan", "3", "--pmaps", "--gmaps", "--finite-diff", "-f", "json"],
    );
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let results = &value["results"];
    assert_eq!(results["M1.pmaps"][0].as_array().unwrap().len(), 9);
    assert_eq!(results["M1.max"][0], 1.0);
    assert_eq!(results["M1.gmaps"][0]["sequence"], "GATTACA");
    assert_eq!(results["M1.gmaps"][0]["values"].as_array().unwrap().len(), 7);
}

#[test]
fn include_list_without_matches_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "AATT")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM)]);

    let mut cmd = Command::cargo_bin("bindscan").unwrap();
    cmd.arg("-i").arg(&input).arg("-m").arg(&models).args(["--include", "ZZZ"]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(output).unwrap();
    assert!(stderr.contains("Could not find any models"));
}

#[test]
fn finite_diff_requires_gmaps() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "AATT")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM)]);

    let mut cmd = Command::cargo_bin("bindscan").unwrap();
    cmd.arg("-i").arg(&input).arg("-m").arg(&models).arg("--finite-diff");
    cmd.assert().failure();
}

#[test]
fn invalid_sequence_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_fasta(dir.path(), &[("s1", "ACGX")]);
    let models = write_pfm_models(dir.path(), &[("AT", AT_PFM)]);

    let mut cmd = Command::cargo_bin("bindscan").unwrap();
    cmd.arg("-i").arg(&input).arg("-m").arg(&models);
    cmd.assert().failure();
}
