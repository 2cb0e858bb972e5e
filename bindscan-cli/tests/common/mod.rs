#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Two-position matrix matching `AT`
pub const AT_PFM: &str = "pos\tA\tC\tG\tT\n1\t1.0\t0.0\t0.0\t0.0\n2\t0.0\t0.0\t0.0\t1.0\n";

/// Single-filter model detecting `G`, with a raw (regression) output
pub const G_MODEL: &str = r#"{
  "filters": [{ "weights": [[0, 0, 1, 0]] }],
  "readout": [1.0],
  "output": "regression"
}"#;

/// Writes `records` as a FASTA file in `dir`
pub fn write_fasta(dir: &Path, records: &[(&str, &str)]) -> PathBuf {
    let path = dir.join("input.fa");
    let content: String = records
        .iter()
        .map(|(id, seq)| format!(">{}\n{}\n", id, seq))
        .collect();
    fs::write(&path, content).unwrap();
    path
}

/// Model directory holding one `.pfm` file per `(id, content)` pair
pub fn write_pfm_models(dir: &Path, models: &[(&str, &str)]) -> PathBuf {
    let models_dir = dir.join("pfms");
    fs::create_dir_all(&models_dir).unwrap();
    for (id, content) in models {
        fs::write(models_dir.join(format!("{}.pfm", id)), content).unwrap();
    }
    models_dir
}

/// Model directory holding one `model.json` subdirectory per `(id, content)`
pub fn write_json_models(dir: &Path, models: &[(&str, &str)]) -> PathBuf {
    let models_dir = dir.join("models");
    for (id, content) in models {
        let sub = models_dir.join(id);
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("model.json"), content).unwrap();
    }
    models_dir
}

/// Runs bindscan with `args` and returns its stdout
pub fn run_bindscan(input: &Path, models: &Path, args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("bindscan").unwrap();
    cmd.arg("-i").arg(input).arg("-m").arg(models).arg("-q");
    cmd.args(args);
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}
