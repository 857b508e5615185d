use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!("output_dir: {}\n", dir.join("output").display());
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn declining_ends_the_program() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .args(["--quiet", "--config"])
        .arg(&config)
        .write_stdin("not a url\nnon\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entrez l'URL de la vidéo"))
        .stdout(predicate::str::contains("Voulez-vous extraire une autre vidéo"))
        .stderr(predicate::str::contains("Invalid URL"));

    assert!(!dir.path().join("output").exists());
}

#[test]
fn affirmative_answer_prompts_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .args(["--quiet", "--config"])
        .arg(&config)
        .write_stdin("ftp://example.com/a\nOUI\n\nnon\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Entrez l'URL").count(), 2);
}

#[test]
fn closed_stdin_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .args(["--quiet", "--config"])
        .arg(&config)
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn config_show_reflects_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .args(["config", "--show", "--config"])
        .arg(&config)
        .args(["--output-dir", "/srv/audio"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Output Directory: /srv/audio"))
        .stdout(predicate::str::contains("libmp3lame @ 192k"));
}

#[test]
fn config_template_is_yaml() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("affirmative: oui"))
        .stdout(predicate::str::contains("on_failure: continue"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("chapter-extractor")
        .unwrap()
        .current_dir(dir.path())
        .args(["--config", "missing.yaml"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
