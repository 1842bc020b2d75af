#![cfg(feature = "cli")]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const HEXSPLICE_EXE: &str = env!("CARGO_BIN_EXE_hexsplice");

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|b| (b % 256) as u8).collect()
}

fn setup(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file = dir.path().join("data.bin");
    fs::write(&file, bytes).expect("Failed to write file");
    (dir, file)
}

fn run(data_root: &Path, args: &[&str]) -> Output {
    Command::new(HEXSPLICE_EXE)
        .args(args)
        .args(["--data-root", &data_root.to_string_lossy(), "--yes"])
        .output()
        .expect("Failed to run hexsplice")
}

fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_hexsplice_shows_help() {
    for flag in ["help", "--help", "-h"] {
        // Act
        let output = Command::new(HEXSPLICE_EXE)
            .arg(flag)
            .output()
            .expect("Failed to run hexsplice");

        // Assert
        let stdout = assert_success(&output);
        assert!(
            stdout.contains("Usage"),
            "stdout did not look like help text:\n{stdout}"
        );
    }
}

#[test]
fn test_hexsplice_unknown_command_fails() {
    // Act
    let output = Command::new(HEXSPLICE_EXE)
        .arg("frobnicate")
        .output()
        .expect("Failed to run hexsplice");

    // Assert
    assert!(!output.status.success());
}

#[test]
fn test_hexsplice_info() {
    // Arrange
    let (dir, file) = setup(&ramp(1234));

    // Act
    let output = run(dir.path(), &["info", &file.to_string_lossy()]);

    // Assert
    let stdout = assert_success(&output);
    assert!(
        stdout.contains("1,234 bytes") && stdout.contains("in-memory"),
        "stdout did not look like info text:\n{stdout}"
    );
}

#[test]
fn test_hexsplice_info_missing_file() {
    // Arrange
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.bin");

    // Act
    let output = run(dir.path(), &["info", &missing.to_string_lossy()]);

    // Assert
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("File not found"),
        "stderr did not contain expected error text:\n{stderr}"
    );
}

#[test]
fn test_hexsplice_view_prints_page() {
    // Arrange
    let (dir, file) = setup(b"Hello, hex world");

    // Act
    let output = run(dir.path(), &["view", &file.to_string_lossy()]);

    // Assert
    let stdout = assert_success(&output);
    assert!(
        stdout.contains("00000000  48 65 6C 6C 6F") && stdout.contains("Hello, hex world"),
        "stdout did not look like a page dump:\n{stdout}"
    );
}

#[test]
fn test_hexsplice_write_then_read() {
    // Arrange
    let (dir, file) = setup(&[0; 8]);
    let path = file.to_string_lossy().into_owned();

    // Act
    let write = run(
        dir.path(),
        &["write", &path, "--offset", "0x2", "--type", "u16", "--value", "0xBEEF", "--big-endian"],
    );
    let read = run(
        dir.path(),
        &["read", &path, "--offset", "2", "--type", "uint16_t", "--big-endian"],
    );

    // Assert
    assert_success(&write);
    let stdout = assert_success(&read);
    assert!(
        stdout.contains("0x00000002: 0xBEEF"),
        "stdout did not contain the written value:\n{stdout}"
    );
    assert_eq!(fs::read(&file).ok(), Some(vec![0, 0, 0xBE, 0xEF, 0, 0, 0, 0]));
}

#[test]
fn test_hexsplice_read_out_of_bounds_fails() {
    // Arrange
    let (dir, file) = setup(&[0; 4]);

    // Act
    let output = run(
        dir.path(),
        &["read", &file.to_string_lossy(), "--offset", "2", "--type", "u32"],
    );

    // Assert
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error:"),
        "stderr did not contain expected error text:\n{stderr}"
    );
}

#[test]
fn test_hexsplice_insert_and_remove() {
    // Arrange
    let (dir, file) = setup(&ramp(0x40));
    let path = file.to_string_lossy().into_owned();

    // Act
    let insert = run(
        dir.path(),
        &["insert", &path, "--offset", "0x10", "--size", "0x4", "--fill", "0xEE"],
    );
    let after_insert = fs::read(&file).ok();
    let remove = run(dir.path(), &["remove", &path, "--offset", "0x10", "--size", "4"]);

    // Assert
    let stdout = assert_success(&insert);
    assert!(
        stdout.contains("Inserted 0x4 bytes at 0x10"),
        "stdout did not look like insert output:\n{stdout}"
    );
    let mut expected = ramp(0x40);
    expected.splice(0x10..0x10, [0xEE; 4]);
    assert_eq!(after_insert, Some(expected));

    assert_success(&remove);
    assert_eq!(fs::read(&file).ok(), Some(ramp(0x40)));
}

#[test]
fn test_hexsplice_search_modes() {
    // Arrange
    let (dir, file) = setup(b"..HERO..hero..HERO");
    let path = file.to_string_lossy().into_owned();

    // Act
    let hex = run(dir.path(), &["search", &path, "48 45 52 4F"]);
    let text = run(dir.path(), &["search", &path, "hero", "--text"]);
    let regex = run(dir.path(), &["search", &path, "(?i)hero", "--regex"]);

    // Assert
    let stdout = assert_success(&hex);
    assert!(stdout.contains("0x00000002") && stdout.contains("0x0000000E"));
    assert!(stdout.contains("2 match(es)"), "unexpected hex search output:\n{stdout}");

    let stdout = assert_success(&text);
    assert!(stdout.contains("0x00000008") && stdout.contains("1 match(es)"));

    let stdout = assert_success(&regex);
    assert!(stdout.contains("3 match(es)"), "unexpected regex search output:\n{stdout}");
}

#[test]
fn test_hexsplice_compare() {
    // Arrange
    let (dir, file) = setup(&[1, 2, 3, 4]);
    let other = dir.path().join("other.bin");
    fs::write(&other, [1, 9, 3, 4, 5]).expect("Failed to write file");

    // Act
    let output = run(
        dir.path(),
        &["compare", &file.to_string_lossy(), &other.to_string_lossy()],
    );

    // Assert
    let stdout = assert_success(&output);
    assert!(
        stdout.contains("0x00000001: 02 -> 09")
            && stdout.contains("1 difference(s)")
            && stdout.contains("Sizes differ"),
        "stdout did not look like compare output:\n{stdout}"
    );
}

#[test]
fn test_hexsplice_dump_and_inject() {
    // Arrange
    let (dir, file) = setup(&ramp(0x20));
    let path = file.to_string_lossy().into_owned();
    let dump = dir.path().join("dump.bin");
    let dump_str = dump.to_string_lossy().into_owned();

    // Act
    let dumped = run(
        dir.path(),
        &["dump", &path, &dump_str, "--offset", "0x18", "--size", "0x8"],
    );
    let injected = run(dir.path(), &["inject", &path, &dump_str, "--offset", "0"]);

    // Assert
    assert_success(&dumped);
    assert_success(&injected);
    assert_eq!(fs::read(&dump).ok(), Some(ramp(0x20)[0x18..].to_vec()));

    let mut expected = ramp(0x20);
    expected.copy_within(0x18..0x20, 0);
    assert_eq!(fs::read(&file).ok(), Some(expected));
}

#[test]
fn test_hexsplice_view_jumps_to_label() {
    // Arrange
    let (dir, file) = setup(b"Hello, hex world");
    let labels_dir = dir.path().join("labels");
    fs::create_dir_all(&labels_dir).expect("Failed to create labels dir");
    fs::write(
        labels_dir.join("greeting.json"),
        r#"{ "Name": { "ofs": "0xB", "size": 5 } }"#,
    )
    .expect("Failed to write labels");

    // Act
    let output = run(
        dir.path(),
        &["view", &file.to_string_lossy(), "--labels", "greeting", "--label", "Name"],
    );

    // Assert
    let stdout = assert_success(&output);
    assert!(
        stdout.contains("Offset:   0xB") && stdout.contains("Unsigned: 119"),
        "stdout did not show the labelled byte:\n{stdout}"
    );
}
