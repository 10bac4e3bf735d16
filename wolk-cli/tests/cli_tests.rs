use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SGXRAENCLAVE_DIGEST: &str =
    "8E50E33484683BCF17591E95D7D391807D80024C7E7B7E4960D9A377BCB72EA9";

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("enclave.signed.so"), b"wolk enclave image").unwrap();
    dir
}

fn wolk(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wolk").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").env_remove("WOLK_ENCLAVE");
    cmd
}

#[test]
fn test_digest_reference_vector() {
    let dir = workspace();
    wolk(dir.path())
        .args(["digest", "SGXRAENCLAVE"])
        .assert()
        .success()
        .stdout(predicate::str::contains(SGXRAENCLAVE_DIGEST));
}

#[test]
fn test_digest_file() {
    let dir = workspace();
    fs::write(dir.path().join("input.txt"), b"SGXRAENCLAVE").unwrap();
    wolk(dir.path())
        .args(["digest", "--file", "input.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains(SGXRAENCLAVE_DIGEST));
}

#[test]
fn test_missing_enclave_image() {
    let dir = TempDir::new().unwrap();
    wolk(dir.path())
        .args(["--enclave", "absent.so", "digest", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load enclave"));
}

#[test]
fn test_seal_unseal_through_store() {
    let dir = workspace();
    fs::write(dir.path().join("secret.txt"), b"wallet seed words").unwrap();

    wolk(dir.path())
        .args([
            "--store", "vault", "seal", "--input", "secret.txt", "--output", "seed", "--label",
            "cold",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("sealed 17 bytes into seed"));

    assert!(dir.path().join("vault/seed.sealed").is_file());
    let sidecar = fs::read_to_string(dir.path().join("vault/seed.sealed.json")).unwrap();
    assert!(sidecar.contains("\"plaintext_len\": 17"));

    wolk(dir.path())
        .args(["--store", "vault", "unseal", "--name", "seed", "--output", "out.txt"])
        .assert()
        .success();
    assert_eq!(
        fs::read(dir.path().join("out.txt")).unwrap(),
        b"wallet seed words"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(dir.path().join("out.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_unseal_tampered_blob_fails() {
    let dir = workspace();
    fs::write(dir.path().join("secret.txt"), b"do not touch").unwrap();

    wolk(dir.path())
        .args(["seal", "--input", "secret.txt", "--output", "s"])
        .assert()
        .success();

    let blob_path = dir.path().join("sealed/s.sealed");
    let mut blob = fs::read(&blob_path).unwrap();
    let last = blob.len() - 1;
    blob[last] ^= 0xFF;
    fs::write(&blob_path, blob).unwrap();

    wolk(dir.path())
        .args(["unseal", "--name", "s", "--output", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity check failed"));
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn test_keygen_sign_verify() {
    let dir = workspace();
    let output = wolk(dir.path()).arg("keygen").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let field = |prefix: &str| {
        stdout
            .lines()
            .find_map(|line| line.strip_prefix(prefix))
            .map(|value| value.trim().to_string())
            .unwrap()
    };
    let private_key = field("private:");
    let public_key = field("public:");
    assert_eq!(private_key.len(), 64);
    assert_eq!(public_key.len(), 128);

    let output = wolk(dir.path())
        .args(["sign", "--key", &private_key, "--message", "hello"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let signature = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert_eq!(signature.len(), 128);

    wolk(dir.path())
        .args([
            "verify",
            "--public",
            &public_key,
            "--signature",
            &signature,
            "--message",
            "hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    wolk(dir.path())
        .args([
            "verify",
            "--public",
            &public_key,
            "--signature",
            &signature,
            "--message",
            "hullo",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signature does not verify"));
}

#[test]
fn test_sign_rejects_short_key() {
    let dir = workspace();
    wolk(dir.path())
        .args(["sign", "--key", "ABCD", "--message", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signing failed"));
}

#[test]
fn test_config_file_is_used() {
    let dir = workspace();
    fs::write(dir.path().join("custom.so"), b"custom image").unwrap();
    fs::write(
        dir.path().join("wolk.toml"),
        "[enclave]\nimage_path = \"custom.so\"\n\n[memory]\nregion_size = 2\n",
    )
    .unwrap();

    wolk(dir.path())
        .args(["digest", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("region_size"));
}

#[test]
fn test_seal_file_larger_than_default_region() {
    let dir = workspace();
    let payload: Vec<u8> = (0..600 * 1024).map(|i| (i % 251) as u8).collect();
    fs::write(dir.path().join("big.bin"), &payload).unwrap();

    wolk(dir.path())
        .args(["seal", "--input", "big.bin", "--output", "big"])
        .assert()
        .success();
    wolk(dir.path())
        .args(["unseal", "--name", "big", "--output", "big.out"])
        .assert()
        .success();
    assert_eq!(fs::read(dir.path().join("big.out")).unwrap(), payload);
}
