use assert_cmd::Command;
use predicates::str::contains;

fn cli() -> Command {
    Command::cargo_bin("licensing-cli").unwrap()
}

#[test]
fn registered_creates_a_plaintext_keypair_then_finds_it_again() {
    let dir = tempfile::tempdir().unwrap();

    cli()
        .args(["-e", dir.path().to_str().unwrap(), "registered"])
        .assert()
        .success()
        .stdout(contains("registered a new keypair"))
        .stdout(contains("vk:"));

    cli()
        .args(["-e", dir.path().to_str().unwrap(), "registered"])
        .assert()
        .success()
        .stdout(contains("found existing keypair"));
}

#[test]
fn registered_with_no_registering_fails_when_nothing_found() {
    let dir = tempfile::tempdir().unwrap();

    cli()
        .args(["-e", dir.path().to_str().unwrap(), "registered", "--registering", "false"])
        .assert()
        .failure();
}

#[test]
fn check_reports_no_matching_license_without_contacting_dns() {
    let dir = tempfile::tempdir().unwrap();

    cli().args(["-e", dir.path().to_str().unwrap(), "registered"]).assert().success();

    cli()
        .args(["-e", dir.path().to_str().unwrap(), "check", "--no-confirm"])
        .assert()
        .success()
        .stdout(contains("no matching license"));
}

#[test]
fn check_with_no_local_keypairs_reports_that_plainly() {
    let dir = tempfile::tempdir().unwrap();

    cli()
        .args(["-e", dir.path().to_str().unwrap(), "check", "--no-confirm"])
        .assert()
        .success()
        .stdout(contains("no local keypairs found"));
}
