use assert_cmd::prelude::*;
use serde_json::Value;
use std::process::Command;
use yx_client::codec::{Action, Name, PermissionLevel, Transaction, TransactionHeader};
use yx_client::crypto::{signing_digest, sha256};
use yx_client::{Bytes32, DigestSigner};

const DEV_WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
const DEV_PUBLIC_LEGACY: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("yx-cli"))
}

fn run_json(args: &[&str]) -> Value {
    let output = cli().arg("--json").args(args).output().expect("cli runs");
    assert!(output.status.success(), "cli failed: {:?}", output);
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

#[test]
fn name_encode_matches_known_values() {
    let out = run_json(&["name", "encode", "eosio"]);
    assert_eq!(out["value"].as_u64(), Some(6138663577826885632));

    cli()
        .args(["name", "encode", "yosemite"])
        .assert()
        .success()
        .stdout("17667807409747263488\n");
}

#[test]
fn name_decode_inverts_encode() {
    let out = run_json(&["name", "decode", "6138663591592764928"]);
    assert_eq!(out["name"], "eosio.token");
}

#[test]
fn name_encode_rejects_long_names() {
    cli()
        .args(["name", "encode", "thisnameistoolong"])
        .assert()
        .failure();
}

#[test]
fn key_public_derives_dev_key() {
    let out = run_json(&["key", "public", DEV_WIF]);
    assert_eq!(out["legacy"], DEV_PUBLIC_LEGACY);
    assert!(out["public_key"].as_str().unwrap().starts_with("PUB_K1_"));

    // Private material never reaches stdout
    let output = cli().args(["key", "public", DEV_WIF]).output().unwrap();
    assert!(!String::from_utf8_lossy(&output.stdout).contains(DEV_WIF));
}

#[test]
fn digest_matches_library() {
    let chain_id = Bytes32([0x42; 32]);
    let action = Action::new(
        Name::new("yx.ntoken").unwrap(),
        Name::new("transfer").unwrap(),
        vec![PermissionLevel::active(Name::new("alice").unwrap())],
        vec![1, 2, 3],
    );
    let header = TransactionHeader {
        expiration: 1_700_000_120,
        ref_block_num: 12,
        ref_block_prefix: 3456,
        ..Default::default()
    };
    let tx = Transaction::new(header, Vec::new(), vec![action], Vec::new());
    let packed = yx_client::codec::Packable::to_packed(&tx).unwrap();

    let out = run_json(&[
        "digest",
        "--chain-id",
        &chain_id.to_hex(),
        "--tx",
        &hex::encode(&packed),
    ]);

    let expected = DigestSigner::digest(&chain_id, &tx).unwrap();
    assert_eq!(expected.0, signing_digest(&chain_id, &packed, &[]));
    assert_eq!(out["digest"], expected.to_hex());
    assert_eq!(out["transaction_id"], hex::encode(sha256(&packed)));
}

#[test]
fn digest_rejects_short_chain_id() {
    cli()
        .args(["digest", "--chain-id", "abcd", "--tx", "00"])
        .assert()
        .failure();
}

#[test]
fn varint_encodes_leb128() {
    cli().args(["varint", "0"]).assert().success().stdout("00\n");
    cli().args(["varint", "300"]).assert().success().stdout("ac02\n");

    let out = run_json(&["varint", "127"]);
    assert_eq!(out["hex"], "7f");
}
