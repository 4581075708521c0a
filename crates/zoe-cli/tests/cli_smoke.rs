use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "zoe-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_zoe<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_zoe");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("zoe command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn swap_scenario(alice_proposed: Value, bob_proposed: Value) -> Value {
    json!({
        "assays": [
            { "description": "moola", "extentOps": { "name": "natExtentOps" } },
            { "description": "simoleans", "extentOps": { "name": "natExtentOps" } }
        ],
        "offers": [
            {
                "name": "alice",
                "payoutRules": [
                    { "kind": "offerExactly", "extent": { "nat": 3 } },
                    { "kind": "wantAtLeast", "extent": { "nat": 4 } }
                ],
                "current": [{ "nat": 3 }, { "nat": 0 }],
                "proposed": alice_proposed
            },
            {
                "name": "bob",
                "payoutRules": [
                    { "kind": "wantExactly", "extent": { "nat": 3 } },
                    { "kind": "offerAtMost", "extent": { "nat": 7 } }
                ],
                "current": [{ "nat": 0 }, { "nat": 7 }],
                "proposed": bob_proposed
            }
        ]
    })
}

fn write_json(path: &Path, payload: &Value) {
    let rendered = serde_json::to_string_pretty(payload).expect("scenario should serialize");
    fs::write(path, rendered).expect("scenario should be written");
}

#[test]
fn check_reallocation_accepts_a_matched_swap() {
    let tmp = TempDirGuard::new("swap-ok");
    let scenario = tmp.path().join("scenario.json");
    write_json(
        &scenario,
        &swap_scenario(
            json!([{ "nat": 0 }, { "nat": 7 }]),
            json!([{ "nat": 3 }, { "nat": 0 }]),
        ),
    );

    let output = run_zoe([
        OsStr::new("check-reallocation"),
        scenario.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["accepted"], json!(true));
    assert_eq!(payload["conserved"], json!(true));
    assert_eq!(payload["conservationViolation"], Value::Null);
    assert_eq!(payload["assays"], json!(["moola", "simoleans"]));
    assert_eq!(
        payload["offers"],
        json!([
            { "name": "alice", "refundOk": false, "winningsOk": true, "safe": true },
            { "name": "bob", "refundOk": false, "winningsOk": true, "safe": true }
        ])
    );
}

#[test]
fn check_reallocation_text_report_names_each_offer() {
    let tmp = TempDirGuard::new("swap-text");
    let scenario = tmp.path().join("scenario.json");
    write_json(
        &scenario,
        &swap_scenario(
            json!([{ "nat": 3 }, { "nat": 0 }]),
            json!([{ "nat": 0 }, { "nat": 7 }]),
        ),
    );

    let output = run_zoe([OsStr::new("check-reallocation"), scenario.as_os_str()]);
    assert_success(&output);

    let stdout = stdout_text(&output);
    assert!(stdout.contains("Rights conserved: yes"), "{stdout}");
    assert!(stdout.contains("Offer alice: safe (refund: yes, winnings: no)"), "{stdout}");
    assert!(stdout.contains("Offer bob: safe (refund: yes, winnings: no)"), "{stdout}");
    assert!(stdout.contains("Verdict: accepted"), "{stdout}");
}

#[test]
fn check_reallocation_rejects_an_unsafe_split() {
    let tmp = TempDirGuard::new("swap-unsafe");
    let scenario = tmp.path().join("scenario.json");
    write_json(
        &scenario,
        &swap_scenario(
            json!([{ "nat": 0 }, { "nat": 0 }]),
            json!([{ "nat": 3 }, { "nat": 7 }]),
        ),
    );

    let output = run_zoe([
        OsStr::new("check-reallocation"),
        scenario.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(1));

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["accepted"], json!(false));
    assert_eq!(payload["conserved"], json!(true));
    assert_eq!(payload["offers"][0]["safe"], json!(false));
    assert_eq!(payload["offers"][1]["safe"], json!(true));
}

#[test]
fn check_reallocation_rejects_minted_value() {
    let tmp = TempDirGuard::new("swap-mint");
    let scenario = tmp.path().join("scenario.json");
    write_json(
        &scenario,
        &swap_scenario(
            json!([{ "nat": 0 }, { "nat": 7 }]),
            json!([{ "nat": 3 }, { "nat": 1 }]),
        ),
    );

    let output = run_zoe([
        OsStr::new("check-reallocation"),
        scenario.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_failure(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["conserved"], json!(false));
    assert_eq!(payload["conservationViolation"], json!("assay 1: total 7 became 8"));
}

#[test]
fn check_reallocation_reports_malformed_scenarios() {
    let tmp = TempDirGuard::new("swap-bad");
    let scenario = tmp.path().join("scenario.json");
    let mut payload = swap_scenario(
        json!([{ "nat": 0 }, { "nat": 7 }]),
        json!([{ "nat": 3 }, { "nat": 0 }]),
    );
    payload["assays"][0]["extentOps"]["name"] = json!("bogusExtentOps");
    write_json(&scenario, &payload);

    let output = run_zoe([OsStr::new("check-reallocation"), scenario.as_os_str()]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("bogusExtentOps"));

    let missing = tmp.path().join("missing.json");
    let output = run_zoe([OsStr::new("check-reallocation"), missing.as_os_str()]);
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn quote_prints_the_pool_arithmetic() {
    let output = run_zoe([
        "quote",
        "--input",
        "5000",
        "--input-reserve",
        "100000",
        "--output-reserve",
        "100000",
    ]);
    assert_success(&output);
    insta::assert_snapshot!(stdout_text(&output).trim_end(), @r"
    zoe quote
      Input: 5000
      Reserves: 100000 in / 100000 out
      Fee: 15
      Tokens out: 4749
      New reserves: 105000 in / 95251 out
    ");
}

#[test]
fn quote_json_carries_the_fee_setting() {
    let output = run_zoe([
        "quote",
        "--input",
        "2",
        "--input-reserve",
        "10",
        "--output-reserve",
        "5",
        "--fee",
        "0",
        "--json",
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["feeInTenthOfPercent"], json!(0));
    assert_eq!(
        payload["quote"],
        json!({ "tokenOut": 1, "fee": 0, "newInputReserve": 12, "newOutputReserve": 4 })
    );
}

#[test]
fn quote_rejects_an_empty_pool() {
    let output = run_zoe([
        "quote",
        "--input",
        "10",
        "--input-reserve",
        "0",
        "--output-reserve",
        "5",
    ]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("reserves must be non-zero"));
}

#[test]
fn config_check_uses_defaults_without_a_file() {
    let output = run_zoe(["config-check", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["valid"], json!(true));
    assert_eq!(payload["configPath"], Value::Null);
    assert_eq!(
        payload["assays"],
        json!(["zoeEscrowReceipts", "zoeInvites", "zoePayoffs"])
    );
}

#[test]
fn config_check_reads_overrides_and_rejects_blanks() {
    let tmp = TempDirGuard::new("config");
    let good = tmp.path().join("zoe.toml");
    fs::write(&good, "inviteDescription = \"seats\"\n").expect("config should be written");

    let output = run_zoe([OsStr::new("config-check"), OsStr::new("--config"), good.as_os_str()]);
    assert_success(&output);
    let stdout = stdout_text(&output);
    assert!(stdout.contains("Invites: seats"), "{stdout}");
    assert!(stdout.contains("Escrow receipts: zoeEscrowReceipts"), "{stdout}");

    let blank = tmp.path().join("blank.toml");
    fs::write(&blank, "payoffDescription = \"\"\n").expect("config should be written");
    let output = run_zoe([OsStr::new("config-check"), OsStr::new("--config"), blank.as_os_str()]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("payoffDescription must not be empty"));
}
