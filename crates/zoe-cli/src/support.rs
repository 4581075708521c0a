use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn read_json_or_exit(path: &Path, what: &str) -> Value {
    let bytes = fs::read(path).unwrap_or_else(|err| {
        eprintln!("error: failed to read {what} file {}: {err}", path.display());
        std::process::exit(2);
    });
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        eprintln!("error: failed to parse {what} json {}: {err}", path.display());
        std::process::exit(2);
    })
}

pub fn print_json_or_exit(payload: &Value, command: &str) {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|err| {
        eprintln!("error: failed to render {command} json: {err}");
        std::process::exit(2);
    });
    println!("{rendered}");
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
