use std::env;
use std::process::Command;

fn main() {
    for var in ["DRIFTFALL_BUILD", "GITHUB_SHA", "CARGO_ENCODED_RUSTFLAGS"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let build_id = env::var("DRIFTFALL_BUILD")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(target_label);
    println!("cargo:rustc-env=DRIFTFALL_BUILD={build_id}");

    let sha = git_head()
        .or_else(|| env::var("GITHUB_SHA").ok())
        .and_then(|s| short_hex(&s))
        .unwrap_or_default();
    println!("cargo:rustc-env=DRIFTFALL_GIT_SHA={sha}");
}

fn git_head() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok()
}

fn short_hex(raw: &str) -> Option<String> {
    let s = raw.trim();
    let short = &s[..s.len().min(7)];
    if short.is_empty() || !short.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(short.to_ascii_lowercase())
}

fn target_label() -> String {
    let os = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") => "darwin".to_string(),
        Ok(other) => other.to_string(),
        Err(_) => "unknown".to_string(),
    };
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "unknown".to_string());
    let features = env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();

    // x86_64 builds carry their micro-architecture level, everything else is native
    if arch == "x86_64" && os == "linux" {
        let level = if features.contains("avx512f") {
            "v4"
        } else if features.contains("avx2") {
            "v3"
        } else if features.contains("sse4.2") {
            "v2"
        } else {
            "v1"
        };
        format!("{os}-{arch}-{level}")
    } else if arch == "x86_64" {
        format!("{os}-{arch}")
    } else {
        format!("{os}-{arch}-native")
    }
}
