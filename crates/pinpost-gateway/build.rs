use std::process::Command;

const SHA_VAR: &str = "PINPOST_GIT_SHA";

fn main() {
    // Container and tarball builds have no .git; let them pass the sha in.
    let sha = std::env::var(SHA_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(git_describe)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env={SHA_VAR}={sha}");
    println!("cargo:rerun-if-env-changed={SHA_VAR}");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/");
}

/// Short commit hash, suffixed `-dirty` when the tree has local edits.
fn git_describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}
