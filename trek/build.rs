use std::process::Command;

fn main() {
    let sha = env_or("TREK_GIT_SHA", || {
        git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string())
    });
    let tree_state = env_or("TREK_GIT_TREE_STATE", || {
        match git(&["status", "--porcelain"]) {
            Some(status) if status.is_empty() => "clean",
            Some(_) => "dirty",
            None => "unknown",
        }
        .to_string()
    });

    println!("cargo:rustc-env=TREK_GIT_SHA={sha}");
    println!("cargo:rustc-env=TREK_GIT_TREE_STATE={tree_state}");
    println!("cargo:rerun-if-env-changed=TREK_GIT_SHA");
    println!("cargo:rerun-if-env-changed=TREK_GIT_TREE_STATE");
}

/// Release builds may pin build info through the environment.
fn env_or(key: &str, f: impl FnOnce() -> String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(f)
}

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
