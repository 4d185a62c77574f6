use std::path::Path;
use std::process::Command;

// Embeds a build id for `tatrisk --version`. Release tarballs have no .git, so a
// preset TATRISK_BUILD_SHA wins over asking git.
fn main() {
    println!("cargo:rerun-if-env-changed=TATRISK_BUILD_SHA");

    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    let head = root.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let id = std::env::var("TATRISK_BUILD_SHA")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| git_describe(&root))
        .unwrap_or_else(|| "dev".to_string());

    println!("cargo:rustc-env=TATRISK_BUILD_SHA={id}");
}

fn git_describe(root: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    let id = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (out.status.success() && !id.is_empty()).then_some(id)
}
