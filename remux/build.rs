use std::process::Command;

fn git(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default()
}

fn main() {
    // Inject git metadata for the version banner
    println!("cargo:rustc-env=GIT_COMMIT={}", git(&["rev-list", "-1", "HEAD"]));
    println!(
        "cargo:rustc-env=RELEASE_VERSION={}",
        git(&["describe", "--tags"])
    );
}
