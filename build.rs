// Version string for --version: package version plus the short git hash when available.
fn main() {
    let package_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let git_hash = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_owned())
        .filter(|hash| !hash.is_empty());

    let version = match git_hash {
        Some(hash) => format!("{package_version} ({hash})"),
        None => package_version,
    };
    println!("cargo:rustc-env=STARDUST_VERSION={version}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
