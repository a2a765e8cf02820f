fn main() {
    // Shown by `issue --version`
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_DATE={}", built_at);
    println!("cargo:rerun-if-changed=build.rs");

    // Package version and git commit, logged at startup
    built::write_built_file().expect("Failed to acquire build-time information");
}
