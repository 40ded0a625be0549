fn main() {
    // Version resource for the Windows binary
    #[cfg(windows)]
    {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        let file_version = format!(
            "{}.{}.{}.0",
            parts.first().unwrap_or(&"0"),
            parts.get(1).unwrap_or(&"0"),
            parts.get(2).unwrap_or(&"0")
        );

        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "tasklog")
            .set("FileDescription", "Structured task logging over stdio")
            .set("FileVersion", &file_version)
            .set("ProductVersion", version);

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to compile Windows resources: {}", e);
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
