fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    #[cfg(target_os = "windows")]
    {
        // 版本资源：资源管理器“详细信息”页中显示
        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "marquis")
            .set("FileDescription", "marquis editor launcher")
            .set("InternalName", "marquis_runner");
        if let Err(e) = res.compile() {
            println!("cargo:warning=failed to embed version resource: {e}");
        }
    }
}
