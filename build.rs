use std::env;
use std::fs;
use std::path::Path;

// Pdfium is bound at runtime from the executable's directory or the system
// library path. On Windows we stage lib/pdfium.dll next to the binary when it
// is present; without it only the browser strategy can rasterize.
fn main() {
    println!("cargo:rerun-if-changed=lib/pdfium.dll");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" || env::var_os("CARGO_FEATURE_PDFIUM").is_none() {
        return;
    }

    let source_path = Path::new("lib/pdfium.dll");
    if !source_path.exists() {
        println!("cargo:warning=lib/pdfium.dll not found; pdf mode will need pdfium on the library path");
        return;
    }
    println!("cargo:rustc-env=PDFIUM_DLL_PATH={}", source_path.display());

    let Ok(out_dir) = env::var("OUT_DIR") else {
        return;
    };
    // Navigate up from OUT_DIR to find the target directory
    let Some(target_dir) = find_target_dir(Path::new(&out_dir)) else {
        return;
    };
    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    let dll_dest = target_dir.join(&profile).join("pdfium.dll");
    if dll_dest.exists() {
        return;
    }
    match fs::copy(source_path, &dll_dest) {
        Ok(_) => println!("cargo:warning=Copied pdfium.dll to: {:?}", dll_dest),
        Err(e) => println!("cargo:warning=Failed to copy DLL to output directory: {}", e),
    }
}

fn find_target_dir(mut path: &Path) -> Option<&Path> {
    loop {
        if path.file_name() == Some(std::ffi::OsStr::new("target")) {
            return Some(path);
        }
        path = path.parent()?;
    }
}
