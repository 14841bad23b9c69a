use std::env;
use std::fs;
use std::io;
use std::path::Path;

/// Helper function to check if debug logging is enabled
pub fn is_debug_enabled() -> bool {
    env::var("RUST_LOG")
        .map(|val| val.to_lowercase() == "debug")
        .unwrap_or(false)
}

/// Debug print function that only prints when RUST_LOG=debug
pub fn debug_println(args: std::fmt::Arguments) {
    if is_debug_enabled() {
        println!("{}", args);
    }
}

/// Prints a warning to stderr
pub fn warn_println(args: std::fmt::Arguments) {
    eprintln!("WARNING: {}", args);
}

/// Creates a directory (and parents) if it does not exist yet
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// File stem of a path as an owned string, e.g. `frame_0001` for `train/frame_0001.png`
pub fn file_stem_string(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
