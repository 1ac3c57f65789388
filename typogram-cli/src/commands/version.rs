//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("Typogram - ASCII diagrams to SVG through WebAssembly");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!(
        "URL modules: {}",
        if cfg!(feature = "http") { "enabled" } else { "disabled" }
    );
    println!();
    println!("Components:");
    println!("  typogram-core    Guest memory model, string codec, call adapter");
    println!("  typogram-bridge  Wasmtime host, module loader, document renderer");
    println!("  typogram-cli     Command-line interface");

    Ok(())
}
