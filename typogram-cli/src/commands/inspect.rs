//! Inspect command - load a module and report its state.

use anyhow::Result;
use typogram_bridge::BridgeConfig;
use typogram_bridge::wasm::{WASM_PAGE_SIZE, WasmGuest};

/// Run the inspect command.
pub async fn run(config: BridgeConfig, module: &str) -> Result<()> {
    let abi = config.abi.clone();
    let converter = super::load_converter(config, module).await?;
    let info = converter.info()?;

    let (pages, realloc) = converter.with_guest(|guest: &mut WasmGuest| {
        let realloc = abi
            .realloc
            .as_deref()
            .map(|name| (name.to_string(), guest.has_func(name)));
        (guest.memory_pages(), realloc)
    });

    println!("Module: {}", converter.name());
    println!("========{}", "=".repeat(converter.name().len()));
    println!();
    println!("Memory:");
    println!("  Pages:          {}", pages);
    println!("  Bytes:          {}", info.memory_bytes);
    println!("  Page size:      {}", WASM_PAGE_SIZE);
    println!();
    println!("Shadow stack:");
    println!("  Global:         {}", abi.stack_pointer);
    println!("  Cursor:         0x{:08x}", info.stack_pointer);
    println!();
    println!("Exports:");
    println!("  ✓ {}", abi.memory);
    println!("  ✓ {}", abi.malloc);
    println!("  ✓ {}", abi.free);
    println!("  ✓ {}", abi.convert);
    match realloc {
        Some((name, true)) => println!("  ✓ {}", name),
        Some((name, false)) => println!("  - {} (not exported)", name),
        None => println!("  - realloc (disabled by configuration)"),
    }
    println!();
    println!("Encoding strategy: {:?}", info.strategy);

    Ok(())
}
