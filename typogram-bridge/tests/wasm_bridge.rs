//! Integration tests for the Wasmtime bridge.
//!
//! Guests are written in WAT: a bump allocator that grows memory on demand,
//! a `live` global counting outstanding blocks, and a conversion function
//! whose behaviour varies per test.

use std::io::Write;
use std::sync::Arc;
use typogram_bridge::wasm::{
    AbiConfig, Converter, ModuleLoader, ModuleSource, WasmGuest, WasmRuntimeConfig,
};
use typogram_bridge::{BridgeConfig, render_document};
use typogram_core::EncodeStrategy;

const STACK_TOP: u32 = 1024;

/// Echo the input into a fresh block.
const ECHO: &str = r#"
    (func (export "convert_string") (param $ret i32) (param $ptr i32) (param $len i32)
        (local $out i32)
        local.get $len
        call $malloc
        local.set $out
        local.get $out
        local.get $ptr
        local.get $len
        memory.copy
        local.get $ptr
        local.get $len
        call $free
        local.get $ret
        local.get $out
        i32.store
        local.get $ret
        local.get $len
        i32.store offset=4)
"#;

/// Grow memory by one page, then echo.
const GROWING_ECHO: &str = r#"
    (func (export "convert_string") (param $ret i32) (param $ptr i32) (param $len i32)
        (local $out i32)
        i32.const 1
        memory.grow
        drop
        local.get $len
        call $malloc
        local.set $out
        local.get $out
        local.get $ptr
        local.get $len
        memory.copy
        local.get $ptr
        local.get $len
        call $free
        local.get $ret
        local.get $out
        i32.store
        local.get $ret
        local.get $len
        i32.store offset=4)
"#;

/// Return a single 0xFF byte.
const INVALID_UTF8: &str = r#"
    (func (export "convert_string") (param $ret i32) (param $ptr i32) (param $len i32)
        (local $out i32)
        i32.const 1
        call $malloc
        local.set $out
        local.get $out
        i32.const 0xFF
        i32.store8
        local.get $ptr
        local.get $len
        call $free
        local.get $ret
        local.get $out
        i32.store
        local.get $ret
        i32.const 1
        i32.store offset=4)
"#;

/// Never return.
const SPIN: &str = r#"
    (func (export "convert_string") (param $ret i32) (param $ptr i32) (param $len i32)
        (loop $spin
            br $spin))
"#;

fn guest_wat(with_realloc: bool, convert: &str) -> String {
    let realloc = if with_realloc {
        r#"
    (func (export "__wbindgen_realloc") (param $ptr i32) (param $old i32) (param $new i32) (result i32)
        (local $dst i32)
        local.get $new
        call $malloc
        local.set $dst
        local.get $dst
        local.get $ptr
        local.get $old
        local.get $new
        local.get $old
        local.get $new
        i32.lt_u
        select
        memory.copy
        global.get $live
        i32.const 1
        i32.sub
        global.set $live
        local.get $dst)
"#
    } else {
        ""
    };

    format!(
        r#"
(module
    (memory (export "memory") 1)
    (global $sp (export "__wbindgen_export_0") (mut i32) (i32.const {STACK_TOP}))
    (global $heap (mut i32) (i32.const {STACK_TOP}))
    (global $live (export "live") (mut i32) (i32.const 0))

    (func $malloc (export "__wbindgen_malloc") (param $size i32) (result i32)
        (local $ptr i32)
        (local $end i32)
        global.get $heap
        local.set $ptr
        local.get $ptr
        local.get $size
        i32.const 1
        local.get $size
        i32.const 1
        i32.ge_u
        select
        i32.add
        i32.const 7
        i32.add
        i32.const -8
        i32.and
        local.set $end
        (block $done
            (loop $grow
                local.get $end
                memory.size
                i32.const 16
                i32.shl
                i32.le_u
                br_if $done
                i32.const 1
                memory.grow
                i32.const -1
                i32.eq
                if
                    unreachable
                end
                br $grow))
        local.get $end
        global.set $heap
        global.get $live
        i32.const 1
        i32.add
        global.set $live
        local.get $ptr)

    (func $free (export "__wbindgen_free") (param $ptr i32) (param $size i32)
        global.get $live
        i32.const 1
        i32.sub
        global.set $live)
{realloc}
{convert}
)"#
    )
}

fn guest_bytes(with_realloc: bool, convert: &str) -> Vec<u8> {
    wat::parse_str(guest_wat(with_realloc, convert)).expect("Failed to parse WAT")
}

async fn load_with(config: BridgeConfig, with_realloc: bool, convert: &str) -> Converter {
    let loader = ModuleLoader::new(config).expect("Failed to create loader");
    loader
        .load(ModuleSource::bytes("test", guest_bytes(with_realloc, convert)))
        .await
        .expect("Failed to load module")
}

async fn load(with_realloc: bool, convert: &str) -> Converter {
    load_with(BridgeConfig::default(), with_realloc, convert).await
}

fn live_blocks(converter: &Converter) -> i32 {
    converter
        .with_guest(|guest: &mut WasmGuest| guest.global_i32("live"))
        .expect("Guest does not export 'live'")
}

#[tokio::test]
async fn echo_round_trips() {
    let converter = load(true, ECHO).await;

    for text in ["A->B", "é", "日本語", "", "🦀 +--+ 🦀", "line\nbreak\ttab"] {
        assert_eq!(converter.convert(text).unwrap(), text);
        assert_eq!(converter.stack_pointer().unwrap(), STACK_TOP);
        assert_eq!(live_blocks(&converter), 0);
    }
}

#[tokio::test]
async fn realloc_export_selects_optimistic_strategy() {
    let optimistic = load(true, ECHO).await;
    assert_eq!(optimistic.info().unwrap().strategy, EncodeStrategy::Optimistic);

    let fixed = load(false, ECHO).await;
    assert_eq!(fixed.info().unwrap().strategy, EncodeStrategy::Fixed);
    assert_eq!(fixed.convert("日本語").unwrap(), "日本語");
    assert_eq!(live_blocks(&fixed), 0);
}

#[tokio::test]
async fn realloc_can_be_disabled_by_config() {
    let config = BridgeConfig {
        abi: AbiConfig::default().without_realloc(),
        ..BridgeConfig::default()
    };
    let converter = load_with(config, true, ECHO).await;
    assert_eq!(converter.info().unwrap().strategy, EncodeStrategy::Fixed);
    assert_eq!(converter.convert("ü").unwrap(), "ü");
}

#[tokio::test]
async fn growth_during_call_is_observed() {
    let converter = load(true, GROWING_ECHO).await;
    let before = converter.info().unwrap().memory_bytes;

    assert_eq!(converter.convert("grow ✓").unwrap(), "grow ✓");
    assert_eq!(converter.convert("again").unwrap(), "again");

    let info = converter.info().unwrap();
    assert!(info.memory_bytes > before);
    assert!(info.generation >= 2);
    assert_eq!(info.stack_pointer, STACK_TOP);
}

#[tokio::test]
async fn large_input_grows_memory() {
    let converter = load(true, ECHO).await;
    let text = "ab→".repeat(40_000);

    assert_eq!(converter.convert(&text).unwrap(), text);
    assert!(converter.info().unwrap().memory_bytes > 64 * 1024);
    assert_eq!(live_blocks(&converter), 0);
}

#[tokio::test]
async fn invalid_output_is_recoverable() {
    let converter = load(true, INVALID_UTF8).await;

    for _ in 0..3 {
        let err = converter.convert("x").unwrap_err();
        assert_eq!(err.code(), "E301");
        assert_eq!(converter.stack_pointer().unwrap(), STACK_TOP);
    }
    assert!(!converter.is_poisoned());
    assert_eq!(live_blocks(&converter), 0);
}

#[tokio::test]
async fn memory_limit_trap_poisons_converter() {
    let config = BridgeConfig {
        runtime: WasmRuntimeConfig::default().with_max_memory_pages(1),
        ..BridgeConfig::default()
    };
    let converter = load_with(config, true, ECHO).await;
    let text = "x".repeat(70_000);

    let err = converter.convert(&text).unwrap_err();
    assert_eq!(err.code(), "E401");
    assert!(converter.is_poisoned());
    assert_eq!(converter.stack_pointer().unwrap(), STACK_TOP);

    let err = converter.convert("small").unwrap_err();
    assert_eq!(err.code(), "E402");
}

#[tokio::test]
async fn fuel_stops_runaway_guest() {
    let config = BridgeConfig {
        runtime: WasmRuntimeConfig::default().with_fuel(true, 100_000),
        ..BridgeConfig::default()
    };
    let converter = load_with(config, true, SPIN).await;

    let err = converter.convert("x").unwrap_err();
    assert_eq!(err.code(), "E401");
    assert_eq!(converter.stack_pointer().unwrap(), STACK_TOP);
}

#[tokio::test]
async fn load_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".wasm")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(&guest_bytes(true, ECHO))
        .expect("Failed to write module");

    let loader = ModuleLoader::with_defaults().expect("Failed to create loader");
    let converter = loader
        .load(ModuleSource::path(file.path()))
        .await
        .expect("Failed to load module");

    assert!(converter.name().ends_with(".wasm"));
    assert_eq!(converter.convert("file").unwrap(), "file");
}

#[tokio::test]
async fn loader_reuses_compiled_module() {
    let loader = ModuleLoader::with_defaults().expect("Failed to create loader");
    let bytes = guest_bytes(true, ECHO);

    let first = loader
        .load(ModuleSource::bytes("a", bytes.clone()))
        .await
        .expect("Failed to load module");
    let second = loader
        .load(ModuleSource::bytes("b", bytes))
        .await
        .expect("Failed to load module");

    assert_eq!(loader.runtime().cache_size(), 1);
    first.convert("one").unwrap();
    // Instances are independent even when the module is shared.
    assert_eq!(second.info().unwrap().calls, 0);
}

#[tokio::test]
async fn missing_convert_export_fails_to_load() {
    let loader = ModuleLoader::with_defaults().expect("Failed to create loader");
    let err = loader
        .load(ModuleSource::bytes("no-convert", guest_bytes(true, "")))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "E102");
    assert!(err.to_string().contains("convert_string"));
}

#[tokio::test]
async fn immutable_stack_pointer_fails_to_load() {
    let wat = guest_wat(true, ECHO).replace(
        "(global $sp (export \"__wbindgen_export_0\") (mut i32)",
        "(global $sp (export \"__wbindgen_export_0\") i32",
    );
    let bytes = wat::parse_str(wat).expect("Failed to parse WAT");

    let loader = ModuleLoader::with_defaults().expect("Failed to create loader");
    let err = loader
        .load(ModuleSource::bytes("const-sp", bytes))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E102");
}

#[tokio::test]
async fn unresolved_import_fails_to_load() {
    let bytes = wat::parse_str(r#"(module (import "env" "log" (func (param i32))))"#)
        .expect("Failed to parse WAT");

    let loader = ModuleLoader::with_defaults().expect("Failed to create loader");
    let err = loader
        .load(ModuleSource::bytes("imports", bytes))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E101");
}

#[tokio::test]
async fn renders_document_through_guest() {
    let converter = load(true, ECHO).await;
    let html = "<p>x</p><script type=\"text/typogram\">+-→-+</script>";

    let rendered = render_document(html, |source| converter.convert(source)).unwrap();
    assert_eq!(rendered.blocks, 1);
    assert_eq!(
        rendered.html,
        "<p>x</p><svg>+-→-+</svg><script type=\"text/typogram\">+-→-+</script>"
    );
}

#[tokio::test]
async fn shared_converter_across_tasks() {
    let converter = Arc::new(load(true, ECHO).await);

    let mut tasks = Vec::new();
    for t in 0..4 {
        let converter = Arc::clone(&converter);
        tasks.push(tokio::task::spawn_blocking(move || {
            for i in 0..20 {
                let text = format!("task {t} ─ {i}");
                assert_eq!(converter.convert(&text).unwrap(), text);
            }
        }));
    }
    for task in tasks {
        task.await.expect("Task panicked");
    }

    assert_eq!(converter.info().unwrap().calls, 80);
    assert_eq!(converter.stack_pointer().unwrap(), STACK_TOP);
    assert_eq!(live_blocks(&converter), 0);
}
