//! End-to-end: write a trace through the public API, read it back, render it.

use ambl::cli::{self, Cli};
use ambl::config::{load_config, BinLogConfig};
use ambl::log_dir::LogDirectory;
use ambl::preamble::encode_preamble;
use ambl::{
    read_log_file, BinLog, BinLogOp, Event, FixedClock, FormatWidths, PluginRecord,
    PluginStatus, PolicySettings, SymbolTable, TraceLevel, Width, NO_PLUGIN,
};
use clap::Parser;
use tempfile::TempDir;

fn loader() -> Vec<PluginRecord> {
    vec![
        PluginRecord::new("admin.amxx", PluginStatus::Running)
            .with_natives(["register_plugin", "get_user_name", "format"])
            .with_publics(["plugin_init", "client_putinserver"]),
        PluginRecord::new("stats.amxx", PluginStatus::Paused),
        PluginRecord::new("empty.amxx", PluginStatus::Stopped)
            .with_natives(Vec::<String>::new())
            .with_publics(Vec::<String>::new()),
    ]
}

fn write_session(dir: &LogDirectory) -> std::path::PathBuf {
    let mut log = BinLog::with_clock(
        PolicySettings {
            level: TraceLevel::ALL,
            max_size: 0,
        },
        FormatWidths::native(),
        FixedClock {
            wall: 1_700_000_000,
            game: 10.0,
        },
    );
    let path = log.open_next(dir, &loader()).unwrap();

    log.write_op(NO_PLUGIN, Event::Start);
    log.write_op(0, Event::call_pub_func(0));
    log.write_op(0, Event::native_call(0, 3));
    log.write_op(0, Event::native_params(vec![0x100, 0x200, 0x300]));
    log.write_op(0, Event::get_string(0x100, "Admin Base"));
    log.write_op(0, Event::registered("Admin Base", "1.10"));
    log.write_op(0, Event::native_ret(0));
    log.write_op(0, Event::native_call(2, 4));
    log.write_op(0, Event::format_string(2, 32, "Hello player"));
    log.write_op(0, Event::set_string(0x400, 31, "Hello player"));
    log.write_op(0, Event::native_error(10, "Invalid player id 33"));
    log.write_op(0, Event::set_line(57));
    log.write_op(NO_PLUGIN, Event::End);
    log.close();
    path
}

#[test]
fn full_session_reads_back_in_order() {
    let tmp = TempDir::new().unwrap();
    let dir = LogDirectory::new(tmp.path().join("binlogs"));
    let path = write_session(&dir);
    assert!(path.ends_with("binlog0001.blg"));

    let parsed = read_log_file(&path, FormatWidths::native().cell).unwrap();
    assert_eq!(parsed.preamble.symbols.plugins, loader());

    let ops: Vec<BinLogOp> = parsed.events.iter().map(|r| r.op()).collect();
    assert_eq!(
        ops,
        vec![
            BinLogOp::Start,
            BinLogOp::CallPubFunc,
            BinLogOp::NativeCall,
            BinLogOp::NativeParams,
            BinLogOp::GetString,
            BinLogOp::Registered,
            BinLogOp::NativeRet,
            BinLogOp::NativeCall,
            BinLogOp::FormatString,
            BinLogOp::SetString,
            BinLogOp::NativeError,
            BinLogOp::SetLine,
            BinLogOp::End,
        ]
    );
    assert_eq!(parsed.events[0].plugin_id, NO_PLUGIN);
    assert_eq!(
        parsed.events[3].event,
        Event::native_params(vec![0x100, 0x200, 0x300])
    );
}

#[test]
fn truncated_file_keeps_prefix() {
    let tmp = TempDir::new().unwrap();
    let dir = LogDirectory::new(tmp.path());
    let path = write_session(&dir);

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let parsed = read_log_file(&path, FormatWidths::native().cell).unwrap();
    assert!(parsed.truncated);
    assert_eq!(parsed.events.len(), 12);
    assert_eq!(parsed.events.last().unwrap().op(), BinLogOp::SetLine);
}

#[test]
fn cli_dump_and_stats() {
    let tmp = TempDir::new().unwrap();
    let dir = LogDirectory::new(tmp.path());
    let path = write_session(&dir);
    let file = path.to_str().unwrap();
    let config = BinLogConfig::default();

    let cli = Cli::parse_from(["ambl", "dump", file, "--limit", "3"]);
    let mut out = Vec::new();
    cli::run(&cli, &config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("admin.amxx call_pub_func plugin_init"));
    assert!(text.contains("native_call register_plugin (3 params)"));

    let cli = Cli::parse_from(["ambl", "stats", file, "--json"]);
    let mut out = Vec::new();
    cli::run(&cli, &config, &mut out).unwrap();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["events"], 13);
    assert_eq!(report["plugins"], 3);
    assert_eq!(report["by_op"]["native_call"], 2);
    assert_eq!(report["truncated"], false);

    let cli = Cli::parse_from(["ambl", "symbols", file]);
    let mut out = Vec::new();
    cli::run(&cli, &config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("#1 stats.amxx (Paused)"));
    assert!(text.contains("  public 1: client_putinserver"));
}

#[test]
fn cli_rejects_bad_cell_width() {
    let cli = Cli::parse_from(["ambl", "stats", "whatever.blg", "--cell-width", "3"]);
    let mut out = Vec::new();
    assert!(cli::run(&cli, &BinLogConfig::default(), &mut out).is_err());
}

#[test]
fn configured_session_applies_level_size_and_widths() {
    let tmp = TempDir::new().unwrap();
    let log_dir = tmp.path().join("traces");
    let plugins = vec![PluginRecord::new("admin.amxx", PluginStatus::Running)
        .with_natives(["register_plugin"])];

    let preamble_len =
        encode_preamble(&SymbolTable { plugins: plugins.clone() }, Width::Four).len() as u64;
    // header: op(1) + time(4) + game time(4) + plugin(4); native call payload: 8
    let native_call_len = 13 + 8;
    let max_size = preamble_len + 2 * native_call_len;

    let config_path = tmp.path().join("ambl.toml");
    std::fs::write(
        &config_path,
        format!(
            "log_dir = {:?}\nlevel = 1\nmax_size = {max_size}\ntime_width = 4\ncell_width = 4\n",
            log_dir.display().to_string()
        ),
    )
    .unwrap();
    let config = load_config(config_path.to_str()).unwrap();

    let (mut log, path) = BinLog::open_configured(&config, &plugins).unwrap();
    assert_eq!(path, log_dir.join("binlog0001.blg"));
    assert_eq!(log.policy().level, TraceLevel::DEFAULT);

    log.write_op(0, Event::set_line(10));
    log.write_op(0, Event::get_string(0x10, "skipped"));
    log.native_call(0, 0, 1);
    log.native_call(0, 0, 2);
    assert!(log.is_open());
    log.native_call(0, 0, 3);
    assert!(!log.is_open());

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, max_size);

    let parsed = read_log_file(&path, Width::Four).unwrap();
    assert_eq!(parsed.preamble.time_width, Width::Four);
    assert!(!parsed.truncated);
    assert_eq!(
        parsed.events.iter().map(|r| r.event.clone()).collect::<Vec<_>>(),
        vec![Event::native_call(0, 1), Event::native_call(0, 2)]
    );
    // real clock: game time counts up from the writer's construction
    assert!(parsed.events[0].game_time <= parsed.events[1].game_time);
    assert!(parsed.events[0].wall_time > 1_600_000_000);
}
