use crate::config::BinLogConfig;
use crate::event::{Event, EventRecord, NO_PLUGIN};
use crate::reader::{read_log_file, ParsedLog};
use crate::symbols::SymbolTable;
use crate::wire::Width;
use anyhow::Context;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Post-mortem inspection of binary execution traces
#[derive(Parser, Debug)]
#[command(name = "ambl", version, about = "Inspect binary execution trace files")]
pub struct Cli {
    /// Cell width in bytes of the runtime that wrote the trace (4 or 8);
    /// defaults to the configured `cell_width`
    #[arg(long, global = true)]
    pub cell_width: Option<u8>,

    /// Configuration file (defaults to ambl.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every event record with resolved symbol names
    Dump {
        file: PathBuf,
        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the plugin symbol table from the preamble
    Symbols { file: PathBuf },

    /// Per-opcode record counts and file health
    Stats { file: PathBuf },
}

pub fn run(cli: &Cli, config: &BinLogConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let cell = Width::from_byte("cell_width", cli.cell_width.unwrap_or(config.cell_width))?;

    match &cli.command {
        Commands::Dump { file, limit } => {
            let log = load(file, cell)?;
            let take = limit.unwrap_or(usize::MAX);
            if cli.json {
                let events: Vec<&EventRecord> = log.events.iter().take(take).collect();
                serde_json::to_writer_pretty(&mut *out, &events)?;
                writeln!(out)?;
            } else {
                for record in log.events.iter().take(take) {
                    writeln!(out, "{}", render_record(record, &log.preamble.symbols))?;
                }
                if log.truncated {
                    writeln!(out, "-- trailing bytes ignored after offset {} --", log.valid_len)?;
                }
            }
        }
        Commands::Symbols { file } => {
            let log = load(file, cell)?;
            let symbols = &log.preamble.symbols;
            if cli.json {
                serde_json::to_writer_pretty(&mut *out, symbols)?;
                writeln!(out)?;
            } else {
                for (id, plugin) in symbols.plugins.iter().enumerate() {
                    writeln!(out, "#{id} {} ({:?})", plugin.filename, plugin.status)?;
                    for (n, name) in plugin.natives.iter().enumerate() {
                        writeln!(out, "  native {n}: {name}")?;
                    }
                    for (n, name) in plugin.publics.iter().enumerate() {
                        writeln!(out, "  public {n}: {name}")?;
                    }
                }
            }
        }
        Commands::Stats { file } => {
            let log = load(file, cell)?;
            let counts = log.count_by_op();
            if cli.json {
                let by_op: serde_json::Map<String, serde_json::Value> = counts
                    .iter()
                    .map(|(op, n)| (op.name().to_string(), serde_json::json!(n)))
                    .collect();
                let report = serde_json::json!({
                    "plugins": log.preamble.symbols.len(),
                    "events": log.events.len(),
                    "valid_len": log.valid_len,
                    "truncated": log.truncated,
                    "by_op": by_op,
                });
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                writeln!(out, "plugins:   {}", log.preamble.symbols.len())?;
                writeln!(out, "events:    {}", log.events.len())?;
                writeln!(out, "truncated: {}", log.truncated)?;
                for (op, n) in counts {
                    writeln!(out, "  {op:<14} {n}")?;
                }
            }
        }
    }

    Ok(())
}

fn load(file: &Path, cell: Width) -> anyhow::Result<ParsedLog> {
    read_log_file(file, cell).with_context(|| format!("failed to read {}", file.display()))
}

/// One-line text form of a record.
pub fn render_record(record: &EventRecord, symbols: &SymbolTable) -> String {
    let when = DateTime::from_timestamp(record.wall_time, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| record.wall_time.to_string());
    let plugin = if record.plugin_id == NO_PLUGIN {
        "-".to_string()
    } else {
        symbols
            .plugin_name(record.plugin_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("plugin#{}", record.plugin_id))
    };
    let pid = record.plugin_id;

    let detail = match &record.event {
        Event::Start | Event::End => String::new(),
        Event::NativeCall {
            native_id,
            num_params,
        } => format!(
            "{} ({num_params} params)",
            symbols
                .native_name(pid, *native_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("native#{native_id}"))
        ),
        Event::NativeError { error, message } => format!("error {error}: {message:?}"),
        Event::NativeRet { value } => format!("= {value}"),
        Event::CallPubFunc { public_id } => symbols
            .public_name(pid, *public_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("public#{public_id}")),
        Event::SetLine { line } => format!("line {line}"),
        Event::Registered { title, version } => format!("{title:?} {version:?}"),
        Event::FormatString {
            param,
            max_len,
            result,
        } => format!("param {param} max {max_len} -> {result:?}"),
        Event::NativeParams { params } => format!("{params:?}"),
        Event::GetString { addr, value } => format!("{addr:#x} -> {value:?}"),
        Event::SetString {
            addr,
            max_len,
            value,
        } => format!("{addr:#x} max {max_len} <- {value:?}"),
    };

    format!(
        "[{when}] {:>10.3} {plugin} {}{}{}",
        record.game_time,
        record.op(),
        if detail.is_empty() { "" } else { " " },
        detail
    )
}
