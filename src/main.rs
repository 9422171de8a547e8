//! cs-replay: drive one conn-stream through a sequence of operations.
//!
//! The conn-stream rides a pass-through connection. After the last
//! operation the final state of the conn-stream and of its connection is
//! printed, either as a flag line or as JSON.
//!
//! ```text
//! cs-replay attach-mux attach-strm shutw-normal error eos close detach-endp
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use cslayer::app::StreamId;
use cslayer::applet::{AppCtx, Applet};
use cslayer::config::{load_config, LayerConfig};
use cslayer::conn_stream::ConnStreamInfo;
use cslayer::mux::PassThroughMux;
use cslayer::net::{Connection, ConnectionState};
use cslayer::observability::{init_logging, metrics};
use cslayer::{ConnStreamTable, Endpoint, ShutReadMode, ShutWriteMode};

#[derive(Parser)]
#[command(name = "cs-replay")]
#[command(about = "Replay conn-stream operations against a pass-through connection", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,

    /// Operations, applied in order.
    #[arg(value_enum, required = true)]
    ops: Vec<Op>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Op {
    AttachMux,
    AttachApplet,
    AttachStrm,
    DetachEndp,
    DetachApp,
    Reset,
    ShutrDrain,
    ShutrReset,
    ShutwNormal,
    ShutwSilent,
    Close,
    DrainClose,
    Eos,
    Error,
    Free,
}

#[derive(Debug)]
struct ReplayApplet;

impl Applet for ReplayApplet {
    fn name(&self) -> &'static str {
        "<REPLAY>"
    }
}

#[derive(Serialize)]
struct Report {
    freed: bool,
    conn_stream: Option<ConnStreamInfo>,
    connection_state: ConnectionState,
    connection_drained: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LayerConfig::default(),
    };
    init_logging(&config.observability)?;
    metrics::set_enabled(config.observability.metrics_enabled);

    tracing::info!(
        max_conn_streams = config.table.max_conn_streams,
        ops = cli.ops.len(),
        "cs-replay starting"
    );

    let mux = Arc::new(PassThroughMux::new());
    let conn = Arc::new(Connection::new(Some(mux.clone())));
    let mut table = ConnStreamTable::new(&config.table);
    let id = table.new_cs(Endpoint::new())?;
    let mut next_stream = 1;
    let mut freed = false;

    for op in &cli.ops {
        if freed {
            tracing::warn!(op = ?op, "Conn-stream already freed, ignoring");
            continue;
        }
        if *op == Op::Free {
            match table.free(id) {
                Ok(()) => freed = true,
                Err(e) => tracing::warn!(error = %e, "free refused"),
            }
            continue;
        }

        let Some(cs) = table.get_mut(id) else {
            break;
        };
        match op {
            Op::AttachMux => {
                cs.attach_mux(Arc::new(()), conn.clone());
                mux.bind(id);
            }
            Op::AttachApplet => {
                let appctx = Arc::new(AppCtx::new(Arc::new(ReplayApplet)));
                cs.attach_applet(appctx, None);
            }
            Op::AttachStrm => {
                if let Err(e) = cs.attach_strm(StreamId::new(next_stream)) {
                    tracing::warn!(error = %e, "attach-strm refused");
                }
                next_stream += 1;
            }
            Op::DetachEndp => cs.detach_endp(),
            Op::DetachApp => cs.detach_app(),
            Op::Reset => {
                if let Err(e) = cs.reset_endp() {
                    tracing::warn!(error = %e, "reset refused");
                }
            }
            Op::ShutrDrain => cs.shut_read(ShutReadMode::Drain),
            Op::ShutrReset => cs.shut_read(ShutReadMode::Reset),
            Op::ShutwNormal => cs.shut_write(ShutWriteMode::Normal),
            Op::ShutwSilent => cs.shut_write(ShutWriteMode::Silent),
            Op::Close => cs.close(),
            Op::DrainClose => cs.drain_and_close(),
            Op::Eos => cs.set_eos(),
            Op::Error => cs.set_error(),
            // handled above, the table borrow is not held for it
            Op::Free => {}
        }
    }

    let report = Report {
        freed,
        conn_stream: table.get(id).map(|cs| cs.info()),
        connection_state: conn.state(),
        connection_drained: conn.is_drained(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.conn_stream {
            Some(info) => println!(
                "{} endp=[{}] app={} data={} conn={:?}",
                id, info.endpoint_flags, info.app, info.data, report.connection_state
            ),
            None => println!("{} freed conn={:?}", id, report.connection_state),
        }
    }

    Ok(())
}
