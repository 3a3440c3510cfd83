//! 时隙级数据中心网络仿真
//!
//! `obm_sim run <topologyFile> <flowTraceFile> <logName> <endTimeslot>`
//!
//! 日志写到当前目录下的 `logs/`：
//! - `recvd-flows-<logName>.txt`：流完成记录（追加）
//! - `<host>-recvd-packets.txt`：每台主机的收包记录（覆盖）
//! - `drops-<logName>.txt`：交换机丢包记录（追加）
//! - `reordering-<logName>.txt`：乱序事件（追加，每次运行以 `@` 行结尾）

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use obm_sim_rs::error::Result;
use obm_sim_rs::net::{HostAddr, LogSinks, RunSummary};
use obm_sim_rs::sim::{FlowTrace, Timeslot};
use obm_sim_rs::topo::TopologySpec;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "obm_sim", about = "时隙级数据中心网络仿真：DT / ABM / OBM / LQD 缓冲管理 + DCTCP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 按拓扑和流量 trace 运行一次仿真
    Run {
        /// 拓扑描述 JSON
        topology: PathBuf,
        /// 流量 trace（首行为表头，每行 7 个字段）
        flowtrace: PathBuf,
        /// 日志文件名后缀
        log_name: String,
        /// 最多运行到该时隙
        end_timeslot: u64,
    },
}

const LOG_DIR: &str = "logs";

fn append(path: &Path) -> Result<Box<dyn Write + Send>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

fn run(topology: &Path, flowtrace: &Path, log_name: &str, end: Timeslot) -> Result<RunSummary> {
    let spec = TopologySpec::from_path(topology)?;
    let trace = FlowTrace::open(flowtrace)?;

    let logs = Path::new(LOG_DIR);
    fs::create_dir_all(logs)?;
    let sinks = LogSinks {
        flows: Some(append(&logs.join(format!("recvd-flows-{log_name}.txt")))?),
        drops: Some(append(&logs.join(format!("drops-{log_name}.txt")))?),
        reorders: Some(append(&logs.join(format!("reordering-{log_name}.txt")))?),
    };

    let mut net = spec.build()?.with_sinks(sinks);
    let linked: Vec<HostAddr> = net
        .hosts()
        .filter(|h| h.link().is_some())
        .map(|h| h.addr())
        .collect();
    for addr in linked {
        let file = File::create(logs.join(format!("{addr}-recvd-packets.txt")))?;
        net.set_packet_log(addr, Box::new(BufWriter::new(file)))?;
    }
    net.load_trace(trace);

    info!(
        topology = %topology.display(),
        flowtrace = %flowtrace.display(),
        policy = %net.policy(),
        end = %end,
        "🚀 开始仿真"
    );
    net.run(end)
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            topology,
            flowtrace,
            log_name,
            end_timeslot,
        } => match run(&topology, &flowtrace, &log_name, Timeslot(end_timeslot)) {
            Ok(summary) => {
                println!("{summary}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
