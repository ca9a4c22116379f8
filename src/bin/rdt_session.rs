//! RDT 传输会话
//!
//! 在一对（可能不可靠的）信道上运行一次发送方 -> 接收方的完整传输，
//! 打印汇总；可选输出事件 JSON 与汇总 JSON。

use clap::Parser;
use rdt_sim::channel::{ChannelSpec, LossyConfig};
use rdt_sim::sim::{Session, SessionError, SessionReport, SessionSpec};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "rdt-session", about = "可靠数据传输仿真：sender -> receiver 单会话")]
struct Args {
    /// 会话描述 JSON（其余参数会覆盖其中的字段）
    #[arg(long)]
    spec: Option<PathBuf>,

    /// 要发送的字符串
    #[arg(long)]
    data: Option<String>,

    /// 从文件读取要发送的数据（按原始字节发送）
    #[arg(long, conflicts_with = "data")]
    data_file: Option<PathBuf>,

    /// 每段最大载荷（字节）
    #[arg(long)]
    data_length: Option<usize>,

    /// 流控窗口（字节）
    #[arg(long)]
    window: Option<usize>,

    /// 超时重传阈值（tick）
    #[arg(long)]
    timeout: Option<u64>,

    /// 信道基础时延（tick）
    #[arg(long)]
    latency: Option<u64>,

    /// 丢包概率
    #[arg(long)]
    loss: Option<f64>,

    /// 损坏概率
    #[arg(long)]
    corrupt: Option<f64>,

    /// 乱序（额外延迟）概率
    #[arg(long)]
    reorder: Option<f64>,

    /// 额外延迟上限（tick）
    #[arg(long)]
    max_extra_delay: Option<u64>,

    /// 重复概率
    #[arg(long)]
    duplicate: Option<f64>,

    /// 随机种子（反向信道使用 seed+1）
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// 最多运行多少个 tick
    #[arg(long)]
    max_ticks: Option<u64>,

    /// 输出事件 JSON 文件；不填则不生成
    #[arg(long)]
    viz_json: Option<PathBuf>,

    /// 输出汇总 JSON 文件
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Args {
    fn lossy_requested(&self) -> bool {
        self.loss.is_some()
            || self.corrupt.is_some()
            || self.reorder.is_some()
            || self.duplicate.is_some()
            || self.max_extra_delay.is_some()
    }

    fn lossy(&self, seed: u64) -> LossyConfig {
        let d = LossyConfig::default();
        LossyConfig {
            latency: self.latency.unwrap_or(d.latency),
            drop_rate: self.loss.unwrap_or(d.drop_rate),
            corrupt_rate: self.corrupt.unwrap_or(d.corrupt_rate),
            reorder_rate: self.reorder.unwrap_or(d.reorder_rate),
            max_extra_delay: self.max_extra_delay.unwrap_or(d.max_extra_delay),
            duplicate_rate: self.duplicate.unwrap_or(d.duplicate_rate),
            seed,
        }
    }

    fn build_spec(&self) -> Result<SessionSpec, SessionError> {
        let mut spec = match &self.spec {
            Some(path) => SessionSpec::load(path)?,
            None => SessionSpec::default(),
        };

        if let Some(data) = &self.data {
            spec.data = data.clone();
        }
        if let Some(v) = self.data_length {
            spec.rdt.data_length = v;
        }
        if let Some(v) = self.window {
            spec.rdt.flow_control_window = v;
        }
        if let Some(v) = self.timeout {
            spec.rdt.retransmit_timeout = v;
        }
        if let Some(v) = self.max_ticks {
            spec.max_ticks = v;
        }

        if self.lossy_requested() {
            spec.forward = ChannelSpec::Lossy(self.lossy(self.seed));
            spec.reverse = ChannelSpec::Lossy(self.lossy(self.seed.wrapping_add(1)));
        } else if let Some(latency) = self.latency {
            spec.forward = ChannelSpec::Perfect { latency };
            spec.reverse = ChannelSpec::Perfect { latency };
        }

        spec.rdt.validate()?;
        Ok(spec)
    }
}

fn run(args: &Args) -> Result<SessionReport, SessionError> {
    let spec = args.build_spec()?;
    let mut session = match &args.data_file {
        Some(path) => Session::from_spec_with_data(&spec, fs::read(path)?)?,
        None => Session::from_spec(&spec)?,
    };
    if args.viz_json.is_some() {
        session.enable_viz();
    }

    let report = session.run_until(spec.max_ticks);

    if let Some(path) = &args.viz_json {
        if let Some(v) = session.viz.take() {
            let json = serde_json::to_string_pretty(&v.events)?;
            fs::write(path, json)?;
            eprintln!("wrote viz events to {}", path.display());
        }
    }
    if let Some(path) = &args.report_json {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(report)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let report = match run(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    println!(
        "done @ tick {}\n  rdt: complete={}, delivered={}/{} bytes, max_in_flight={}\n  sender: data_sent={}, retransmits={}, timeouts={}, fast_retransmits={}\n  receiver: acks={}, nacks={}, corrupt_dropped={}, duplicates={}, buffered={}\n  received: {:?}",
        report.ticks,
        report.complete,
        report.delivered_bytes,
        report.total_bytes,
        report.max_bytes_in_flight,
        report.sender.data_sent,
        report.sender.retransmits,
        report.sender.timeouts,
        report.sender.fast_retransmits,
        report.receiver.acks_sent,
        report.receiver.nacks_sent,
        report.receiver.corrupt_dropped,
        report.receiver.duplicates,
        report.receiver.buffered,
        report.received,
    );

    match report.into_result() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
