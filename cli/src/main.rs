use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use healthview_core::{
    FetchError, LiveMessage, Sample, ViewConfig, ViewEvent, ViewState, ViewSynchronizer,
    HEART_RATE_LABEL, OXYGEN_LEVEL_LABEL,
};
use healthview_feed::socketio::decode_text;
use healthview_feed::{
    decode_live_str, parse_day, parse_history_str, parse_range, parse_utc_offset,
};
use log::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "healthview-cli",
    about = "Dựng bảng và biểu đồ mẫu sức khỏe từ lịch sử và nhật ký kênh trực tiếp."
)]
struct Args {
    /// File JSON hoặc URL http(s) của endpoint lịch sử.
    #[arg(long)]
    history: String,

    /// Nhật ký kênh trực tiếp: mỗi dòng một khung Socket.IO hoặc một object JSON.
    #[arg(long)]
    live: Option<PathBuf>,

    /// Mốc bắt đầu theo giờ địa phương `YYYY-MM-DD HH:mm:ss`.
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Mốc kết thúc theo giờ địa phương `YYYY-MM-DD HH:mm:ss`.
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Chỉ hiển thị một ngày địa phương `YYYY-MM-DD`.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    day: Option<String>,

    /// Offset của giờ địa phương, ví dụ `+07:00`.
    #[arg(long, default_value = "Z")]
    utc_offset: String,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Tên sự kiện mang mẫu mới.
    #[arg(long)]
    live_event: Option<String>,

    #[arg(long)]
    begin_at_zero: bool,

    /// In bảng và biểu đồ dạng JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = ViewConfig {
        history_url: args.history.clone(),
        begin_at_zero: args.begin_at_zero,
        ..ViewConfig::default()
    };
    if let Some(secs) = args.timeout_secs {
        config.fetch_timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(event) = &args.live_event {
        config.live_event = event.clone();
    }

    let mut sync = ViewSynchronizer::with_models(config.clone());
    sync.begin_load()?;

    let (tx, rx) = mpsc::channel::<ViewEvent>();

    let offset = parse_utc_offset(&args.utc_offset)
        .with_context(|| format!("Offset không hợp lệ: {}", args.utc_offset))?;
    let window = match (&args.day, &args.from, &args.to) {
        (Some(day), _, _) => Some(parse_day(day, offset)?),
        (None, Some(from), Some(to)) => Some(parse_range(from, to, offset)?),
        _ => None,
    };
    if let Some(window) = window {
        tx.send(ViewEvent::RangeSelected {
            start: window.start,
            end: window.end,
        })?;
    }

    let fetch_tx = tx.clone();
    let timeout = Duration::from_millis(config.fetch_timeout_ms);
    let history = config.history_url.clone();
    let fetcher = thread::spawn(move || {
        let result = fetch_history(&history, timeout);
        // Bên nhận chỉ biến mất khi main đã thoát.
        let _ = fetch_tx.send(ViewEvent::HistoryLoaded(result));
    });

    let replayer = match &args.live {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Không đọc được file {path:?}"))?;
            let live_tx = tx.clone();
            let live_event = config.live_event.clone();
            Some(thread::spawn(move || replay_live(file, &live_event, live_tx)))
        }
        None => None,
    };
    drop(tx);

    for event in rx {
        if let Err(err) = sync.handle(event) {
            warn!("{err}");
        }
    }

    fetcher
        .join()
        .map_err(|_| anyhow::anyhow!("Luồng tải lịch sử bị panic"))?;
    if let Some(replayer) = replayer {
        replayer
            .join()
            .map_err(|_| anyhow::anyhow!("Luồng phát lại kênh trực tiếp bị panic"))?;
    }

    if let ViewState::Failed(err) = sync.state() {
        bail!("Tải lịch sử thất bại: {err}");
    }

    if args.json {
        let output = serde_json::json!({
            "window": sync.window(),
            "table": sync.table(),
            "chart": sync.chart(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{:<26}{:>12}{:>20}{:>10}{:>10}{:>10}",
        "Timestamp", HEART_RATE_LABEL, OXYGEN_LEVEL_LABEL, "Ax", "Ay", "Az"
    );
    for row in sync.table().rows() {
        let [timestamp, heart_rate, oxygen_level, ax, ay, az] = row.cells();
        println!("{timestamp:<26}{heart_rate:>12}{oxygen_level:>20}{ax:>10}{ay:>10}{az:>10}");
    }

    let chart = sync.chart();
    println!(
        "\nSamples: {} hiển thị / {} tổng",
        chart.len(),
        sync.dataset().len()
    );
    match chart.y_bounds() {
        Some(bounds) => println!("Trục Y: {} .. {}", bounds.min, bounds.max),
        None => println!("Trục Y: tự động"),
    }

    Ok(())
}

fn fetch_history(source: &str, timeout: Duration) -> Result<Vec<Sample>, FetchError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch_http(source, timeout)
    } else {
        let body = std::fs::read_to_string(Path::new(source))
            .map_err(|err| FetchError::Network(format!("{source}: {err}")))?;
        parse_history_str(&body)
    }
}

fn fetch_http(url: &str, timeout: Duration) -> Result<Vec<Sample>, FetchError> {
    info!("GET {url}");
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    let mut response = agent.get(url).call().map_err(|err| match err {
        ureq::Error::StatusCode(status) => FetchError::Status(status),
        ureq::Error::Timeout(_) => FetchError::Timeout(timeout.as_millis() as u64),
        other => FetchError::Network(other.to_string()),
    })?;

    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| match err {
            ureq::Error::Timeout(_) => FetchError::Timeout(timeout.as_millis() as u64),
            other => FetchError::Network(other.to_string()),
        })?;
    parse_history_str(&body)
}

/// Phát lại nhật ký kênh trực tiếp theo đúng thứ tự dòng.
fn replay_live(file: File, live_event: &str, tx: mpsc::Sender<ViewEvent>) {
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("Dừng phát lại ở dòng {}: {err}", number + 1);
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let message = if text.starts_with('{') {
            Some(decode_live_str(text))
        } else {
            decode_text(text, live_event)
        };
        match message {
            Some(LiveMessage::Malformed(reason)) => {
                warn!("Dòng {} bị bỏ qua: {reason}", number + 1);
            }
            Some(message) => {
                if tx.send(ViewEvent::Live(message)).is_err() {
                    break;
                }
            }
            None => debug!("Dòng {} là khung điều khiển", number + 1),
        }
    }
}
