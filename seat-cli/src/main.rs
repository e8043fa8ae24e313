use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use seat_occupancy::{FixedTableLocator, SeatDetector, SeatReport, TableRegion};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// 报告输出格式。
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// 每个座位一行的可读文本。
    Text,
    /// 每个桌面一行 JSON。
    Json,
}

/// 命令行给出的桌面区域：`x1,y1,x2,y2[,confidence]`。
#[derive(Copy, Clone, Debug, PartialEq)]
struct TableArg(TableRegion);

impl FromStr for TableArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(format!("桌面区域需为 x1,y1,x2,y2[,confidence]，实际为 `{s}`"));
        }
        let mut corners = [0i32; 4];
        for (slot, part) in corners.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|e| format!("无法解析坐标 `{part}`：{e}"))?;
        }
        let [x1, y1, x2, y2] = corners;
        let mut table = TableRegion::new(x1, y1, x2, y2);
        if let Some(conf) = parts.get(4) {
            let conf: f32 = conf
                .parse()
                .map_err(|e| format!("无法解析置信度 `{conf}`：{e}"))?;
            table = table.with_confidence(conf);
        }
        Ok(Self(table))
    }
}

/// 命令行参数：布局文件、输入截图与输出方式。
#[derive(Parser, Debug)]
#[command(
    name = "seat-cli",
    version,
    about = "对牌桌截图批量执行座位占用检测"
)]
struct Args {
    /// 座位布局 JSON 文件
    #[arg(long, default_value = "assets/seat_layout.json")]
    config: PathBuf,

    /// 输入截图，可以是单个文件或目录（递归遍历 PNG/JPG）
    #[arg(long)]
    input: PathBuf,

    /// 桌面区域 x1,y1,x2,y2[,confidence]，可重复；缺省时整帧视为桌面
    #[arg(long = "table")]
    tables: Vec<TableArg>,

    /// 低于该置信度的桌面区域被忽略
    #[arg(long, default_value_t = 0.35)]
    min_table_confidence: f32,

    /// 输出格式：text 或 json
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// 只输出有人座位
    #[arg(long, default_value_t = false)]
    occupied_only: bool,
}

/// 程序入口：初始化日志、解析参数并执行批量检测。
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

/// 加载布局后逐张截图检测，结果写到标准输出。
fn run(args: Args) -> Result<()> {
    anyhow::ensure!(
        args.input.exists(),
        "输入路径不存在：{}",
        args.input.display()
    );
    let detector = SeatDetector::from_path(&args.config)?;

    let mut processed = 0usize;
    let mut occupied = 0usize;
    for path in collect_images(&args.input) {
        let frame = image::open(&path)
            .with_context(|| format!("载入图像失败：{}", path.display()))?
            .to_rgb8();

        let tables = if args.tables.is_empty() {
            vec![TableRegion::full_frame(frame.width(), frame.height())]
        } else {
            args.tables.iter().map(|t| t.0).collect()
        };
        let locator = FixedTableLocator::new(tables);
        let results = detector.detect_with_locator(&frame, &locator, args.min_table_confidence);
        if results.is_empty() {
            warn!(path = %path.display(), "没有满足置信度要求的桌面区域");
        }

        for (index, (table, report)) in results.iter().enumerate() {
            occupied += report.occupied().count();
            match args.format {
                OutputFormat::Text => print_text(&path, index, table, report, args.occupied_only),
                OutputFormat::Json => print_json(&path, index, table, report, args.occupied_only)?,
            }
        }
        processed += 1;
    }

    info!(processed, occupied, "检测完成");
    Ok(())
}

/// 单个文件原样返回，目录则递归收集 PNG/JPG/JPEG，按路径排序。
fn collect_images(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut images: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|res| res.ok())
        .filter(|entry| entry.file_type().is_file() && is_supported_image(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    images.sort();
    images
}

/// 过滤文件扩展名，仅允许 PNG/JPG/JPEG。
fn is_supported_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if ext == "png" || ext == "jpg" || ext == "jpeg"
    )
}

fn print_text(path: &Path, index: usize, table: &TableRegion, report: &SeatReport, occupied_only: bool) {
    println!(
        "{} 桌面#{} ({},{})-({},{}) 置信度 {:.2}",
        path.display(),
        index,
        table.x1,
        table.y1,
        table.x2,
        table.y2,
        table.confidence
    );
    for seat in report.iter().filter(|s| s.occupied || !occupied_only) {
        let state = if seat.occupied { "有人" } else { "空位" };
        println!(
            "  [{:>2}] {:<14} {} 置信度 {:.3} 边缘 {:.3} 方差 {:.1}",
            seat.seat_id, seat.name, state, seat.confidence, seat.edge_density, seat.contrast_variance
        );
    }
}

fn print_json(
    path: &Path,
    index: usize,
    table: &TableRegion,
    report: &SeatReport,
    occupied_only: bool,
) -> Result<()> {
    let seats: Vec<_> = report
        .iter()
        .filter(|s| s.occupied || !occupied_only)
        .collect();
    let line = serde_json::json!({
        "image": path.to_string_lossy(),
        "table_index": index,
        "table": table,
        "seats": seats,
    });
    println!("{}", serde_json::to_string(&line).context("序列化检测结果失败")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_without_confidence() -> Result<(), String> {
        let TableArg(table) = "10, 20, 810,620".parse::<TableArg>()?;
        assert_eq!(table, TableRegion::new(10, 20, 810, 620));
        Ok(())
    }

    #[test]
    fn parses_table_with_confidence() -> Result<(), String> {
        let TableArg(table) = "-5,0,100,80,0.42".parse::<TableArg>()?;
        assert_eq!((table.x1, table.y2), (-5, 80));
        assert!((table.confidence - 0.42).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn rejects_malformed_table() {
        assert!("1,2,3".parse::<TableArg>().is_err());
        assert!("1,2,3,x".parse::<TableArg>().is_err());
        assert!("1,2,3,4,high".parse::<TableArg>().is_err());
    }

    #[test]
    fn accepts_cli_flags() {
        let args = Args::try_parse_from([
            "seat-cli",
            "--input",
            "shots",
            "--table",
            "0,0,800,600",
            "--table",
            "800,0,1600,600,0.9",
            "--format",
            "json",
            "--occupied-only",
        ])
        .expect("valid flags");
        assert_eq!(args.tables.len(), 2);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.occupied_only);
        assert_eq!(args.config, PathBuf::from("assets/seat_layout.json"));
    }

    #[test]
    fn filters_image_extensions() {
        assert!(is_supported_image(Path::new("a/b.PNG")));
        assert!(is_supported_image(Path::new("c.jpeg")));
        assert!(!is_supported_image(Path::new("layout.json")));
    }
}
