// ==========================================
// 库存补货调拨系统 - 命令行入口
// ==========================================
// 用法: fc-replenish <BRAND> <YYYY-WW> [TARGET_WEEKS]
//         [--data-dir DIR] [--db PATH] [--json-log]
//       fc-replenish <BRAND> --region-sales [--data-dir DIR] [--db PATH]
// 退出码: 0 = LOCKED, 1 = BLOCKED/失败, 2 = 参数错误
// ==========================================

use anyhow::{bail, Context, Result};
use fc_replenishment::app::{get_default_data_dir, get_default_db_path, AppState, WeeklyRunner};
use fc_replenishment::config::ParamOverrides;
use fc_replenishment::importer::FileFactSource;
use fc_replenishment::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = concat!(
    "用法: fc-replenish <BRAND> <YYYY-WW> [TARGET_WEEKS] [--data-dir DIR] [--db PATH] [--json-log]\n",
    "      fc-replenish <BRAND> --region-sales [--data-dir DIR] [--db PATH] [--json-log]",
);

#[derive(Debug)]
struct CliArgs {
    brand: String,
    /// 地区销量模式下为 None
    week: Option<String>,
    target_weeks: Option<i64>,
    data_dir: Option<PathBuf>,
    db_path: Option<String>,
    json_log: bool,
    region_sales: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut data_dir = None;
    let mut db_path = None;
    let mut json_log = false;
    let mut region_sales = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--data-dir" => {
                data_dir = Some(PathBuf::from(iter.next().context("--data-dir 缺少参数")?));
            }
            "--db" => db_path = Some(iter.next().context("--db 缺少参数")?),
            "--json-log" => json_log = true,
            "--region-sales" => region_sales = true,
            flag if flag.starts_with("--") => bail!("未知参数: {}", flag),
            _ => positional.push(arg),
        }
    }

    let expected = if region_sales { 1..=1 } else { 2..=3 };
    if !expected.contains(&positional.len()) {
        bail!("{}", USAGE);
    }
    let target_weeks = positional
        .get(2)
        .map(|raw| raw.parse::<i64>().with_context(|| format!("TARGET_WEEKS 非整数: {}", raw)))
        .transpose()?;

    Ok(CliArgs {
        brand: positional[0].clone(),
        week: positional.get(1).cloned(),
        target_weeks,
        data_dir,
        db_path,
        json_log,
        region_sales,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    if args.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: CliArgs) -> Result<()> {
    tracing::info!("==================================================");
    tracing::info!("{} v{}", fc_replenishment::APP_NAME, fc_replenishment::VERSION);
    tracing::info!("==================================================");

    let db_path = args.db_path.unwrap_or_else(get_default_db_path);
    let data_dir = args.data_dir.unwrap_or_else(get_default_data_dir);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("输入目录: {}", data_dir.display());

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let runner = WeeklyRunner::new(
        Arc::new(FileFactSource::new(data_dir)),
        state.config_manager.clone(),
        state.run_repo.clone(),
        state.line_repo.clone(),
    );

    let overrides = ParamOverrides {
        target_weeks: args.target_weeks,
        ..Default::default()
    };

    let week = match args.week {
        Some(week) if !args.region_sales => week,
        _ => {
            let report = runner
                .region_sales(&args.brand, &overrides)
                .await
                .with_context(|| format!("地区销量汇总失败: {}", args.brand))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
    };

    let outcome = runner
        .run(&args.brand, &week, &overrides)
        .await
        .with_context(|| format!("运行失败: {} {}", args.brand, week))?;

    tracing::info!(
        run_id = %outcome.run_id,
        status = ?outcome.status,
        replenishment_lines = outcome.sku.shortfalls.len(),
        allocation_lines = outcome.fc.allocations.len(),
        transfer_lines = outcome.fc.transfers.len(),
        "运行完成"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
