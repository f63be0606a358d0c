// ==========================================
// 计费主数据导入系统 - 命令行入口
// ==========================================
// 用法: billing-import --db <path> <entity> <csv-file>
// 输出: ImportResponse（JSON,stdout）;日志写 stderr
// 退出码: 结构错误/系统错误 → 非零;行级错误随 JSON 返回
// ==========================================

use anyhow::{Context, Result};
use billing_master_import::db::{init_schema, open_sqlite_connection};
use billing_master_import::{logging, EntityKind, ImportApi, ImportRequest};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(author, version, about = "批量导入计费主数据 CSV", long_about = None)]
struct Cli {
    /// SQLite 数据库路径（不存在时自动创建并建表）
    #[arg(long)]
    db: PathBuf,

    /// 实体族,如 tax / billing_schedule_period / package_course_fee
    entity: EntityKind,

    /// CSV 文件路径
    input: PathBuf,

    /// 以 JSON 格式输出日志
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    tracing::info!(version = billing_master_import::VERSION, "{}", billing_master_import::APP_NAME);

    let db_path = cli
        .db
        .to_str()
        .context("数据库路径不是合法 UTF-8")?;
    let conn = open_sqlite_connection(db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;

    let payload = std::fs::read(&cli.input)
        .with_context(|| format!("无法读取文件: {}", cli.input.display()))?;

    let api = ImportApi::from_connection(Arc::new(Mutex::new(conn)))?;
    let response = api
        .import(ImportRequest {
            entity: cli.entity,
            payload,
        })
        .await
        .with_context(|| format!("{} 导入失败", cli.entity))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
