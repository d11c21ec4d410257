// ==========================================
// 多商户目录导入引擎 - 命令行入口
// ==========================================
// 用法: catalog-import <db_path> <csv_path> [mode] [match_strategy] [vendor_id]
// 流程: 初始化日志与数据库 → 暂存 → 打印统计与前几条错误 → 提交 → 输出 JSON 结果
// ==========================================

use anyhow::{bail, Context, Result};
use catalog_import::api::{CommitRequest, ImportApi};
use catalog_import::logging;

/// 打印的校验错误条数
const MAX_PRINTED_ERRORS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("用法: catalog-import <db_path> <csv_path> [mode] [match_strategy] [vendor_id]");
    }
    let db_path = &args[0];
    let csv_path = &args[1];
    let vendor_id = args.get(4).map(String::as_str);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", catalog_import::APP_NAME, catalog_import::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let api = ImportApi::new(db_path).context("初始化导入 API 失败")?;

    let role = if vendor_id.is_some() { "vendor" } else { "admin" };
    let staged = api
        .stage_csv_file(csv_path, vendor_id, None, role)
        .await
        .with_context(|| format!("暂存文件失败: {}", csv_path))?;

    println!(
        "importId={} 行数={} 有效={} 无效={}{}",
        staged.import_id,
        staged.stats.total_rows,
        staged.stats.valid_rows,
        staged.stats.invalid_rows,
        if staged.stats.truncated { "（已截断）" } else { "" }
    );
    for row_errors in staged.validation_errors.iter().take(MAX_PRINTED_ERRORS) {
        for err in &row_errors.errors {
            println!("  第 {} 行 {}: {}", row_errors.row_index, err.field, err.message);
        }
    }

    let request = CommitRequest {
        mode: args.get(2).cloned(),
        match_strategy: args.get(3).cloned(),
        vendor_id: vendor_id.map(str::to_string),
        ..CommitRequest::default()
    };
    let result = api
        .commit(&staged.import_id, request)
        .await
        .context("提交失败")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
