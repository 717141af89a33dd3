use colored::Colorize;
use skyfleet_cloud::{OptimalConfig, Placement, ScenarioStatus};
use skyfleet_deploy::{AttemptOutcome, DeployReport};

/// `--var KEY=VALUE` をパース
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("KEY=VALUE 形式で指定してください: {}", raw)),
    }
}

/// ステータスを色付きで表示
pub fn colored_status(status: ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Pending => status.to_string().yellow().to_string(),
        ScenarioStatus::Deployed => status.to_string().green().to_string(),
        ScenarioStatus::Destroyed => status.to_string().dimmed().to_string(),
    }
}

/// 一覧表示用にIDを短縮
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// 価格を1行で表示
pub fn print_price(rank: Option<usize>, config: &OptimalConfig) {
    let prefix = match rank {
        Some(i) => format!("{:>3}.", i + 1),
        None => "  ★".to_string(),
    };
    let mut line = format!(
        "{} {:<16} {:<22} {} {}/時間",
        prefix,
        config.region().cyan(),
        config.instance_type(),
        config.normalized_price_per_hour.round_dp(4).to_string().bold(),
        config.reference_currency,
    );
    if config.quote.currency != config.reference_currency {
        line.push_str(&format!(
            "  ({} {}/時間)",
            config.price_per_hour(),
            config.quote.currency
        ));
    }
    line.push_str(&format!(
        "  約 {} {}/月",
        config.price_per_month().round_dp(2),
        config.quote.currency
    ));
    println!("{}", line);
}

/// 配置一覧を表示
pub fn print_placements(placements: &[Placement]) {
    for placement in placements {
        println!(
            "  ✓ {} ({} ノード) {}",
            placement.region.cyan(),
            placement.nodes,
            placement.working_dir.display().to_string().dimmed()
        );
    }
}

/// 各リージョンの試行結果を表示
pub fn print_report(report: &DeployReport) {
    println!();
    println!("{}", "試行結果:".bold());
    for attempt in &report.attempts {
        let label = if attempt.fragment {
            format!("{} (フラグメント)", attempt.region_label())
        } else {
            attempt.region_label().to_string()
        };
        let outcome = match &attempt.outcome {
            AttemptOutcome::Placed => "配置済み".green().to_string(),
            AttemptOutcome::QuotaExceeded(_) => "クォータ不足".yellow().to_string(),
            AttemptOutcome::Failed { kind, message } => {
                format!("{} ({}): {}", "失敗".red(), kind, message)
            }
            AttemptOutcome::Cancelled => "中断".red().to_string(),
        };
        println!("  • {:<28} {} ノード  {}", label, attempt.nodes, outcome);
    }
    println!(
        "  {} / {} ノード配置",
        report.placed().to_string().bold(),
        report.requested
    );
}
