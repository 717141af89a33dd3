use crate::runtime::Runtime;
use crate::utils;
use colored::Colorize;
use skyfleet_cloud::CancellationToken;

pub async fn handle(
    runtime: &Runtime,
    scenario: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let report = runtime.orchestrator(false)?.status(scenario, cancel).await?;
    let scenario = &report.scenario;

    println!("{} {}", "シナリオ:".bold(), scenario.name.cyan());
    println!("  ID: {}", scenario.id);
    println!("  テンプレート: {}", scenario.template);
    println!("  ステータス: {}", utils::colored_status(scenario.status));
    println!("  作業ディレクトリ: {}", scenario.working_dir.display());
    if let Some(region) = &scenario.region {
        println!("  固定リージョン: {}", region);
    }

    let placements: Vec<_> = scenario
        .placement
        .iter()
        .chain(&scenario.fragments)
        .cloned()
        .collect();
    if !placements.is_empty() {
        println!();
        println!("{} ({} ノード)", "配置:".bold(), scenario.placed_nodes());
        utils::print_placements(&placements);
    }

    println!();
    if report.details.is_empty() && report.resources.is_empty() {
        println!("{}", "リソースはありません".dimmed());
    } else if report.details.is_empty() {
        println!("{}", "リソース:".bold());
        for address in &report.resources {
            println!("  • {}", address);
        }
    } else {
        println!("{}", "インスタンス:".bold());
        for detail in &report.details {
            println!(
                "  • {:<36} {:<14} {:<14} {:<10} {}",
                detail.address,
                detail.id,
                detail.region,
                detail.status,
                detail.public_ips.join(",")
            );
        }
    }

    for warning in &report.warnings {
        println!("{} {}", "⚠".yellow(), warning);
    }
    Ok(())
}
