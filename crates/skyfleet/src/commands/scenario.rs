use crate::runtime::Runtime;
use crate::utils;
use colored::Colorize;
use skyfleet_cloud::{Scenario, ScenarioStore};
use std::path::PathBuf;

pub async fn handle_add(
    runtime: &Runtime,
    name: String,
    template: String,
    dir: Option<PathBuf>,
    region: Option<String>,
) -> anyhow::Result<()> {
    let working_dir = runtime
        .project_root
        .join(dir.unwrap_or_else(|| PathBuf::from(&name)));

    let mut scenario = Scenario::new(name, template, working_dir);
    if let Some(region) = region {
        scenario = scenario.with_region(region);
    }

    if scenario.kind.is_none() {
        println!(
            "{} 未知のテンプレートです。認証情報は注入されません: {}",
            "⚠".yellow(),
            scenario.template
        );
    }
    if !scenario.working_dir.is_dir() {
        println!(
            "{} 作業ディレクトリがまだありません: {}",
            "⚠".yellow(),
            scenario.working_dir.display()
        );
    }

    runtime.store.insert(scenario.clone()).await?;

    println!(
        "{}",
        format!("✓ シナリオ '{}' を登録しました", scenario.name)
            .green()
            .bold()
    );
    println!("  ID: {}", scenario.id.cyan());
    println!("  テンプレート: {}", scenario.template);
    Ok(())
}

pub async fn handle_list(runtime: &Runtime) -> anyhow::Result<()> {
    let scenarios = runtime.store.list().await?;
    if scenarios.is_empty() {
        println!("{}", "シナリオはありません".dimmed());
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {:<44} {:<10} {}",
        "ID".bold(),
        "NAME".bold(),
        "TEMPLATE".bold(),
        "STATUS".bold(),
        "NODES".bold()
    );
    for scenario in &scenarios {
        let regions: Vec<&str> = scenario
            .placement
            .iter()
            .chain(&scenario.fragments)
            .map(|p| p.region.as_str())
            .collect();
        println!(
            "{:<10} {:<20} {:<44} {:<10} {} {}",
            utils::short_id(&scenario.id),
            scenario.name,
            scenario.template.to_string(),
            utils::colored_status(scenario.status),
            scenario.placed_nodes(),
            regions.join(",").dimmed()
        );
    }
    Ok(())
}
