use crate::runtime::Runtime;
use colored::Colorize;
use skyfleet_cloud::{CancellationToken, Provider};

pub async fn handle(
    runtime: &Runtime,
    provider: &str,
    family: Option<&str>,
    regions: &[String],
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let provider: Provider = provider.parse()?;
    let probe = runtime.probe()?;
    if !probe.supports(provider) {
        anyhow::bail!("{} の在庫確認には対応していません", provider.display_name());
    }

    let family = family.unwrap_or(provider.default_instance_family());
    println!(
        "{}",
        format!("{} のスポット在庫を確認中 ({})...", provider.display_name(), family).blue()
    );

    let found = probe
        .find_available_regions(provider, family, regions, cancel)
        .await;

    println!();
    if found.is_empty() {
        println!("{}", "在庫情報を取得できませんでした".yellow());
        return Ok(());
    }
    for availability in &found {
        let mark = if availability.available {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} {:<16} {}",
            mark,
            availability.region.cyan(),
            availability.instance_type
        );
    }
    Ok(())
}
