use crate::runtime::Runtime;
use crate::utils;
use colored::Colorize;
use skyfleet_cloud::CancellationToken;
use skyfleet_deploy::{DeployError, DeployRequest};

pub async fn handle(
    runtime: &Runtime,
    scenario: &str,
    request: &DeployRequest,
    probe: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    println!("{}", format!("シナリオ '{}' をデプロイ中...", scenario).blue());
    let orchestrator = runtime.orchestrator(probe)?;

    match orchestrator.deploy(scenario, request, cancel).await {
        Ok(report) => {
            utils::print_report(&report);
            println!();
            println!("{}", "✓ デプロイが完了しました".green().bold());
            utils::print_placements(&report.placements);
            Ok(())
        }
        Err(e) => {
            if let Some(report) = e.report() {
                utils::print_report(report);
            }
            println!();
            match &e {
                DeployError::Partial { .. } => {
                    println!(
                        "{}",
                        "⚠ 一部のノードのみ配置されました。シナリオは pending のままです。".yellow()
                    );
                    println!("  残ったフラグメントを削除: {} cleanup {}", "skyfleet".cyan(), scenario);
                }
                DeployError::NeedsCleanup { .. } => {
                    println!("  先に実行してください: {} cleanup {}", "skyfleet".cyan(), scenario);
                }
                DeployError::AuthMissing(provider) => {
                    let env = provider.credential_env();
                    println!(
                        "  {} と {} を設定するか、認証情報ファイルの [{}] セクションに記載してください",
                        env.access_key, env.secret_key, provider
                    );
                }
                _ => {}
            }
            Err(e.into())
        }
    }
}

pub async fn handle_destroy(
    runtime: &Runtime,
    scenario: &str,
    auto_approve: Option<bool>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    println!("{}", format!("シナリオ '{}' を削除中...", scenario).yellow());
    let destroyed = runtime
        .orchestrator(false)?
        .destroy(scenario, auto_approve, cancel)
        .await?;

    utils::print_placements(&destroyed);
    println!();
    println!("{}", "✓ 削除しました".green().bold());
    Ok(())
}

pub async fn handle_cleanup(
    runtime: &Runtime,
    scenario: &str,
    auto_approve: Option<bool>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("シナリオ '{}' の残存フラグメントを削除中...", scenario).yellow()
    );
    let removed = runtime
        .orchestrator(false)?
        .cleanup(scenario, auto_approve, cancel)
        .await?;

    println!();
    if removed.is_empty() {
        println!("{}", "ℹ 削除するフラグメントはありません".dimmed());
    } else {
        utils::print_placements(&removed);
        println!(
            "{}",
            format!("✓ {} 件のフラグメントを削除しました", removed.len())
                .green()
                .bold()
        );
    }
    Ok(())
}
