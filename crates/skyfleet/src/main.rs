mod commands;
mod runtime;
mod utils;

use clap::{Parser, Subcommand};
use skyfleet_cloud::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skyfleet")]
#[command(about = "いちばん安いリージョンへ、空きがあるところへ。", long_about = None)]
struct Cli {
    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 時間単価を比較して最安の構成を表示
    Price {
        /// テンプレート (例: aliyun/ecs)
        template: Option<String>,
        /// プロバイダー (テンプレート未指定時)
        #[arg(short, long)]
        provider: Option<String>,
        /// 候補リージョン（複数指定可、省略時はプロバイダー既定）
        #[arg(short, long = "region")]
        regions: Vec<String>,
        /// 候補インスタンスタイプ（複数指定可）
        #[arg(short = 't', long = "instance-type")]
        instance_types: Vec<String>,
        /// 全リージョンを安い順に表示
        #[arg(short, long)]
        all: bool,
        /// API を呼ばずに静的カタログ価格を表示
        #[arg(long)]
        catalog: bool,
    },
    /// スポット在庫のあるリージョンを調べる
    Probe {
        /// プロバイダー (aliyun, tencent)
        provider: String,
        /// インスタンスファミリー（省略時はプロバイダー既定）
        #[arg(short, long)]
        family: Option<String>,
        /// 調査するリージョン（複数指定可）
        #[arg(short, long = "region")]
        regions: Vec<String>,
    },
    /// シナリオを管理
    #[command(subcommand)]
    Scenario(ScenarioCommands),
    /// シナリオをデプロイ（クォータ不足時は次のリージョンへ）
    Deploy {
        /// シナリオ名またはID
        scenario: String,
        /// ノード数（node_count を受け付けるテンプレートのみ）
        #[arg(short = 'n', long)]
        nodes: Option<u32>,
        /// 最初に試すリージョン
        #[arg(short, long)]
        region: Option<String>,
        /// インスタンスタイプ
        #[arg(short = 't', long)]
        instance_type: Option<String>,
        /// 価格の安い順にリージョンを試す
        #[arg(long)]
        optimize: bool,
        /// スポット在庫のないリージョンを事前に除外
        #[arg(long)]
        probe: bool,
        /// テンプレート変数 (KEY=VALUE、複数指定可)
        #[arg(long = "var", value_parser = utils::parse_var)]
        vars: Vec<(String, String)>,
        /// apply を自動承認しない
        #[arg(long)]
        no_auto_approve: bool,
    },
    /// デプロイ済みシナリオを削除（フラグメントを含む）
    Destroy {
        /// シナリオ名またはID
        scenario: String,
        /// destroy を自動承認しない
        #[arg(long)]
        no_auto_approve: bool,
    },
    /// 部分デプロイで残ったフラグメントを削除
    Cleanup {
        /// シナリオ名またはID
        scenario: String,
        /// destroy を自動承認しない
        #[arg(long)]
        no_auto_approve: bool,
    },
    /// シナリオの状態とリソースを表示
    Status {
        /// シナリオ名またはID
        scenario: String,
    },
    /// バージョン情報を表示
    Version,
}

/// シナリオ管理のサブコマンド
#[derive(Subcommand)]
enum ScenarioCommands {
    /// シナリオを登録
    Add {
        /// シナリオ名
        name: String,
        /// テンプレート (例: tencent/tencent-proxy)
        template: String,
        /// Terraform 作業ディレクトリ（省略時は ./<name>）
        #[arg(short, long)]
        dir: Option<std::path::PathBuf>,
        /// このシナリオで使うリージョンを固定
        #[arg(short, long)]
        region: Option<String>,
    },
    /// シナリオの一覧を表示
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ。RUST_LOG が優先
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("skyfleet {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let runtime = runtime::Runtime::load()?;

    // Ctrl-C で実行中の terraform / 問い合わせを中断
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n中断しています...");
            on_interrupt.cancel();
        }
    });

    // コマンドディスパッチ
    match cli.command {
        Commands::Price {
            template,
            provider,
            regions,
            instance_types,
            all,
            catalog,
        } => {
            let query = commands::price::PriceQuery {
                template,
                provider,
                regions,
                instance_types,
                all,
            };
            if catalog {
                commands::price::handle_catalog(&query)?;
            } else {
                commands::price::handle(&runtime, &query, &cancel).await?;
            }
        }
        Commands::Probe {
            provider,
            family,
            regions,
        } => {
            commands::probe::handle(&runtime, &provider, family.as_deref(), &regions, &cancel)
                .await?;
        }
        Commands::Scenario(ScenarioCommands::Add {
            name,
            template,
            dir,
            region,
        }) => {
            commands::scenario::handle_add(&runtime, name, template, dir, region).await?;
        }
        Commands::Scenario(ScenarioCommands::List) => {
            commands::scenario::handle_list(&runtime).await?;
        }
        Commands::Deploy {
            scenario,
            nodes,
            region,
            instance_type,
            optimize,
            probe,
            vars,
            no_auto_approve,
        } => {
            let mut request = skyfleet_deploy::DeployRequest::new().with_optimize(optimize);
            request.node_count = nodes;
            request.region = region;
            request.instance_type = instance_type;
            request.auto_approve = no_auto_approve.then_some(false);
            request.vars.extend(vars);
            commands::deploy::handle(&runtime, &scenario, &request, probe, &cancel).await?;
        }
        Commands::Destroy {
            scenario,
            no_auto_approve,
        } => {
            commands::deploy::handle_destroy(
                &runtime,
                &scenario,
                no_auto_approve.then_some(false),
                &cancel,
            )
            .await?;
        }
        Commands::Cleanup {
            scenario,
            no_auto_approve,
        } => {
            commands::deploy::handle_cleanup(
                &runtime,
                &scenario,
                no_auto_approve.then_some(false),
                &cancel,
            )
            .await?;
        }
        Commands::Status { scenario } => {
            commands::status::handle(&runtime, &scenario, &cancel).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
