use crate::runtime::Runtime;
use crate::utils;
use colored::Colorize;
use skyfleet_cloud::{CancellationToken, Provider, TemplateRef};
use skyfleet_pricing::{CatalogEntry, CatalogPriceClient, OptimizeError};

pub struct PriceQuery {
    pub template: Option<String>,
    pub provider: Option<String>,
    pub regions: Vec<String>,
    pub instance_types: Vec<String>,
    pub all: bool,
}

impl PriceQuery {
    fn template(&self) -> Option<TemplateRef> {
        self.template.as_deref().map(TemplateRef::from)
    }

    fn provider(&self) -> anyhow::Result<Provider> {
        if let Some(provider) = &self.provider {
            return Ok(provider.parse()?);
        }
        self.template()
            .and_then(|t| t.provider())
            .ok_or_else(|| anyhow::anyhow!("プロバイダーを特定できません。--provider またはテンプレートを指定してください"))
    }
}

pub async fn handle(
    runtime: &Runtime,
    query: &PriceQuery,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let provider = query.provider()?;
    println!(
        "{}",
        format!("{} の価格を取得中...", provider.display_name()).blue()
    );

    let optimizer = runtime.optimizer()?;
    let result = if query.all {
        optimizer
            .rank(provider, &query.instance_types, &query.regions, cancel)
            .await
    } else {
        let best = match query.template() {
            Some(template) => {
                optimizer
                    .find_optimal_for_template(&template, &query.instance_types, &query.regions, cancel)
                    .await
            }
            None => {
                optimizer
                    .find_optimal(provider, &query.instance_types, &query.regions, cancel)
                    .await
            }
        };
        best.map(|config| vec![config])
    };

    match result {
        Ok(configs) => {
            println!();
            if query.all {
                for (i, config) in configs.iter().enumerate() {
                    utils::print_price(Some(i), config);
                }
            } else if let Some(best) = configs.first() {
                println!("{}", "最安構成:".bold());
                utils::print_price(None, best);
            }
            Ok(())
        }
        Err(e) => {
            // ライブ価格が取れなければカタログの概算にフォールバック
            let estimate = query
                .template()
                .and_then(|t| CatalogPriceClient::default().estimate(&t).cloned());
            match (&e, estimate) {
                (
                    OptimizeError::AuthMissing(_)
                    | OptimizeError::Unsupported(_)
                    | OptimizeError::NoQuotesAvailable { .. },
                    Some(entry),
                ) => {
                    println!("{} {}", "⚠".yellow(), e);
                    println!("{}", "カタログ価格を表示します".yellow());
                    println!();
                    print_entry(&entry);
                    Ok(())
                }
                _ => Err(e.into()),
            }
        }
    }
}

/// 静的カタログから価格を表示（ネットワーク不要）
pub fn handle_catalog(query: &PriceQuery) -> anyhow::Result<()> {
    let catalog = CatalogPriceClient::default();

    if let Some(template) = query.template() {
        let entry = catalog
            .estimate(&template)
            .ok_or_else(|| anyhow::anyhow!("カタログに '{}' の価格がありません", template))?;
        print_entry(entry);
        return Ok(());
    }

    let provider = match &query.provider {
        Some(p) => Some(p.parse::<Provider>()?),
        None => None,
    };
    println!("{}", "カタログ価格:".bold());
    for entry in catalog
        .entries()
        .iter()
        .filter(|e| provider.is_none_or(|p| e.provider == p))
    {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &CatalogEntry) {
    let quote = entry.to_quote("-", &entry.key);
    println!(
        "  {:<24} {} {}/時間  約 {} {}/月  {}",
        format!("{}/{}", entry.provider, entry.key).cyan(),
        entry.price_per_hour.to_string().bold(),
        entry.currency,
        quote.price_per_month().round_dp(2),
        entry.currency,
        entry.spec.dimmed()
    );
}
