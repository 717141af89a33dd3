pub mod credentials;
pub mod error;
pub mod settings;

pub use credentials::FileCredentialStore;
pub use error::*;
pub use settings::{CapacitySettings, DeploySettings, PricingSettings, Settings, TerraformSettings};

use std::path::PathBuf;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "SKYFLEET_CONFIG_PATH";

/// skyfleetのグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("skyfleet");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトのskyfleet.yamlを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 SKYFLEET_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: skyfleet.local.yaml, skyfleet.yaml
/// 3. ./.skyfleet/skyfleet.yaml
/// 4. ~/.config/skyfleet/skyfleet.yaml (グローバル設定)
///
/// 見つからない場合は `None` を返し、呼び出し側はデフォルト設定を使う。
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in ["skyfleet.local.yaml", "skyfleet.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. ./.skyfleet/ ディレクトリで検索
    let project_config = current_dir.join(".skyfleet").join("skyfleet.yaml");
    if project_config.exists() {
        return Ok(Some(project_config));
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("skyfleet").join("skyfleet.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// 設定ファイルを探して読み込む。見つからなければデフォルト設定
pub fn load_settings() -> Result<Settings> {
    match find_config_file()? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Settings::load(&path)
        }
        None => Ok(Settings::default()),
    }
}
