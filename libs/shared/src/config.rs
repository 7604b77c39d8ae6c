use serde::{Deserialize, Serialize};

/// Chipper 全体の設定
#[derive(Clone, Serialize, Deserialize)]
pub struct ChipperConfig {
    /// SQLite データベースファイルのパス（台帳・キュー・監査ログを収容）
    pub database_path: String,
    /// APIサーバーの待ち受けポート
    pub bind_port: u16,
    /// 通知メールの配送エンドポイント（トランザクションメール中継のURL）
    pub mail_endpoint: String,
    /// 配送エンドポイントの APIキー
    pub mail_api_key: String,
    /// メール本文のリンクに使うアプリのベースURL
    pub app_base_url: String,
    /// 通知ワーカーのポーリング間隔（秒）
    pub worker_poll_secs: u64,
    /// 1受信者あたりの配送タイムアウト（秒）
    pub send_timeout_secs: u64,
    /// Processing のまま放置されたイベントを Pending に戻すまでの時間（分）
    pub reclaim_after_minutes: i64,
}

impl std::fmt::Debug for ChipperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipperConfig")
            .field("database_path", &self.database_path)
            .field("bind_port", &self.bind_port)
            .field("mail_endpoint", &self.mail_endpoint)
            .field(
                "mail_api_key",
                if self.mail_api_key.is_empty() { &"" } else { &"***" },
            )
            .field("app_base_url", &self.app_base_url)
            .field("worker_poll_secs", &self.worker_poll_secs)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .field("reclaim_after_minutes", &self.reclaim_after_minutes)
            .finish()
    }
}

impl ChipperConfig {
    /// 設定をファイルまたは環境変数から読み込む
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            // デフォルト値の設定
            .set_default("database_path", std::env::var("DATABASE_PATH").unwrap_or_else(|_| "chipper.db".to_string()))?
            .set_default("bind_port", 3000)?
            .set_default("mail_endpoint", std::env::var("MAIL_ENDPOINT").unwrap_or_else(|_| "http://localhost:8025/api/send".to_string()))?
            .set_default("mail_api_key", std::env::var("MAIL_API_KEY").unwrap_or_else(|_| "".to_string()))?
            .set_default("app_base_url", std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()))?
            .set_default("worker_poll_secs", 5)?
            .set_default("send_timeout_secs", 10)?
            .set_default("reclaim_after_minutes", 15)?
            // config.toml があれば読み込む
            .add_source(config::File::with_name("config").required(false))
            // 環境変数 (CHIPPER_*) があれば上書き
            .add_source(config::Environment::with_prefix("CHIPPER"))
            .build()?;

        settings.try_deserialize()
    }
}

impl Default for ChipperConfig {
    fn default() -> Self {
        Self::load().unwrap_or_else(|_| Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "chipper.db".to_string()),
            bind_port: 3000,
            mail_endpoint: std::env::var("MAIL_ENDPOINT").unwrap_or_else(|_| "http://localhost:8025/api/send".to_string()),
            mail_api_key: std::env::var("MAIL_API_KEY").unwrap_or_else(|_| "".to_string()),
            app_base_url: std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            worker_poll_secs: 5,
            send_timeout_secs: 10,
            reclaim_after_minutes: 15,
        })
    }
}
