use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;

use infrastructure::audit_log::SqliteAuditLog;
use infrastructure::content_store::SqliteContentStore;
use infrastructure::favorite_ledger::SqliteFavoriteLedger;
use infrastructure::mailer::WebhookMailer;
use infrastructure::notification_queue::SqliteNotificationQueue;
use shared::config::ChipperConfig;
use shared::health::HealthMonitor;

mod dispatcher;
mod importer;
mod server;
mod service;
mod worker;

use dispatcher::NotificationDispatcher;
use server::router::{create_router, AppState};
use service::FavoriteService;
use worker::NotificationWorker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// APIサーバーと通知ワーカーを起動する
    Serve {
        /// 待ち受けポート (省略時は設定値)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// JSONエンドポイントからユーザーを一括インポートする
    ImportUsers {
        /// ユーザーのJSONペイロードを指すURL
        url: String,
        /// インポートする最大件数
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // 1. 設定を読み込む
    let config = ChipperConfig::default();
    info!("⚙️  Config loaded:");
    info!("   Database: {}", config.database_path);
    info!("   Mail:     {}", config.mail_endpoint);

    match args.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::ImportUsers { url, limit } => {
            let store = Arc::new(SqliteContentStore::new(&config.database_path).await?);
            let report = importer::import_users(store, &url, limit).await?;

            if report.failed > 0 {
                for failure in &report.failures {
                    info!("   - {}", failure);
                }
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            serve(&config, port.unwrap_or(config.bind_port)).await?;
        }
    }

    Ok(())
}

async fn serve(config: &ChipperConfig, port: u16) -> Result<(), anyhow::Error> {
    // 2. ストレージ層の初期化（台帳・コンテンツ・キュー・監査ログ）
    let ledger = Arc::new(SqliteFavoriteLedger::new(&config.database_path).await?);
    let store = Arc::new(SqliteContentStore::new(&config.database_path).await?);
    let queue = Arc::new(SqliteNotificationQueue::new(&config.database_path).await?);
    let audit = Arc::new(SqliteAuditLog::new(&config.database_path).await?);

    // 3. 配送チャネルとドメインサービス
    let mailer = Arc::new(WebhookMailer::new(
        config.mail_endpoint.clone(),
        config.mail_api_key.clone(),
        config.app_base_url.clone(),
        config.send_timeout_secs,
    )?);

    let favorites = Arc::new(FavoriteService::new(
        ledger.clone(),
        store.clone(),
        audit,
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        ledger,
        store.clone(),
        mailer,
        Duration::from_secs(config.send_timeout_secs),
    ));

    // 4. 通知ワーカーをバックグラウンドで起動
    let notification_worker = Arc::new(NotificationWorker::new(
        queue.clone(),
        dispatcher,
        config.worker_poll_secs,
        config.reclaim_after_minutes,
    ));
    tokio::spawn(notification_worker.start_loop());

    // 5. APIサーバー
    let state = Arc::new(AppState {
        favorites,
        store,
        queue,
        health: Arc::new(Mutex::new(HealthMonitor::new())),
    });
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("🐦 Chipper API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
