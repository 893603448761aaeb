//! # Kanri サーバー
//!
//! 管理画面向け API サーバーのエントリーポイント。
//!
//! ## 構成
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Browser    │────▶│ kanri-server │────▶│    MySQL     │
//! │  (管理画面)   │     │  port: 8080  │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                        │          │
//!                        ▼          ▼
//!                ┌──────────┐  ┌──────────────┐
//!                │  Redis   │  │ Redis (queue)│
//!                │ (token)  │  │              │
//!                └──────────┘  └──────────────┘
//! ```
//!
//! 環境変数は [`kanri_server::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env.development を使用）
//! APP_ENV=development cargo run -p kanri-server
//!
//! # 本番環境（環境変数を直接指定）
//! JWT_SECRET=... MYSQL_HOST=... cargo run -p kanri-server --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use kanri_domain::clock::SystemClock;
use kanri_infra::{
    Argon2PasswordChecker,
    RedisSubmitLock,
    RedisTokenStore,
    db,
    redis::create_connection_manager,
    repository::{MySqlOperationLogRepository, MySqlUserRepository},
};
use kanri_server::{
    app_builder::build_app,
    config::{AppConfig, load_env_file},
    guard::Throttler,
    handler::{MySqlProbe, ReadinessProbe, RedisProbe},
    jwt::JwtService,
    state::AppState,
};
use kanri_shared::observability::{TracingConfig, init_tracing};
use tokio::{net::TcpListener, signal};

/// サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. env ファイルの読み込み
/// 2. アプリケーション設定の読み込み
/// 3. トレーシングの初期化
/// 4. MySQL・Redis への接続（必要ならマイグレーション）
/// 5. HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = load_env_file();

    let config = AppConfig::from_env().context("設定の読み込みに失敗しました")?;

    init_tracing(TracingConfig::from_env("kanri").with_sql_logging(config.database.logging));
    let _tracing_guard = tracing::info_span!("app", service = "kanri").entered();
    if let Some(path) = env_file {
        tracing::info!(path = %path.display(), "env ファイルを読み込みました");
    }
    tracing::debug!(?config, "設定を読み込みました");
    if config.is_demo_environment {
        tracing::warn!("デモモードで起動します（書き込み操作は拒否されます）");
    }

    let pool = db::create_pool(&config.database.url(), config.database.logging)
        .await
        .context("MySQL への接続に失敗しました")?;
    if config.database.synchronize {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションの適用に失敗しました")?;
        tracing::info!("マイグレーションを適用しました");
    }

    let redis = create_connection_manager(&config.redis.url())
        .await
        .context("Redis への接続に失敗しました")?;
    let queue_redis = create_connection_manager(&config.queue_redis.url())
        .await
        .context("ジョブキュー用 Redis への接続に失敗しました")?;

    let readiness_probes: Vec<Arc<dyn ReadinessProbe>> = vec![
        Arc::new(MySqlProbe(pool.clone())),
        Arc::new(RedisProbe {
            name: "redis",
            conn: redis.clone(),
        }),
        Arc::new(RedisProbe {
            name: "queue_redis",
            conn: queue_redis,
        }),
    ];

    let state = AppState {
        jwt: JwtService::new(&config.jwt.secret),
        throttler: Arc::new(Throttler::new(&config.throttle)),
        token_store: Arc::new(RedisTokenStore::new(redis.clone())),
        submit_lock: Arc::new(RedisSubmitLock::new(redis)),
        user_repository: Arc::new(MySqlUserRepository::new(pool.clone())),
        operation_log_repository: Arc::new(MySqlOperationLogRepository::new(pool)),
        password_checker: Arc::new(
            Argon2PasswordChecker::new().context("パスワード検証器の初期化に失敗しました")?,
        ),
        clock: Arc::new(SystemClock),
        readiness_probes: Arc::new(readiness_probes),
        config: Arc::new(config),
    };

    spawn_throttle_cleanup(state.throttler.clone());

    let addr = state.config.bind_addr();
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("{addr} へのバインドに失敗しました"))?;
    tracing::info!("Kanri サーバーが起動しました: {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Kanri サーバーを停止しました");
    Ok(())
}

/// レート制限バケットの掃除を TTL ごとに回す
fn spawn_throttle_cleanup(throttler: Arc<Throttler>) {
    let Some(period) = throttler.cleanup_interval() else {
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            throttler.cleanup();
        }
    });
}

/// Ctrl+C または SIGTERM で終了する
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C ハンドラの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM ハンドラの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C を受信しました。停止します"),
        _ = terminate => tracing::info!("SIGTERM を受信しました。停止します"),
    }
}
