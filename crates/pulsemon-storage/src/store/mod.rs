use crate::error::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

pub mod alert;
pub mod metric;
pub mod rule;

pub use alert::{AlertFilter, SeverityCount};
pub use rule::RuleFilter;

/// 告警数据库的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
/// 同时实现引擎的 `RuleRepository` / `AlertRepository` trait，
/// 由调用方以 `Arc<Store>` 注入。
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// 连接并初始化数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，由调用方（服务器配置）提供。
    ///   SQLite 示例：`sqlite://data/pulsemon.db?mode=rwc`
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(db_url.to_string());
        if db_url.contains(":memory:") {
            // Pooled connections to :memory: each open a distinct database;
            // a single connection keeps tests on one schema.
            options.max_connections(1).min_connections(1);
        }
        let db = Database::connect(options).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
            db.execute_unprepared("PRAGMA foreign_keys=ON;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized store (SeaORM)");
        Ok(Self { db })
    }

    /// 返回底层数据库连接引用（供子模块使用）。
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
