//! 服务器状态

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;

/// 服务器状态 - 持有所有共享资源的单例引用
///
/// `Clone` 是浅拷贝（连接池内部是 Arc），所有权成本极低。
/// 持久化行是唯一的共享可变资源；不依赖任何进程内全局状态保证一致性。
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 确保工作目录结构存在
    /// 2. 打开数据库 (work_dir/database/mesa.db) 并应用迁移
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_dir().join("mesa.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        Ok(Self {
            config: config.clone(),
            pool: db_service.pool,
        })
    }

    /// 获取连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
