//! Mesa Server - 餐厅桌台/预订/订单时序一致性引擎
//!
//! # 架构概述
//!
//! 单一 SQLite 持久化行是唯一事实来源；所有多步状态转换在单个事务内
//! 完成，并发冲突表现为领域错误而非部分写入。
//!
//! - **座位状态机** (`seating`): 桌台占用转换 + 预订时钟
//! - **订单购物车** (`orders`): 每桌至多一个活动订单
//! - **账单计算** (`billing`): 税费/服务费/账单生成
//! - **清理任务** (`retention`): 逾期重检与数据保留
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! mesa-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── seating/       # 座位状态机、预订时钟
//! ├── orders/        # 订单购物车
//! ├── billing/       # 账单计算
//! ├── retention/     # 清理调度与执行
//! ├── db/            # 数据库层 (sqlx + SQLite)
//! └── utils/         # 错误、时间工具
//! ```

pub mod api;
pub mod billing;
pub mod core;
pub mod db;
pub mod orders;
pub mod retention;
pub mod seating;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();
}

pub fn print_banner() {
    println!(
        r#"
   __  ___
  /  |/  /__  _________ _
 / /|_/ / _ \/ ___/ __ `/
/ /  / /  __(__  ) /_/ /
/_/  /_/\___/____/\__,_/
    "#
    );
}
