//! 服务器配置
//!
//! # 环境变量
//!
//! 所有配置项都可以通过环境变量覆盖：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | WORK_DIR | /var/lib/mesa | 工作目录 (数据库、上传文件) |
//! | HTTP_PORT | 3000 | HTTP 服务端口 |
//! | BUSINESS_TZ | UTC | 业务时区 (清理任务调度用) |
//! | VAT_RATE | 0.10 | 增值税率 |
//! | SERVICE_RATE | 0.05 | 服务费率 |
//! | SERVICE_CAP | 100.00 | 服务费上限 |
//! | ORDER_RETENTION_DAYS | 7 | 订单/账单保留天数 |
//! | RESERVATION_RETENTION_DAYS | 30 | 预订保留天数 |

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::billing::BillingConfig;
use crate::utils::time::parse_tz;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和上传文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 业务时区 (调度和日期边界计算)
    pub business_tz: Tz,
    /// 账单费率 (显式传入计算器，测试可注入备用费率)
    pub billing: BillingConfig,
    /// 订单/账单保留窗口 (天)
    pub order_retention_days: i64,
    /// 预订保留窗口 (天)
    pub reservation_retention_days: i64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/mesa".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            business_tz: parse_tz(
                &std::env::var("BUSINESS_TZ").unwrap_or_else(|_| "UTC".into()),
            ),
            billing: BillingConfig {
                vat_rate: env_f64("VAT_RATE", 0.10),
                service_rate: env_f64("SERVICE_RATE", 0.05),
                service_cap: env_f64("SERVICE_CAP", 100.00),
            },
            order_retention_days: env_i64("ORDER_RETENTION_DAYS", 7),
            reservation_retention_days: env_i64("RESERVATION_RETENTION_DAYS", 30),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件目录
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 上传文件目录 (孤儿文件清理的扫描目标)
    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("uploads")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
