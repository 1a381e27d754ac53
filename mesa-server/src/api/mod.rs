//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查接口
//! - [`tables`] - 桌台与入座接口
//! - [`reservations`] - 预订管理接口
//! - [`orders`] - 订单购物车接口
//! - [`bills`] - 账单接口
//! - [`retention`] - 清理任务手动触发接口

pub mod bills;
pub mod health;
pub mod orders;
pub mod reservations;
pub mod retention;
pub mod tables;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
