//! 工具模块

pub mod error;
pub mod time;

pub use error::{AppError, AppResponse, AppResult, ok};
