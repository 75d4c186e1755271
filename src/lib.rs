// ==========================================
// 宿舍管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 宿舍床位自动分配（按性别分区、逐间填满）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装与入口支持
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AllocationRunOutcome, Gender, RoomGender, RoomStatus};

// 领域实体
pub use domain::{
    AllocationCriteria, AllocationLog, AllocationOutcome, AllocationRequest, AllocationTarget,
    PlacementRecord, Room, Student,
};

// 引擎
pub use engine::{
    AllocationError, AllocationOrchestrator, BinFiller, CancellationFlag, GenderPartitioner,
    OrderingPolicy,
};

// API
pub use api::{AllocationApi, ApiError, RunAllocationRequest, RunAllocationResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "宿舍自动分配系统";
