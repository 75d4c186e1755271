// ==========================================
// 宿舍管理系统 - 分配配置读取 Trait
// ==========================================
// 职责: 定义分配引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// AllocationConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    /// 房间乐观锁冲突时的重试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_conflict_retry_limit(&self) -> Result<u32, Box<dyn Error>>;

    /// 是否写入分配运行审计日志
    ///
    /// # 默认值
    /// - true
    async fn is_audit_log_enabled(&self) -> Result<bool, Box<dyn Error>>;

    /// 未指定操作人时使用的默认操作人
    ///
    /// # 默认值
    /// - system
    async fn get_default_actor(&self) -> Result<String, Box<dyn Error>>;
}
