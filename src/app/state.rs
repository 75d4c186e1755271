// ==========================================
// 宿舍管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::AllocationApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::AllocationRepositories;
use crate::repository::{
    AllocationLogRepository, SqliteRoomRepository, SqliteStudentRepository,
};

/// 环境变量: 显式指定数据库路径
pub const DB_PATH_ENV: &str = "DORM_ALLOCATION_DB_PATH";

/// 应用状态
///
/// 包含API实例和共享资源，所有仓储共用一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 自动分配API
    pub allocation_api: Arc<AllocationApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 学生仓储（导入/查询用）
    pub student_repo: Arc<SqliteStudentRepository>,

    /// 房间仓储（导入/查询用）
    pub room_repo: Arc<SqliteRoomRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化所有Repository
    /// 3. 创建API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let student_repo = Arc::new(SqliteStudentRepository::new(conn.clone()));
        let room_repo = Arc::new(SqliteRoomRepository::new(conn.clone()));
        let allocation_log_repo = Arc::new(AllocationLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let repos = AllocationRepositories::new(student_repo.clone(), room_repo.clone());
        let allocation_api = Arc::new(AllocationApi::new(
            config_manager.clone(),
            repos,
            allocation_log_repo,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            allocation_api,
            config_manager,
            student_repo,
            room_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 DORM_ALLOCATION_DB_PATH（非空时优先）
/// - 否则: 用户数据目录/dorm-allocation/dorm_allocation.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 拿不到 data_dir 时回落到当前目录
    let mut path = PathBuf::from("./dorm_allocation.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("dorm-allocation");
        // best-effort: 目录创建失败时由打开数据库时报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("dorm_allocation.db");
    }

    path.to_string_lossy().to_string()
}
