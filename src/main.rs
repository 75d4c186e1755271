// ==========================================
// 宿舍管理系统 - 命令行入口
// ==========================================
// 子命令: init-db / allocate / history
// 输出: JSON（stdout），日志写 stderr
// ==========================================

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use dorm_allocation::api::{ApiError, CriteriaDto, RunAllocationRequest, DEFAULT_HISTORY_LIMIT};
use dorm_allocation::app::{get_default_db_path, AppState};
use dorm_allocation::engine::CancellationFlag;
use dorm_allocation::{logging, APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "dorm-allocation", version, about = "宿舍床位自动分配")]
struct Cli {
    /// 数据库文件路径（默认: 用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 初始化数据库表结构（幂等）
    InitDb,

    /// 执行一次自动分配
    Allocate {
        /// 院系过滤
        #[arg(long)]
        department: Option<String>,

        /// 年级过滤（>= 1）
        #[arg(long)]
        year: Option<i64>,

        /// 性别过滤（M / F）
        #[arg(long)]
        gender: Option<String>,

        /// 目标楼栋
        #[arg(long)]
        building: Option<String>,

        /// 目标楼区
        #[arg(long)]
        block: Option<String>,

        /// 操作人（默认读取配置）
        #[arg(long)]
        actor: Option<String>,
    },

    /// 查看分配运行历史
    History {
        /// 返回条数
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,

        /// 查询单次运行
        #[arg(long)]
        run_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    info!(version = VERSION, "{} 启动", APP_NAME);

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let committed = err
                .downcast_ref::<ApiError>()
                .map(|e| e.committed().to_vec())
                .unwrap_or_default();
            println!(
                "{}",
                json!({
                    "success": false,
                    "message": err.to_string(),
                    "committed": committed,
                })
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    match cli.command {
        Command::InitDb => Ok(serde_json::to_string_pretty(&json!({
            "success": true,
            "dbPath": state.get_db_path(),
        }))?),

        Command::Allocate {
            department,
            year,
            gender,
            building,
            block,
            actor,
        } => {
            let request = RunAllocationRequest {
                criteria: Some(CriteriaDto {
                    department,
                    year,
                    gender,
                }),
                target_building: building,
                target_block: block,
            };

            // Ctrl-C 在房间边界生效
            let cancel = CancellationFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到中断信号, 将在当前房间提交后停止");
                    on_signal.cancel();
                }
            });

            let response = state
                .allocation_api
                .run_allocation_with_cancel(request, actor.as_deref(), &cancel)
                .await?;
            Ok(serde_json::to_string_pretty(&response)?)
        }

        Command::History { limit, run_id } => match run_id {
            Some(run_id) => {
                let run = state.allocation_api.get_run(&run_id)?;
                Ok(serde_json::to_string_pretty(&run)?)
            }
            None => {
                let runs = state.allocation_api.list_recent_runs(limit)?;
                Ok(serde_json::to_string_pretty(&runs)?)
            }
        },
    }
}
