// ==========================================
// AllocationApi 集成测试
// ==========================================
// 职责: 验证请求校验、运行互斥、审计日志与响应结构
// ==========================================


#[cfg(test)]
mod allocation_api_test {
    use dorm_allocation::api::{AllocationApi, ApiError, CriteriaDto, RunAllocationRequest};
    use dorm_allocation::app::AppState;
    use dorm_allocation::config::config_keys;
    use dorm_allocation::domain::allocation::AllocationCriteria;
    use dorm_allocation::domain::types::AllocationRunOutcome;
    use dorm_allocation::domain::Student;
    use dorm_allocation::engine::{AllocationRepositories, CancellationFlag};
    use dorm_allocation::logging;
    use dorm_allocation::repository::{
        RepositoryResult, SqliteStudentRepository, StudentRepository,
    };
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::test_helpers::{fresh_female, fresh_male, female_room, male_room, TestEnv};

    /// 首次查询候选学生时阻塞，直到测试放行（此时运行锁被持有）
    struct GatedStudentRepo {
        inner: Arc<SqliteStudentRepository>,
        gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    }

    impl StudentRepository for GatedStudentRepo {
        fn find_unassigned(&self, criteria: &AllocationCriteria) -> RepositoryResult<Vec<Student>> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                entered.send(()).unwrap();
                release.recv_timeout(Duration::from_secs(10)).unwrap();
            }
            self.inner.find_unassigned(criteria)
        }

        fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>> {
            self.inner.find_by_id(id)
        }

        fn save(&self, student: &Student) -> RepositoryResult<()> {
            self.inner.save(student)
        }
    }

    fn setup_api(env: &TestEnv) -> AllocationApi {
        logging::init_test();
        AllocationApi::new(env.config.clone(), env.repos(), env.log_repo.clone())
    }

    #[tokio::test]
    async fn test_run_allocation_response_shape() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_student(fresh_male("m2", "Bob"));
        env.add_student(fresh_female("f1", "Cat"));
        env.add_room(male_room("r1", "BuildingX", "101", 1));
        env.add_room(female_room("r2", "BuildingY", "201", 2));
        let api = setup_api(&env);

        let response = api
            .run_allocation(RunAllocationRequest::default(), Some("admin"))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], json!(true));
        assert_eq!(value["allocated"], json!(2));
        assert_eq!(value["unallocated"], json!(1));
        assert_eq!(value["details"]["malesAllocated"], json!(1));
        assert_eq!(value["details"]["femalesAllocated"], json!(1));
        assert_eq!(value["details"]["unallocatedMales"], json!(1));
        assert_eq!(value["details"]["unallocatedFemales"], json!(0));
        assert_eq!(value["details"]["excludedStudents"], json!(0));
        assert_eq!(
            value["details"]["allocations"],
            json!([
                { "studentId": "NO-m1", "fullName": "Amy", "room": "BuildingX-101", "year": 1, "department": "CS" },
                { "studentId": "NO-f1", "fullName": "Cat", "room": "BuildingY-201", "year": 1, "department": "CS" }
            ])
        );
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_running() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 1));
        let api = setup_api(&env);

        let request = RunAllocationRequest {
            criteria: Some(CriteriaDto {
                gender: Some("Co-ed".to_string()),
                ..CriteriaDto::default()
            }),
            ..RunAllocationRequest::default()
        };
        let err = api.run_allocation(request, None).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(env.student("m1").room_id.is_none());
        assert!(api.list_recent_runs(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_audit_log() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 2));
        let api = setup_api(&env);

        let request: RunAllocationRequest = serde_json::from_value(json!({
            "criteria": { "department": "CS" },
            "targetBuilding": "A"
        }))
        .unwrap();
        api.run_allocation(request, Some("admin")).await.unwrap();

        let runs = api.list_recent_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.actor, "admin");
        assert_eq!(run.outcome, AllocationRunOutcome::Success.to_db_str());
        assert_eq!(run.allocated, 1);
        assert_eq!(run.unallocated, 0);
        assert_eq!(run.request["criteria"]["department"], json!("CS"));
        assert_eq!(run.request["target"]["building"], json!("A"));
        assert_eq!(run.placements[0]["full_name"], json!("Amy"));

        let fetched = api.get_run(&run.run_id).unwrap();
        assert_eq!(fetched.run_id, run.run_id);
    }

    #[tokio::test]
    async fn test_default_actor_comes_from_config() {
        let env = TestEnv::new();
        env.config
            .set_global_config_value(config_keys::DEFAULT_ACTOR, "registrar")
            .unwrap();
        let api = setup_api(&env);

        api.run_allocation(RunAllocationRequest::default(), None)
            .await
            .unwrap();
        api.run_allocation(RunAllocationRequest::default(), Some("  "))
            .await
            .unwrap();

        let runs = api.list_recent_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.actor == "registrar"));
    }

    #[tokio::test]
    async fn test_audit_log_can_be_disabled() {
        let env = TestEnv::new();
        env.config
            .set_global_config_value(config_keys::AUDIT_LOG_ENABLED, "false")
            .unwrap();
        let api = setup_api(&env);

        api.run_allocation(RunAllocationRequest::default(), None)
            .await
            .unwrap();

        assert!(api.list_recent_runs(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_is_logged_with_outcome() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_student(fresh_male("m2", "Bob"));
        env.add_room(male_room("r1", "A", "1", 2));
        let api = setup_api(&env);

        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = api
            .run_allocation_with_cancel(RunAllocationRequest::default(), None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Cancelled { .. }));
        let runs = api.list_recent_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].outcome, AllocationRunOutcome::Cancelled.to_db_str());
        assert_eq!(runs[0].allocated, 0);
        assert_eq!(runs[0].unallocated, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_run_rejected_while_first_holds_lock() {
        logging::init_test();
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 2));

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let student_repo = Arc::new(GatedStudentRepo {
            inner: env.student_repo.clone(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        });
        let api = Arc::new(AllocationApi::new(
            env.config.clone(),
            AllocationRepositories::new(student_repo, env.room_repo.clone()),
            env.log_repo.clone(),
        ));

        let first = tokio::spawn({
            let api = api.clone();
            async move {
                api.run_allocation(RunAllocationRequest::default(), Some("first"))
                    .await
            }
        });

        // 第一个运行已进入查询阶段，运行锁被持有
        tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(10)))
            .await
            .unwrap()
            .unwrap();

        let second = api
            .run_allocation(RunAllocationRequest::default(), Some("second"))
            .await;
        assert!(matches!(second, Err(ApiError::AllocationInProgress)));

        release_tx.send(()).unwrap();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.allocated, 1);

        // 锁释放后可再次运行（已无候选）
        let third = api
            .run_allocation(RunAllocationRequest::default(), Some("third"))
            .await
            .unwrap();
        assert_eq!(third.allocated, 0);
        assert_eq!(env.room("r1").occupants.len(), 1);

        // 被拒绝的请求不写审计日志
        let actors: Vec<String> = api
            .list_recent_runs(10)
            .unwrap()
            .into_iter()
            .map(|r| r.actor)
            .collect();
        assert_eq!(actors, vec!["third".to_string(), "first".to_string()]);
    }

    #[test]
    fn test_get_run_unknown_id_is_not_found() {
        let env = TestEnv::new();
        let api = setup_api(&env);
        assert!(matches!(api.get_run("missing"), Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_app_state_wires_allocation_api() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 2));
        let state = AppState::new(env.db_path.clone()).unwrap();
        let response = state
            .allocation_api
            .run_allocation(RunAllocationRequest::default(), None)
            .await
            .unwrap();

        assert_eq!(response.allocated, 1);
        assert_eq!(state.allocation_api.list_recent_runs(5).unwrap()[0].actor, "system");
    }
}
