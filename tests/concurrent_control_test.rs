// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证房间乐观锁、冲突重试与部分失败语义
// ==========================================


#[cfg(test)]
mod concurrent_control_test {
    use dorm_allocation::domain::allocation::{AllocationCriteria, AllocationRequest};
    use dorm_allocation::domain::types::Gender;
    use dorm_allocation::domain::{Room, Student};
    use dorm_allocation::engine::{
        AllocationError, AllocationOrchestrator, AllocationRepositories, CancellationFlag,
    };
    use dorm_allocation::logging;
    use dorm_allocation::repository::{
        RepositoryError, RepositoryResult, RoomRepository, SqliteRoomRepository,
        SqliteStudentRepository, StudentRepository,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::test_helpers::{
        female_room, fresh_female, fresh_male, male_room, student, TestEnv,
    };

    // ==========================================
    // 测试替身
    // ==========================================

    /// 首次保存某房间前，模拟另一进程抢先住进一名学生
    struct InterferingRoomRepo {
        inner: Arc<SqliteRoomRepository>,
        intruder: Mutex<Option<String>>,
        target_room: String,
        saves: AtomicUsize,
    }

    impl RoomRepository for InterferingRoomRepo {
        fn find_candidates(
            &self,
            gender: Gender,
            building: Option<&str>,
            block: Option<&str>,
        ) -> RepositoryResult<Vec<Room>> {
            self.inner.find_candidates(gender, building, block)
        }

        fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Room>> {
            self.inner.find_by_id(id)
        }

        fn save(&self, room: &Room) -> RepositoryResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if room.id == self.target_room {
                if let Some(intruder) = self.intruder.lock().unwrap().take() {
                    let mut current = self.inner.find_by_id(&room.id)?.unwrap();
                    current.occupants.push(intruder);
                    current.refresh_status();
                    self.inner.save(&current)?;
                }
            }
            self.inner.save(room)
        }
    }

    /// 每次保存都制造冲突
    struct AlwaysConflictRoomRepo {
        inner: Arc<SqliteRoomRepository>,
    }

    impl RoomRepository for AlwaysConflictRoomRepo {
        fn find_candidates(
            &self,
            gender: Gender,
            building: Option<&str>,
            block: Option<&str>,
        ) -> RepositoryResult<Vec<Room>> {
            self.inner.find_candidates(gender, building, block)
        }

        fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Room>> {
            self.inner.find_by_id(id)
        }

        fn save(&self, room: &Room) -> RepositoryResult<()> {
            Err(RepositoryError::OptimisticLockFailure {
                entity: "Room".to_string(),
                id: room.id.clone(),
                expected: room.revision,
                actual: room.revision + 1,
            })
        }
    }

    /// 指定学生保存失败
    struct FailingStudentRepo {
        inner: Arc<SqliteStudentRepository>,
        fail_on: String,
    }

    impl StudentRepository for FailingStudentRepo {
        fn find_unassigned(&self, criteria: &AllocationCriteria) -> RepositoryResult<Vec<Student>> {
            self.inner.find_unassigned(criteria)
        }

        fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Student>> {
            self.inner.find_by_id(id)
        }

        fn save(&self, student: &Student) -> RepositoryResult<()> {
            if student.id == self.fail_on {
                return Err(RepositoryError::DatabaseQueryError(
                    "database is locked".to_string(),
                ));
            }
            self.inner.save(student)
        }
    }

    // ==========================================
    // 乐观锁
    // ==========================================

    #[test]
    fn test_stale_revision_is_rejected() {
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 2));

        let first = env.room("r1");
        let stale = first.clone();

        let mut updated = first;
        updated.occupants.push("m1".to_string());
        updated.refresh_status();
        env.room_repo.save(&updated).unwrap();

        let err = env.room_repo.save(&stale).unwrap_err();
        match err {
            RepositoryError::OptimisticLockFailure {
                id,
                expected,
                actual,
                ..
            } => {
                assert_eq!(id, "r1");
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected OptimisticLockFailure, got {:?}", other),
        }

        // 冲突写入不改变已提交的住户
        assert_eq!(env.room("r1").occupants, vec!["m1".to_string()]);
    }

    #[test]
    fn test_save_missing_room_is_not_found() {
        let env = TestEnv::new();
        let err = env
            .room_repo
            .save(&male_room("ghost", "A", "1", 2))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    // ==========================================
    // 冲突重试
    // ==========================================

    #[tokio::test]
    async fn test_conflict_reloads_room_and_respects_new_occupant() {
        logging::init_test();
        let env = TestEnv::new();
        env.add_student(student("intruder", "Zz", Gender::Male, 1, "EE"));
        env.add_student(fresh_male("m1", "Amy"));
        env.add_student(fresh_male("m2", "Bob"));
        env.add_room(male_room("r1", "A", "1", 2));
        env.add_room(male_room("r2", "A", "2", 2));

        // 入侵者由另一运行分配（院系不在本次过滤范围内）
        let room_repo = Arc::new(InterferingRoomRepo {
            inner: env.room_repo.clone(),
            intruder: Mutex::new(Some("intruder".to_string())),
            target_room: "r1".to_string(),
            saves: AtomicUsize::new(0),
        });
        let repos = AllocationRepositories::new(env.student_repo.clone(), room_repo.clone());
        let orchestrator = AllocationOrchestrator::new(env.config.clone(), repos);

        let request = AllocationRequest {
            criteria: AllocationCriteria {
                department: Some("CS".to_string()),
                year: None,
                gender: Some(Gender::Male),
            },
            ..AllocationRequest::default()
        };
        let outcome = orchestrator
            .run(&request, &CancellationFlag::new())
            .await
            .unwrap();

        let r1 = env.room("r1");
        let r2 = env.room("r2");
        assert!(r1.occupants.len() <= r1.capacity as usize);
        assert!(r1.occupants.contains(&"intruder".to_string()));
        // 冲突后 r1 只剩一张床: Amy 入住 r1，Bob 顺延到 r2
        assert_eq!(r1.occupants.len(), 2);
        assert!(r1.occupants.contains(&"m1".to_string()));
        assert_eq!(r2.occupants, vec!["m2".to_string()]);
        assert_eq!(outcome.allocated(), 2);
        // r1 两次（冲突 + 重试），r2 一次
        assert_eq!(room_repo.saves.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_surfaces_conflict() {
        logging::init_test();
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_room(male_room("r1", "A", "1", 2));

        let repos = AllocationRepositories::new(
            env.student_repo.clone(),
            Arc::new(AlwaysConflictRoomRepo {
                inner: env.room_repo.clone(),
            }),
        );
        let orchestrator = AllocationOrchestrator::new(env.config.clone(), repos);

        let err = orchestrator
            .run(&AllocationRequest::default(), &CancellationFlag::new())
            .await
            .unwrap_err();

        match err {
            AllocationError::Persistence {
                source,
                committed,
                unallocated,
            } => {
                assert!(source.is_conflict());
                assert!(committed.is_empty());
                assert_eq!(unallocated, 1);
            }
            other => panic!("Expected Persistence, got {:?}", other),
        }
        assert!(env.student("m1").room_id.is_none());
    }

    // ==========================================
    // 部分失败
    // ==========================================

    #[tokio::test]
    async fn test_student_save_failure_reports_committed_prefix() {
        logging::init_test();
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_student(fresh_male("m2", "Bob"));
        env.add_student(fresh_male("m3", "Cal"));
        env.add_room(male_room("r1", "A", "1", 2));
        env.add_room(male_room("r2", "A", "2", 2));

        let repos = AllocationRepositories::new(
            Arc::new(FailingStudentRepo {
                inner: env.student_repo.clone(),
                fail_on: "m3".to_string(),
            }),
            env.room_repo.clone(),
        );
        let orchestrator = AllocationOrchestrator::new(env.config.clone(), repos);

        let err = orchestrator
            .run(&AllocationRequest::default(), &CancellationFlag::new())
            .await
            .unwrap_err();

        let committed: Vec<String> = err.committed().iter().map(|p| p.full_name.clone()).collect();
        // r2 的房间侧已提交，Cal 的落位同样生效
        assert_eq!(committed, vec!["Amy", "Bob", "Cal"]);
        assert_eq!(err.unallocated(), 0);
        assert!(matches!(err, AllocationError::Persistence { .. }));

        // 不回滚：r1 保持已提交状态
        assert_eq!(env.room("r1").occupants.len(), 2);
        assert_eq!(env.student("m1").room_id.as_deref(), Some("r1"));

        // 学生侧未写入，但已登记为 r2 住户，不会被再次分配
        assert!(env.student("m3").room_id.is_none());
        let again = env
            .student_repo
            .find_unassigned(&AllocationCriteria::default())
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_male_failure_counts_untouched_female_cohort_as_unallocated() {
        logging::init_test();
        let env = TestEnv::new();
        env.add_student(fresh_male("m1", "Amy"));
        env.add_student(fresh_male("m2", "Bob"));
        env.add_student(fresh_female("f1", "Cat"));
        env.add_student(fresh_female("f2", "Dee"));
        env.add_room(male_room("r1", "A", "1", 1));
        env.add_room(male_room("r2", "A", "2", 1));
        env.add_room(female_room("r3", "B", "1", 2));

        let repos = AllocationRepositories::new(
            Arc::new(FailingStudentRepo {
                inner: env.student_repo.clone(),
                fail_on: "m2".to_string(),
            }),
            env.room_repo.clone(),
        );
        let orchestrator = AllocationOrchestrator::new(env.config.clone(), repos);

        let err = orchestrator
            .run(&AllocationRequest::default(), &CancellationFlag::new())
            .await
            .unwrap_err();

        // Amy、Bob 的房间侧已提交；女生队列未开始
        assert_eq!(err.committed().len(), 2);
        assert_eq!(err.unallocated(), 2);
        assert!(env.room("r3").occupants.is_empty());
    }
}
