// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 运行 → 明细 → 改量审计在同一数据库文件上的持久化
// ==========================================

mod test_helpers;

use chrono::Utc;
use fc_replenishment::domain::records::{ShortfallRecord, TransferRecord};
use fc_replenishment::domain::run::{OverrideLog, ReplenishmentRun};
use fc_replenishment::domain::types::RunStatus;
use fc_replenishment::repository::{
    OverrideLogRepository, PlanLineRepository, RepositoryError, RunRepository,
};

fn create_test_run(run_id: &str, week: &str) -> ReplenishmentRun {
    let now = Utc::now().naive_utc();
    ReplenishmentRun {
        run_id: run_id.to_string(),
        brand: "ACME".to_string(),
        week: week.to_string(),
        status: RunStatus::Draft,
        blocked_reason: None,
        params_json: Some("{}".to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn create_test_line(sku: &str, shortfall: i64) -> ShortfallRecord {
    ShortfallRecord {
        sku: sku.to_string(),
        fc: None,
        avg_rate_per_period: 5.0,
        requirement: 10,
        net_available: 10 - shortfall,
        raw_shortfall: shortfall,
        safety_cap: 12,
        capped_shortfall: shortfall,
        lot_size: None,
        shortfall,
    }
}

#[test]
fn test_run_lifecycle_survives_reopen() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");

    {
        let conn = test_helpers::open_shared_conn(&db_path).unwrap();
        let runs = RunRepository::new(conn.clone());
        let lines = PlanLineRepository::new(conn);

        runs.create(&create_test_run("run-1", "2024-10")).unwrap();
        let written = lines
            .insert_replenishment_lines("run-1", &[create_test_line("A", 4), create_test_line("B", 0)])
            .unwrap();
        assert_eq!(written, 2);
        lines
            .insert_transfer_lines(
                "run-1",
                &[TransferRecord {
                    sku: "A".to_string(),
                    from_fc: "BLR7".to_string(),
                    to_fc: "DEL4".to_string(),
                    transfer_qty: 3,
                }],
            )
            .unwrap();
        runs.update_status("run-1", RunStatus::Locked, None).unwrap();
    }

    // 重新打开数据库文件
    let conn = test_helpers::open_shared_conn(&db_path).unwrap();
    let runs = RunRepository::new(conn.clone());
    let lines = PlanLineRepository::new(conn);

    let run = runs.find_by_id("run-1").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Locked);
    let stored = lines.find_replenishment_lines("run-1").unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.contains(&create_test_line("A", 4)));
    assert_eq!(lines.find_transfer_lines("run-1").unwrap()[0].transfer_qty, 3);
}

#[test]
fn test_terminal_status_is_final() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let runs = RunRepository::new(test_helpers::open_shared_conn(&db_path).unwrap());

    runs.create(&create_test_run("run-2", "2024-11")).unwrap();
    runs.update_status("run-2", RunStatus::Blocked, Some("台账检查失败"))
        .unwrap();

    let err = runs
        .update_status("run-2", RunStatus::Locked, None)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

    let run = runs.find_by_id("run-2").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Blocked);
    assert_eq!(run.blocked_reason.as_deref(), Some("台账检查失败"));
}

#[test]
fn test_runs_grouped_by_brand_week() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let runs = RunRepository::new(test_helpers::open_shared_conn(&db_path).unwrap());

    runs.create(&create_test_run("r-a", "2024-10")).unwrap();
    runs.create(&create_test_run("r-b", "2024-10")).unwrap();
    runs.create(&create_test_run("r-c", "2024-11")).unwrap();

    assert_eq!(runs.find_by_brand_week("ACME", "2024-10").unwrap().len(), 2);
    assert_eq!(runs.find_by_brand_week("ACME", "2024-12").unwrap().len(), 0);
    assert!(matches!(
        runs.create(&create_test_run("r-a", "2024-10")),
        Err(RepositoryError::UniqueConstraintViolation(_))
    ));
}

#[test]
fn test_override_audit_trail() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let conn = test_helpers::open_shared_conn(&db_path).unwrap();
    let runs = RunRepository::new(conn.clone());
    let overrides = OverrideLogRepository::new(conn);

    runs.create(&create_test_run("run-3", "2024-12")).unwrap();
    let entry = OverrideLog {
        run_id: "run-3".to_string(),
        sku: "A".to_string(),
        fc: "DEL4".to_string(),
        field_changed: "send_qty".to_string(),
        old_value: 18,
        new_value: 12,
        reason: "促销结束".to_string(),
        user_name: "planner".to_string(),
        created_at: Utc::now().naive_utc(),
    };
    overrides.insert(&entry).unwrap();

    let blank_reason = OverrideLog {
        reason: "  ".to_string(),
        ..entry.clone()
    };
    assert!(matches!(
        overrides.insert(&blank_reason),
        Err(RepositoryError::FieldValueError { .. })
    ));

    let trail = overrides.find_by_run("run-3").unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].new_value, 12);
    assert_eq!(test_helpers::count_rows(&db_path, "override_log"), 1);
}
