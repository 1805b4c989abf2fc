// ==========================================
// DashboardApi 集成测试
// ==========================================
// 测试范围:
// 1. counts_by_department: 全部门计数、仅在制口径
// 2. details_by_department: 紧急评估嵌入、排序口径
// 3. load_by_department: 超载阈值标记
// 4. 读侧口径: 写路径变更后轮询可见
// ==========================================

mod helpers;

use chrono::Duration;
use gunstock_aps::config::SchedulingPolicy;
use gunstock_aps::domain::types::{Department, StageAlert, UrgencyTier};
use helpers::*;

// ==========================================
// counts_by_department
// ==========================================

#[test]
fn test_counts_全部门在场() {
    let env = ApiTestEnv::new();
    env.insert(&OrderBuilder::new("GS-1").department(Department::Layup).due_in_days(10).build());
    env.insert(&OrderBuilder::new("GS-2").department(Department::Layup).due_in_days(5).build());
    env.insert(&OrderBuilder::new("GS-3").department(Department::Qc).due_in_days(3).build());

    let counts = env.dashboard_api.counts_by_department().expect("计数失败");

    assert_eq!(counts.len(), Department::SEQUENCE.len(), "空部门也必须在场");
    assert_eq!(counts[&Department::Layup], 2);
    assert_eq!(counts[&Department::Qc], 1);
    assert_eq!(counts[&Department::Shipping], 0);
}

#[test]
fn test_counts_报废单不计入() {
    let env = ApiTestEnv::new();
    env.insert(&OrderBuilder::new("GS-1").department(Department::Paint).due_in_days(10).build());
    env.insert(&OrderBuilder::new("GS-2").department(Department::Paint).due_in_days(10).build());

    env.pipeline_api
        .scrap("GS-2", "色差超标", "废弃", "mgr1")
        .expect("报废失败");

    let counts = env.dashboard_api.counts_by_department().expect("计数失败");
    assert_eq!(counts[&Department::Paint], 1, "已报废订单不计入看板");
}

// ==========================================
// details_by_department
// ==========================================

#[test]
fn test_details_嵌入完整紧急评估() {
    let env = ApiTestEnv::new();
    // 超期单 + 在段超时单,两个信号都要可见
    env.insert(
        &OrderBuilder::new("GS-OVERDUE")
            .department(Department::Finish)
            .due_in_days(-2)
            .build(),
    );
    env.insert(
        &OrderBuilder::new("GS-STALE")
            .department(Department::Finish)
            .due_in_days(30)
            .entered_days_ago(9)
            .build(),
    );

    let details = env.dashboard_api.details_by_department().expect("明细失败");
    let finish = &details[&Department::Finish];
    assert_eq!(finish.len(), 2);

    // 交期升序: 超期单在前
    let overdue = &finish[0];
    assert_eq!(overdue.order_id, "GS-OVERDUE");
    assert_eq!(overdue.urgency.tier, UrgencyTier::Critical);
    assert_eq!(overdue.urgency.stage_alert, StageAlert::OnTrack);
    assert_eq!(overdue.urgency.days_to_due, Some(-2));

    let stale = &finish[1];
    assert_eq!(stale.urgency.tier, UrgencyTier::Normal);
    assert_eq!(stale.urgency.stage_alert, StageAlert::DeptOverdue, "在段超时应独立标记");
    assert_eq!(stale.urgency.days_in_department, 9);
}

#[test]
fn test_details_入口段按队列位置排序() {
    let env = ApiTestEnv::new();
    env.insert(&OrderBuilder::new("GS-1").due_in_days(20).build());
    env.insert(&OrderBuilder::new("GS-2").due_in_days(-1).build());
    env.insert(&OrderBuilder::new("GS-3").due_in_days(5).build());
    env.queue_api.auto_populate().expect("编位失败");

    let details = env.dashboard_api.details_by_department().expect("明细失败");
    let entry = &details[&Department::ProductionQueue];

    // 自动编位按初始分排: 超期 > 近交期 > 远交期,明细顺序与之一致
    assert_eq!(
        entry.iter().map(|s| s.order_id.as_str()).collect::<Vec<_>>(),
        vec!["GS-2", "GS-3", "GS-1"]
    );
    assert_eq!(entry[0].queue_position, Some(1));
    assert!(entry[0].priority_score.is_some());
}

#[test]
fn test_details_交期缺失单殿后且为未知等级() {
    let env = ApiTestEnv::new();
    env.insert(
        &OrderBuilder::new("GS-NODUE")
            .department(Department::Cnc)
            .build(),
    );
    env.insert(
        &OrderBuilder::new("GS-DUE")
            .department(Department::Cnc)
            .due_in_days(2)
            .build(),
    );

    let details = env.dashboard_api.details_by_department().expect("明细失败");
    let cnc = &details[&Department::Cnc];

    assert_eq!(cnc[0].order_id, "GS-DUE");
    assert_eq!(cnc[1].order_id, "GS-NODUE", "缺交期排最后");
    assert_eq!(cnc[1].urgency.tier, UrgencyTier::Unknown);
    assert_eq!(cnc[1].urgency.days_to_due, None);
}

// ==========================================
// load_by_department
// ==========================================

#[test]
fn test_load_超载标记依策略阈值() {
    let mut policy = SchedulingPolicy::default();
    policy.overload_threshold = 2;
    let env = ApiTestEnv::with_policy(policy);

    for i in 0..3 {
        env.insert(
            &OrderBuilder::new(&format!("GS-{}", i))
                .department(Department::Gunsmith)
                .due_in_days(10)
                .build(),
        );
    }
    env.insert(&OrderBuilder::new("GS-X").department(Department::Layup).due_in_days(10).build());

    let load = env.dashboard_api.load_by_department().expect("负载失败");
    assert_eq!(load[&Department::Gunsmith].count, 3);
    assert!(load[&Department::Gunsmith].overloaded, "3 > 2 应标记超载");
    assert!(!load[&Department::Layup].overloaded);
    assert!(!load[&Department::Shipping].overloaded, "空部门不超载");
}

// ==========================================
// 读侧轮询口径
// ==========================================

#[test]
fn test_看板反映写路径变更() {
    let env = ApiTestEnv::new();
    env.insert(
        &OrderBuilder::new("GS-1001")
            .department(Department::Layup)
            .due_in_days(4)
            .build(),
    );

    let counts = env.dashboard_api.counts_by_department().expect("计数失败");
    assert_eq!(counts[&Department::Layup], 1);

    env.pipeline_api.progress("GS-1001", None).expect("转移失败");

    let counts = env.dashboard_api.counts_by_department().expect("计数失败");
    assert_eq!(counts[&Department::Layup], 0);
    assert_eq!(counts[&Department::Plugging], 1, "转移后看板应随查询可见");

    // 转移重置进段时间: 推进时钟后 days_in_department 从零起算
    env.clock.advance(Duration::days(2));
    let details = env.dashboard_api.details_by_department().expect("明细失败");
    let plugging = &details[&Department::Plugging];
    assert_eq!(plugging[0].urgency.days_in_department, 2);
}
