mod common;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use assistant_cli::{
    assistants::runs::Status,
    harness::{
        knowledge::{KnowledgeDocument, KnowledgeIndex},
        ensure_passed, report, run_bounded, Harness, TestPlan,
    },
    tools::ToolRegistry,
    Error,
};
use common::{requires_action, FakeApi, REPLY};
use tokio_util::sync::CancellationToken;

fn plan(messages: &[&str], times: usize) -> TestPlan {
    serde_json::from_value(serde_json::json!({
        "messages": messages,
        "times": times,
    }))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn bounded_runs_keep_order_and_limit() {
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let results = run_bounded(10, 4, |i| {
        let (in_flight, peak) = (&in_flight, &peak);
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // Later jobs finish sooner, so completion order differs from input order.
            tokio::time::sleep(Duration::from_millis(100 * (10 - i) as u64)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            i
        }
    })
    .await;

    assert_eq!(results, (0..10).collect::<Vec<_>>());
    assert_eq!(peak.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn zero_limit_still_makes_progress() {
    let results = run_bounded(3, 0, |i| async move { i * 2 }).await;
    assert_eq!(results, vec![0, 2, 4]);
}

#[tokio::test(start_paused = true)]
async fn single_turn_scenario_yields_one_item() {
    let api = FakeApi::new();
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了"], 1);

    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。").run().await;

    assert_eq!(scenarios.len(), 1);
    assert!(scenarios[0].error.is_none());
    let items = &scenarios[0].items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].user_message, "我忘记密码了");
    assert_eq!(items[0].assistant_messages, vec![REPLY.to_string()]);
    assert_eq!(items[0].status, Some(Status::Completed));
    assert!(items[0].tool_calls.is_empty());
}

#[tokio::test(start_paused = true)]
async fn tool_calls_are_recorded_per_turn() {
    let api = FakeApi::scripted([requires_action(
        "run_1",
        "thread_1",
        &[("call_a", "reset_password", r#"{"clientId":"u123"}"#)],
    )]);
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了", "谢谢"], 1);

    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。").run().await;

    let items = &scenarios[0].items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].tool_calls.len(), 1);
    assert_eq!(items[0].tool_calls[0].name, "reset_password");
    assert_eq!(items[0].tool_calls[0].arguments["clientId"], "u123");
    assert!(items[1].tool_calls.is_empty());
    assert_eq!(items[1].assistant_messages, vec![REPLY.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn every_scenario_gets_its_own_assistant() {
    let api = FakeApi::new();
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了"], 3);

    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。").run().await;

    assert_eq!(
        scenarios.iter().map(|s| s.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(api.assistants.lock().unwrap().len(), 3);
    assert_eq!(api.threads_created.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_scenario_is_reported() {
    let api = FakeApi::scripted([requires_action(
        "run_1",
        "thread_1",
        &[("call_a", "drop_database", "{}")],
    )]);
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了"], 1);

    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。").run().await;

    assert!(scenarios[0].items.is_empty());
    assert!(scenarios[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("drop_database")));

    let sheet = report::layout(&plan.messages, &scenarios);
    assert!(sheet.blocks[0].rows[0][0].starts_with("error: "));
    assert!(matches!(
        ensure_passed(&scenarios),
        Err(Error::ScenariosFailed { failed: 1, total: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn cancelled_harness_stops_every_scenario() {
    let api = FakeApi::new();
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了", "谢谢"], 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。")
        .cancellation(cancel)
        .run()
        .await;

    assert_eq!(scenarios.len(), 2);
    for scenario in &scenarios {
        assert!(scenario.items.is_empty());
        assert!(scenario
            .error
            .as_deref()
            .is_some_and(|e| e.contains("cancelled")));
    }
    assert_eq!(api.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn retrieval_injects_nearest_documents() {
    let api = FakeApi::new();
    let registry = ToolRegistry::default();
    let documents = vec![
        KnowledgeDocument {
            title: Some("重设密码".to_string()),
            content: "在登录页点击忘记密码。".to_string(),
        },
        KnowledgeDocument {
            title: Some("退款".to_string()),
            content: "七天内可申请退款。".to_string(),
        },
    ];
    let index = KnowledgeIndex::build(&api, "text-embedding-3-small", documents)
        .await
        .unwrap();
    let mut plan = plan(&["我忘记密码了"], 1);
    plan.top_k = 1;

    Harness::new(&api, &registry, &plan, "你是一位客服。")
        .knowledge(Some(&index))
        .run()
        .await;

    let runs = api.runs.lock().unwrap();
    let injected = runs[0].additional_instructions.as_deref().unwrap();
    assert!(injected.contains("重设密码"));
    assert!(!injected.contains("退款"));
}

#[tokio::test(start_paused = true)]
async fn report_is_written_to_disk() {
    let api = FakeApi::new();
    let registry = ToolRegistry::default();
    let plan = plan(&["我忘记密码了", "谢谢"], 2);
    let scenarios = Harness::new(&api, &registry, &plan, "你是一位客服。").run().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.xlsx");
    let sheet = report::layout(&plan.messages, &scenarios);
    report::write_report(&path, &sheet).unwrap();

    assert_eq!(sheet.header, vec!["prompt", "response-1", "response-2"]);
    assert_eq!(sheet.blocks.len(), 2);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
