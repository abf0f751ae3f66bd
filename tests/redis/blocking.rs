use std::time::Duration;

use redis_lite::{config::ServerConfig, resp::RespValue};
use tokio::io::AsyncWriteExt;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_blpop_single_item_is_delivered_exactly_once() {
    let mut env = TestEnv::new_master_server();

    let tasks: Vec<_> = (0..3)
        .map(|i| TestUtils::spawn_blpop_task(&env, "jobs", "1", &TestUtils::client_address(12341 + i)))
        .collect();

    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("jobs") == 3).await);

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("jobs", &["only"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_integer(1),
    )
    .await;

    let mut results = vec![];
    for task in tasks {
        results.push(TestUtils::wait_for_completion(task, Duration::from_secs(3)).await);
    }

    let delivered = results
        .iter()
        .filter(|result| **result == Ok(Some(TestUtils::expected_bulk_string_array(&["jobs", "only"]))))
        .count();
    let timed_out = results
        .iter()
        .filter(|result| **result == Ok(Some(TestUtils::expected_null())))
        .count();

    assert_eq!(delivered, 1, "results: {:?}", results);
    assert_eq!(timed_out, 2, "results: {:?}", results);

    env.exec_command_immediate_success_response(
        TestUtils::llen_command("jobs"),
        &TestUtils::client_address(12340),
        &TestUtils::expected_integer(0),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_waiters_are_served_in_arrival_order() {
    let mut env = TestEnv::new_master_server();

    let first = TestUtils::spawn_blpop_task(&env, "queue", "0", &TestUtils::client_address(12341));
    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("queue") == 1).await);

    let second = TestUtils::spawn_blpop_task(&env, "queue", "0", &TestUtils::client_address(12342));
    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("queue") == 2).await);

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("queue", &["a", "b", "c"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_integer(3),
    )
    .await;

    assert_eq!(
        TestUtils::wait_for_completion(first, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_bulk_string_array(&["queue", "a"])))
    );
    assert_eq!(
        TestUtils::wait_for_completion(second, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_bulk_string_array(&["queue", "b"])))
    );

    env.exec_command_immediate_success_response(
        TestUtils::lrange_command("queue", 0, -1),
        &TestUtils::client_address(12340),
        &TestUtils::expected_bulk_string_array(&["c"]),
    )
    .await;
}

#[tokio::test]
async fn test_blpop_times_out_with_null() {
    let env = TestEnv::new_master_server();

    let task = TestUtils::spawn_blpop_task(&env, "empty", "0.1", &TestUtils::client_address(12341));

    assert_eq!(
        TestUtils::wait_for_completion(task, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_null()))
    );
    assert_eq!(env.state().store.blocking().waiting_on("empty"), 0);
}

#[tokio::test]
async fn test_blpop_with_an_enormous_timeout_still_blocks() {
    let mut env = TestEnv::new_master_server();

    let task = TestUtils::spawn_blpop_task(&env, "far", "1e19", &TestUtils::client_address(12341));
    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("far") == 1).await);

    env.exec_command_immediate_success_response(
        TestUtils::rpush_command("far", &["v"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_integer(1),
    )
    .await;

    assert_eq!(
        TestUtils::wait_for_completion(task, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_bulk_string_array(&["far", "v"])))
    );
}

#[tokio::test]
async fn test_blpop_inside_transaction_does_not_block() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(12341);

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::blpop_command("nothing", "0"),
        &client,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &client,
        &format!("*1\r\n{}", TestUtils::expected_null()),
    )
    .await;
}

#[tokio::test]
async fn test_lpush_serves_a_blocked_client_from_the_head() {
    let mut env = TestEnv::new_master_server();

    let task = TestUtils::spawn_blpop_task(&env, "stack", "2", &TestUtils::client_address(12341));
    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("stack") == 1).await);

    env.exec_command_immediate_success_response(
        TestUtils::lpush_command("stack", &["x", "y"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_integer(2),
    )
    .await;

    assert_eq!(
        TestUtils::wait_for_completion(task, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_bulk_string_array(&["stack", "y"])))
    );
}

#[tokio::test]
async fn test_xread_block_wakes_on_xadd() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_success_response(
        TestUtils::xadd_command("events", "1-1", &["kind", "old"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_bulk_string("1-1"),
    )
    .await;

    let task = TestUtils::spawn_xread_task(&env, "0", "events", "$", &TestUtils::client_address(12341));
    assert!(TestUtils::eventually(|| env.state().store.blocking().waiting_on("events") == 1).await);

    env.exec_command_immediate_success_response(
        TestUtils::xadd_command("events", "2-1", &["kind", "new"]),
        &TestUtils::client_address(12340),
        &TestUtils::expected_bulk_string("2-1"),
    )
    .await;

    let expected = RespValue::Array(vec![RespValue::Array(vec![
        RespValue::BulkString("events".to_string()),
        RespValue::Array(vec![RespValue::Array(vec![
            RespValue::BulkString("2-1".to_string()),
            RespValue::command(["kind", "new"]),
        ])]),
    ])]);

    assert_eq!(
        TestUtils::wait_for_completion(task, Duration::from_secs(2)).await,
        Ok(Some(expected.encode()))
    );
}

#[tokio::test]
async fn test_xread_block_times_out_with_null() {
    let env = TestEnv::new_master_server();

    let task = TestUtils::spawn_xread_task(&env, "100", "quiet", "0-0", &TestUtils::client_address(12341));

    assert_eq!(
        TestUtils::wait_for_completion(task, Duration::from_secs(2)).await,
        Ok(Some(TestUtils::expected_null()))
    );
}

#[tokio::test]
async fn test_disconnected_waiter_is_unregistered() {
    let dir = tempfile::tempdir().unwrap();
    let (port, state) = TestUtils::run_server(ServerConfig {
        dir: dir.path().display().to_string(),
        ..ServerConfig::default()
    })
    .await;

    let (reader, mut writer) = TestUtils::connect(port).await;
    writer
        .write_all(TestUtils::command(&["BLPOP", "q", "0"]).encode().as_bytes())
        .await
        .unwrap();
    assert!(TestUtils::eventually(|| state.store.blocking().waiting_on("q") == 1).await);

    drop(reader);
    drop(writer);
    assert!(TestUtils::eventually(|| state.store.blocking().waiting_on("q") == 0).await);

    let (mut reader, mut writer) = TestUtils::connect(port).await;
    assert_eq!(
        TestUtils::send_command_and_receive(&mut reader, &mut writer, TestUtils::rpush_command("q", &["v"])).await,
        RespValue::Integer(1)
    );
    assert_eq!(
        TestUtils::send_command_and_receive(&mut reader, &mut writer, TestUtils::llen_command("q")).await,
        RespValue::Integer(1)
    );
}
