use redis_lite::commands::CommandError;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_exec_without_multi() {
    let mut env = TestEnv::new_master_server();

    env.exec_command_immediate_error_response(
        TestUtils::exec_command(),
        &TestUtils::client_address(41844),
        CommandError::ExecWithoutMulti,
    )
    .await;
}

#[tokio::test]
async fn test_nested_multi_and_watch_inside_multi_are_refused() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_error_response(TestUtils::multi_command(), &client, CommandError::NestedMulti)
        .await;

    env.exec_command_immediate_error_response(
        TestUtils::watch_command(&["k"]),
        &client,
        CommandError::WatchInsideMulti,
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &client,
        &TestUtils::expected_bulk_string_array(&[]),
    )
    .await;
}

#[tokio::test]
async fn test_discard_drops_queued_commands() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_error_response(
        TestUtils::discard_command(),
        &client,
        CommandError::DiscardWithoutMulti,
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("dropped", "1"),
        &client,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::discard_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("dropped"),
        &client,
        &TestUtils::expected_null(),
    )
    .await;
}

#[tokio::test]
async fn test_runtime_errors_do_not_abort_the_transaction() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::set_command("name", "redis"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    for command in [
        TestUtils::incr_command("name"),
        TestUtils::incr_command("counter"),
        TestUtils::rpush_command("name", &["x"]),
    ] {
        env.exec_command_immediate_success_response(
            command,
            &client,
            &TestUtils::expected_simple_string("QUEUED"),
        )
        .await;
    }

    let expected = format!(
        "*3\r\n{}{}{}",
        CommandError::NotAnInteger.as_string(),
        TestUtils::expected_integer(1),
        "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n",
    );

    env.exec_command_immediate_success_response(TestUtils::exec_command(), &client, &expected)
        .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("counter"),
        &client,
        &TestUtils::expected_bulk_string("1"),
    )
    .await;
}

#[tokio::test]
async fn test_unwatch_forgets_watched_keys() {
    let mut env = TestEnv::new_master_server();
    let watcher = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::watch_command(&["balance"]),
        &watcher,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("balance", "10"),
        &TestUtils::client_address(41845),
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["UNWATCH"]),
        &watcher,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &watcher,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::incr_command("balance"),
        &watcher,
        &TestUtils::expected_simple_string("QUEUED"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &watcher,
        &format!("*1\r\n{}", TestUtils::expected_integer(11)),
    )
    .await;
}

#[tokio::test]
async fn test_watched_key_written_by_the_watcher_itself_aborts() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::watch_command(&["k"]),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::set_command("k", "mine"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::exec_command(),
        &client,
        &TestUtils::expected_null(),
    )
    .await;
}
