use redis_lite::{commands::CommandError, resp::RespValue, session::Outbound};

use crate::test_utils::{TestEnv, TestUtils};

fn confirmation(kind: &str, channel: &str, count: i64) -> String {
    RespValue::Array(vec![
        RespValue::BulkString(kind.to_string()),
        RespValue::BulkString(channel.to_string()),
        RespValue::Integer(count),
    ])
    .encode()
}

#[tokio::test]
async fn test_publish_reaches_every_subscriber() {
    let mut env = TestEnv::new_master_server();
    let first = TestUtils::client_address(50001);
    let second = TestUtils::client_address(50002);
    let publisher = TestUtils::client_address(50003);

    env.exec_command_immediate_success_response(
        TestUtils::subscribe_command(&["news", "sport"]),
        &first,
        &format!(
            "{}{}",
            confirmation("subscribe", "news", 1),
            confirmation("subscribe", "sport", 2)
        ),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::subscribe_command(&["news"]),
        &second,
        &confirmation("subscribe", "news", 1),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::publish_command("news", "hello"),
        &publisher,
        &TestUtils::expected_integer(2),
    )
    .await;

    let message = Outbound::Resp(TestUtils::expected_bulk_string_array(&["message", "news", "hello"]));
    assert_eq!(env.next_outbound(&first).await, Some(message.clone()));
    assert_eq!(env.next_outbound(&second).await, Some(message));

    env.exec_command_immediate_success_response(
        TestUtils::publish_command("weather", "rain"),
        &publisher,
        &TestUtils::expected_integer(0),
    )
    .await;

    env.assert_no_outbound(&first);
}

#[tokio::test]
async fn test_subscribed_session_only_accepts_ping_and_unsubscribe() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(50001);

    env.exec_command_immediate_success_response(
        TestUtils::subscribe_command(&["news"]),
        &client,
        &confirmation("subscribe", "news", 1),
    )
    .await;

    env.exec_command_immediate_error_response(
        TestUtils::get_command("k"),
        &client,
        CommandError::SubscribedContext,
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["PING"]),
        &client,
        &TestUtils::expected_bulk_string_array(&["pong", ""]),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::unsubscribe_command(&[]),
        &client,
        &confirmation("unsubscribe", "news", 0),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::get_command("k"),
        &client,
        &TestUtils::expected_null(),
    )
    .await;
}

#[tokio::test]
async fn test_unsubscribed_channel_stops_receiving() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(50001);
    let publisher = TestUtils::client_address(50002);

    env.exec_command_immediate_success_response(
        TestUtils::subscribe_command(&["a", "b"]),
        &client,
        &format!("{}{}", confirmation("subscribe", "a", 1), confirmation("subscribe", "b", 2)),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::unsubscribe_command(&["a"]),
        &client,
        &confirmation("unsubscribe", "a", 1),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::publish_command("a", "ignored"),
        &publisher,
        &TestUtils::expected_integer(0),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::publish_command("b", "kept"),
        &publisher,
        &TestUtils::expected_integer(1),
    )
    .await;

    assert_eq!(
        env.next_outbound(&client).await,
        Some(Outbound::Resp(TestUtils::expected_bulk_string_array(&[
            "message", "b", "kept"
        ])))
    );
}

#[tokio::test]
async fn test_subscribe_inside_multi_is_refused() {
    let mut env = TestEnv::new_master_server();
    let client = TestUtils::client_address(50001);

    env.exec_command_immediate_success_response(
        TestUtils::multi_command(),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_error_response(
        TestUtils::subscribe_command(&["news"]),
        &client,
        CommandError::NotAllowedInTransaction,
    )
    .await;
}
