use redis_lite::{
    commands::CommandError,
    config::{ReplicaOf, ServerConfig},
    rdb::RdbParser,
    replication::ReplicaState,
    resp::RespValue,
    session::Outbound,
};

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_replica_refuses_client_writes() {
    let mut env = TestEnv::new_replica_server(6379);
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_error_response(
        TestUtils::set_command("k", "v"),
        &client,
        CommandError::ReadOnlyReplica,
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
async fn test_info_replication_reports_role() {
    let mut master = TestEnv::new_master_server();
    let mut replica = TestEnv::new_replica_server(6379);

    let master_info = master
        .exec_command(TestUtils::command(&["INFO", "replication"]), "127.0.0.1:41844")
        .await
        .unwrap();
    assert!(master_info.contains("role:master"), "{}", master_info);
    assert!(master_info.contains("connected_slaves:0"), "{}", master_info);
    assert!(
        master_info.contains(&format!(
            "master_replid:{}",
            master.state().replication.replication_id()
        )),
        "{}",
        master_info
    );

    let replica_info = replica
        .exec_command(TestUtils::command(&["INFO"]), "127.0.0.1:41844")
        .await
        .unwrap();
    assert!(replica_info.contains("role:slave"), "{}", replica_info);
}

#[tokio::test]
async fn test_psync_sends_snapshot_then_propagates_writes() {
    let mut env = TestEnv::new_master_server();
    let replica = TestUtils::client_address(6380);
    let client = TestUtils::client_address(41844);

    env.exec_command_immediate_success_response(
        TestUtils::set_command("before", "1"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    env.exec_command_immediate_success_response(
        TestUtils::command(&["REPLCONF", "listening-port", "6380"]),
        &replica,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let offset_at_sync = env.state().replication.offset();

    env.exec_command_no_response(TestUtils::command(&["PSYNC", "?", "-1"]), &replica)
        .await;

    let replication_id = env.state().replication.replication_id().to_string();
    assert_eq!(
        env.next_outbound(&replica).await,
        Some(Outbound::Resp(TestUtils::expected_simple_string(&format!(
            "FULLRESYNC {} {}",
            replication_id, offset_at_sync
        ))))
    );

    let Some(Outbound::Raw(payload)) = env.next_outbound(&replica).await else {
        panic!("expected a snapshot payload");
    };
    let header_end = payload
        .windows(2)
        .position(|window| window == b"\r\n")
        .unwrap();
    let length: usize = std::str::from_utf8(&payload[1..header_end])
        .unwrap()
        .parse()
        .unwrap();
    let snapshot = RdbParser::parse(&payload[header_end + 2..]).unwrap();

    assert_eq!(length, payload.len() - header_end - 2);
    assert_eq!(snapshot.strings.get("before"), Some(&"1".to_string()));
    assert_eq!(
        env.state().replication.replica_state(&replica).await,
        Some(ReplicaState::Online)
    );

    env.exec_command_immediate_success_response(
        TestUtils::set_command("after", "2"),
        &client,
        &TestUtils::expected_simple_string("OK"),
    )
    .await;

    let propagated = TestUtils::set_command("after", "2").encode();
    assert_eq!(
        env.next_outbound(&replica).await,
        Some(Outbound::Resp(propagated.clone()))
    );
    let offset_after_write = offset_at_sync + propagated.len() as u64;
    assert_eq!(env.state().replication.offset(), offset_after_write);

    env.exec_command_no_response(
        TestUtils::command(&["REPLCONF", "ACK", offset_after_write.to_string().as_str()]),
        &replica,
    )
    .await;
    assert_eq!(
        env.state().replication.acknowledged_offset(&replica).await,
        Some(offset_after_write)
    );
}

#[tokio::test]
async fn test_reads_are_not_propagated() {
    let mut env = TestEnv::new_master_server();
    let replica = TestUtils::client_address(6380);

    env.exec_command_no_response(TestUtils::command(&["PSYNC", "?", "-1"]), &replica)
        .await;
    assert!(matches!(env.next_outbound(&replica).await, Some(Outbound::Resp(_))));
    assert!(matches!(env.next_outbound(&replica).await, Some(Outbound::Raw(_))));

    env.exec_command_immediate_success_response(
        TestUtils::get_command("missing"),
        "127.0.0.1:41844",
        &TestUtils::expected_null(),
    )
    .await;

    env.assert_no_outbound(&replica);
    assert_eq!(env.state().replication.offset(), 0);
}

#[tokio::test]
async fn test_psync_on_a_replica_is_refused() {
    let mut env = TestEnv::new_replica_server(6379);

    env.exec_command_immediate_error_response(
        TestUtils::command(&["PSYNC", "?", "-1"]),
        "127.0.0.1:6381",
        CommandError::InvalidPsyncConnection,
    )
    .await;
}

#[tokio::test]
async fn test_master_and_replica_over_tcp() {
    let master_dir = tempfile::tempdir().unwrap();
    let replica_dir = tempfile::tempdir().unwrap();

    let (master_port, master_state) = TestUtils::run_server(ServerConfig {
        dir: master_dir.path().display().to_string(),
        ..ServerConfig::default()
    })
    .await;

    let (mut reader, mut writer) = TestUtils::connect(master_port).await;

    assert_eq!(
        TestUtils::send_command_and_receive(
            &mut reader,
            &mut writer,
            TestUtils::set_command("seeded", "yes")
        )
        .await,
        RespValue::SimpleString("OK".to_string())
    );

    let (replica_port, replica_state) = TestUtils::run_server(ServerConfig {
        dir: replica_dir.path().display().to_string(),
        replica_of: Some(ReplicaOf {
            host: "127.0.0.1".to_string(),
            port: master_port,
        }),
        ..ServerConfig::default()
    })
    .await;

    let mut attached = false;
    for _ in 0..100 {
        if master_state.replication.online_replicas().await == 1 {
            attached = true;
            break;
        }
        TestUtils::sleep_ms(20).await;
    }
    assert!(attached, "replica never came online");

    for command in [
        TestUtils::set_command("live", "1"),
        TestUtils::rpush_command("list", &["a", "b"]),
        TestUtils::incr_command("counter"),
    ] {
        TestUtils::send_command_and_receive(&mut reader, &mut writer, command).await;
    }

    let mut replicated = false;
    for _ in 0..100 {
        if replica_state.store.get("counter").await == Ok(Some("1".to_string())) {
            replicated = true;
            break;
        }
        TestUtils::sleep_ms(20).await;
    }
    assert!(replicated, "writes never reached the replica");

    assert_eq!(
        replica_state.store.get("seeded").await,
        Ok(Some("yes".to_string()))
    );
    assert_eq!(replica_state.store.get("live").await, Ok(Some("1".to_string())));
    assert_eq!(
        replica_state.store.range("list", 0, -1).await,
        Ok(vec!["a".to_string(), "b".to_string()])
    );

    let (mut replica_reader, mut replica_writer) = TestUtils::connect(replica_port).await;
    assert_eq!(
        TestUtils::send_command_and_receive(
            &mut replica_reader,
            &mut replica_writer,
            TestUtils::set_command("direct", "no")
        )
        .await,
        RespValue::Error(CommandError::ReadOnlyReplica.to_string())
    );
    assert_eq!(
        TestUtils::send_command_and_receive(
            &mut replica_reader,
            &mut replica_writer,
            TestUtils::get_command("live")
        )
        .await,
        RespValue::BulkString("1".to_string())
    );
}
