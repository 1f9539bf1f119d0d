use std::time::Duration;

use async_trait::async_trait;
use stateindex_appdata::testing::{SharedBuffer, WriterListener};
use stateindex_appdata::{
    shutdown_channel, AsyncListenerMux, AsyncListenerOptions, Capabilities, CommitData, Listener,
    ListenerError, ModuleInitializationData, ObjectUpdateData, Packet, PacketKind, ShutdownSignal,
    StartBlockData, TxData,
};
use stateindex_schema::{Field, Kind, ModuleSchema, ObjectType, ObjectUpdate, Value};

fn bank_schema() -> ModuleSchema {
    ModuleSchema::new(vec![ObjectType::new("balance")
        .with_key_field(Field::new("denom", Kind::String))
        .with_value_field(Field::new("amount", Kind::Int64))])
}

fn balance_update(denom: &str, amount: i64) -> ObjectUpdateData {
    ObjectUpdateData {
        module_name: "bank".into(),
        updates: vec![ObjectUpdate::set("balance", Value::from(denom), Value::Int64(amount))],
    }
}

/// Fails every object update; used to poison one member of a mux.
struct Rejecting;

#[async_trait]
impl Listener for Rejecting {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with(PacketKind::ObjectUpdate)
            .with(PacketKind::Commit)
    }

    async fn on_object_update(&mut self, _data: ObjectUpdateData) -> Result<(), ListenerError> {
        Err(ListenerError::Other("rejected object update".into()))
    }
}

async fn commit(mux: &mut AsyncListenerMux) -> Result<(), ListenerError> {
    tokio::time::timeout(Duration::from_secs(5), mux.commit(CommitData {}))
        .await
        .expect("commit timed out")
}

#[tokio::test]
async fn writer_listeners_see_the_same_stream() {
    let (a, b) = (SharedBuffer::new(), SharedBuffer::new());
    let mut mux = AsyncListenerMux::new(
        vec![
            Box::new(WriterListener::new(a.clone())),
            Box::new(WriterListener::new(b.clone())),
        ],
        AsyncListenerOptions::default().with_buffer_size(1),
        ShutdownSignal::never(),
    );

    mux.initialize_module_data(ModuleInitializationData {
        module_name: "bank".into(),
        schema: bank_schema(),
    })
    .await
    .unwrap();

    for height in 1..=3 {
        mux.start_block(StartBlockData { height, ..Default::default() }).await.unwrap();
        // not a capability of the writer; dropped by the mux
        mux.on_tx(TxData::default()).await.unwrap();
        mux.on_object_update(balance_update("atom", height as i64 * 10))
            .await
            .unwrap();
        commit(&mut mux).await.unwrap();
    }

    let out = a.contents();
    assert_eq!(out, b.contents());
    assert_eq!(out.lines().filter(|l| *l == "Commit").count(), 3);
    assert!(out.starts_with("InitializeModuleData: {\"module_name\":\"bank\""));
    assert!(out.contains("StartBlock: {\"height\":2}"));
    assert!(out.contains("\"type_name\":\"balance\""), "object update missing: {out}");
    assert!(!out.contains("OnTx"));
}

#[tokio::test]
async fn failing_member_fails_the_commit() {
    let out = SharedBuffer::new();
    let mut mux = AsyncListenerMux::new(
        vec![Box::new(WriterListener::new(out.clone())), Box::new(Rejecting)],
        AsyncListenerOptions::default().with_buffer_size(1),
        ShutdownSignal::never(),
    );

    mux.start_block(StartBlockData { height: 1, ..Default::default() }).await.unwrap();
    mux.on_object_update(balance_update("atom", 1)).await.unwrap();
    mux.on_object_update(balance_update("osmo", 2)).await.unwrap();

    let err = commit(&mut mux).await.unwrap_err();
    assert_eq!(err.to_string(), "rejected object update");

    // the healthy member still completed its block
    assert!(out.contents().ends_with("Commit\n"));
}

#[tokio::test]
async fn packets_route_through_send_packet() {
    let out = SharedBuffer::new();
    let mut mux = AsyncListenerMux::new(
        vec![Box::new(WriterListener::new(out.clone()))],
        AsyncListenerOptions::default(),
        ShutdownSignal::never(),
    );

    let packets: Vec<Packet> = vec![
        StartBlockData { height: 9, ..Default::default() }.into(),
        balance_update("atom", 5).into(),
        CommitData {}.into(),
    ];
    for packet in packets {
        tokio::time::timeout(Duration::from_secs(5), mux.send_packet(packet))
            .await
            .expect("send timed out")
            .unwrap();
    }

    let contents = out.contents();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "StartBlock: {\"height\":9}");
    assert!(lines[1].starts_with("OnObjectUpdate: "));
    assert_eq!(lines[2], "Commit");
}

#[tokio::test]
async fn shutdown_stops_the_pipeline() {
    let (trigger, signal) = shutdown_channel();
    let mut mux = AsyncListenerMux::new(
        vec![Box::new(WriterListener::new(SharedBuffer::new()))],
        AsyncListenerOptions::default(),
        signal,
    );

    mux.start_block(StartBlockData::default()).await.unwrap();
    trigger.shutdown();

    let err = mux.commit(CommitData {}).await.unwrap_err();
    assert!(err.is_pipeline());
}
