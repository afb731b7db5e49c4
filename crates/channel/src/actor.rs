//! Channel actor (component G): one instance per `(projectId, channelName,
//! locationHint)`. All state transitions execute serially inside `run` —
//! this module is the only place `ConnectionEntry`/`subscribers` are ever
//! mutated, which is what gives the rest of the gateway its ordering and
//! consistency guarantees for free.

use {
    crate::{
        clock::MonotonicClock,
        connection::{ConnectionEntry, ConnectionState, Outbound},
        error::ChannelError,
        id::MonotonicUlidFactory,
    },
    pulsegate_protocol::{
        Ack, AckErrorCode, AckPath, ClientFrame, CloseCode, Grant, MessageBody, ServerFrame, UsageEvent, UsageEventKind,
    },
    std::{
        collections::{HashMap, HashSet},
        sync::{atomic::{AtomicUsize, Ordering}, Arc},
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
    tokio::sync::{mpsc, oneshot},
};

pub type ConnId = u64;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub egress_budget_bytes: usize,
    pub heartbeat_secs: u64,
    pub grace_secs: u64,
    pub sweep_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            egress_budget_bytes: pulsegate_protocol::DEFAULT_EGRESS_BUFFER_BYTES,
            heartbeat_secs: pulsegate_protocol::DEFAULT_HEARTBEAT_SECS,
            grace_secs: pulsegate_protocol::DEFAULT_GRACE_SECS,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

pub enum ActorCommand {
    Register { sender: mpsc::UnboundedSender<Outbound>, reply: oneshot::Sender<(ConnId, Arc<AtomicUsize>)> },
    Frame { conn_id: ConnId, frame: ClientFrame },
    /// Notifies the actor that `conn_id` answered a liveness check
    /// (the WS-level pong), resetting its missed-heartbeat counter. The
    /// actor itself never touches the socket; the gateway's WS loop owns
    /// ping/pong and reports back through this command.
    Touch { conn_id: ConnId },
    Disconnect { conn_id: ConnId },
    Shutdown,
}

/// A cheap, cloneable reference to a running channel actor's mailbox.
#[derive(Clone)]
pub struct ChannelHandle {
    project_id: Arc<str>,
    channel_name: Arc<str>,
    commands: mpsc::UnboundedSender<ActorCommand>,
}

impl ChannelHandle {
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Register a new connection and obtain its actor-assigned id plus the
    /// shared egress-byte counter backpressure is tracked through. The
    /// gateway's socket-writer task decrements the counter as real bytes
    /// land on the wire; the actor only ever increments it. The connection
    /// starts `Pending` and must send a valid `Connect` within the grace
    /// window.
    pub async fn register(&self, sender: mpsc::UnboundedSender<Outbound>) -> Result<(ConnId, Arc<AtomicUsize>), ChannelError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(ActorCommand::Register { sender, reply })
            .map_err(|_| ChannelError::ActorGone)?;
        rx.await.map_err(|_| ChannelError::ActorGone)
    }

    pub fn send_frame(&self, conn_id: ConnId, frame: ClientFrame) -> Result<(), ChannelError> {
        self.commands
            .send(ActorCommand::Frame { conn_id, frame })
            .map_err(|_| ChannelError::ActorGone)
    }

    pub fn touch(&self, conn_id: ConnId) {
        let _ = self.commands.send(ActorCommand::Touch { conn_id });
    }

    pub fn disconnect(&self, conn_id: ConnId) {
        let _ = self.commands.send(ActorCommand::Disconnect { conn_id });
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(ActorCommand::Shutdown);
    }
}

/// Spawn a channel actor and return a handle to it. `id_seed` should be
/// derived deterministically from `(project_id, channel_name)` in
/// production so restarts don't reuse id sequences across unrelated
/// channels; tests pass a fixed constant for reproducibility.
pub fn spawn(
    project_id: impl Into<Arc<str>>,
    channel_name: impl Into<Arc<str>>,
    signer: Arc<dyn pulsegate_common::Signer>,
    usage_sink: Arc<dyn pulsegate_common::UsageSink>,
    config: ChannelConfig,
    id_seed: u64,
) -> ChannelHandle {
    let project_id = project_id.into();
    let channel_name = channel_name.into();
    let (tx, rx) = mpsc::unbounded_channel();

    let actor = ChannelActor {
        project_id: project_id.clone(),
        channel_name: channel_name.clone(),
        signer,
        usage_sink,
        config,
        connections: HashMap::new(),
        subscribers: HashMap::new(),
        next_seq: 1,
        next_conn_id: 1,
        id_factory: MonotonicUlidFactory::seeded(id_seed),
        clock: MonotonicClock::new(),
        pending_usage: Vec::new(),
    };

    tokio::spawn(actor.run(rx));

    ChannelHandle { project_id, channel_name, commands: tx }
}

struct ChannelActor {
    project_id: Arc<str>,
    channel_name: Arc<str>,
    signer: Arc<dyn pulsegate_common::Signer>,
    usage_sink: Arc<dyn pulsegate_common::UsageSink>,
    config: ChannelConfig,
    connections: HashMap<ConnId, ConnectionEntry>,
    subscribers: HashMap<String, HashSet<ConnId>>,
    next_seq: u64,
    next_conn_id: ConnId,
    id_factory: MonotonicUlidFactory,
    clock: MonotonicClock,
    pending_usage: Vec<UsageEvent>,
}

fn wall_clock_unix_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or_default()
}

impl ChannelActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ActorCommand>) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(ActorCommand::Shutdown) | None => {
                            self.shutdown().await;
                            return;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                _ = sweep.tick() => self.sweep(),
            }
        }
    }

    async fn handle_command(&mut self, cmd: ActorCommand) {
        match cmd {
            ActorCommand::Register { sender, reply } => {
                let conn_id = self.next_conn_id;
                self.next_conn_id += 1;
                let entry = ConnectionEntry::new(sender, Instant::now());
                let egress_bytes = entry.egress_bytes.clone();
                self.connections.insert(conn_id, entry);
                metrics_channel_connections_active_inc(&self.connections);
                let _ = reply.send((conn_id, egress_bytes));
            }
            ActorCommand::Frame { conn_id, frame } => self.handle_frame(conn_id, frame).await,
            ActorCommand::Touch { conn_id } => {
                if let Some(conn) = self.connections.get_mut(&conn_id) {
                    conn.last_activity = Instant::now();
                    conn.missed_heartbeats = 0;
                }
            }
            ActorCommand::Disconnect { conn_id } => self.close_connection(conn_id),
            ActorCommand::Shutdown => unreachable!("handled in run()"),
        }
        self.flush_usage_if_any().await;
    }

    async fn handle_frame(&mut self, conn_id: ConnId, frame: ClientFrame) {
        if !self.connections.contains_key(&conn_id) {
            return;
        }
        match frame {
            ClientFrame::Connect { grant_jwt } => self.handle_connect(conn_id, &grant_jwt),
            ClientFrame::Subscribe { topic, request_id } => self.handle_subscribe(conn_id, &topic, request_id),
            ClientFrame::Unsubscribe { topic, request_id } => self.handle_unsubscribe(conn_id, &topic, request_id),
            ClientFrame::Publish { topic, payload, client_msg_id, request_id: _, client_publish_ts, ack } => {
                self.handle_publish(conn_id, &topic, payload, &client_msg_id, client_publish_ts, ack);
            }
        }
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.last_activity = Instant::now();
        }
    }

    fn handle_connect(&mut self, conn_id: ConnId, grant_jwt: &str) {
        let grant = match self.signer.verify(grant_jwt) {
            Ok(g) => g,
            Err(_) => {
                self.close_with(conn_id, CloseCode::Unauthorized);
                return;
            }
        };
        if grant.project_id.as_str() != &*self.project_id || grant.channel.as_str() != &*self.channel_name {
            self.close_with(conn_id, CloseCode::Forbidden);
            return;
        }
        if grant.expires_at <= wall_clock_unix_millis() / 1000 {
            self.close_with(conn_id, CloseCode::Unauthorized);
            return;
        }

        let key_id = grant.user_id.clone();
        let project_id = grant.project_id.clone();
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.state = ConnectionState::Authenticated;
            conn.grant = Some(grant);
        }
        self.pending_usage.push(UsageEvent {
            project_id,
            key_id,
            event: UsageEventKind::Connect,
            payload_length: None,
            timestamp: wall_clock_unix_millis(),
        });
    }

    fn handle_subscribe(&mut self, conn_id: ConnId, topic: &str, request_id: Option<String>) {
        let _ = request_id;
        let Some(conn) = self.connections.get(&conn_id) else { return };
        if conn.state != ConnectionState::Authenticated {
            return;
        }
        let Some(grant) = conn.grant.clone() else { return };
        if !grant.can_subscribe(topic) {
            self.send_ack(conn_id, Ack::err(AckPath::Subscribe, AckErrorCode::Forbidden, "topic not readable", None));
            return;
        }

        let Some(first_time) = self.connections.get_mut(&conn_id).map(|conn| conn.subscribed_topics.insert(topic.to_string())) else {
            return;
        };
        self.subscribers.entry(topic.to_string()).or_default().insert(conn_id);

        self.send_ack(conn_id, Ack::ok(AckPath::Subscribe, None));
        if first_time {
            self.pending_usage.push(UsageEvent {
                project_id: grant.project_id.clone(),
                key_id: grant.user_id.clone(),
                event: UsageEventKind::Subscribe,
                payload_length: None,
                timestamp: wall_clock_unix_millis(),
            });
        }
    }

    fn handle_unsubscribe(&mut self, conn_id: ConnId, topic: &str, request_id: Option<String>) {
        let _ = request_id;
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.subscribed_topics.remove(topic);
        }
        if let Some(set) = self.subscribers.get_mut(topic) {
            set.remove(&conn_id);
            if set.is_empty() {
                self.subscribers.remove(topic);
            }
        }
        self.send_ack(conn_id, Ack::ok(AckPath::Unsubscribe, None));
    }

    fn handle_publish(
        &mut self,
        conn_id: ConnId,
        topic: &str,
        payload: serde_json::Value,
        client_msg_id: &str,
        client_publish_ts: Option<i64>,
        _ack_requested: bool,
    ) {
        let Some(conn) = self.connections.get(&conn_id) else { return };
        if conn.state != ConnectionState::Authenticated {
            self.send_ack(
                conn_id,
                Ack::err(AckPath::Publish, AckErrorCode::Unauthorized, "not authenticated", Some(client_msg_id.to_string())),
            );
            return;
        }
        let Some(grant) = conn.grant.clone() else { return };
        if !grant.can_publish(topic) {
            self.send_ack(
                conn_id,
                Ack::err(AckPath::Publish, AckErrorCode::Forbidden, "topic not writable", Some(client_msg_id.to_string())),
            );
            return;
        }

        let t_ingress = self.clock.now_ms();
        let seq = self.next_seq;
        self.next_seq += 1;
        let server_msg_id = self.id_factory.next(wall_clock_unix_millis().max(0) as u64);
        let sent_at = wall_clock_unix_millis();
        let t_enqueued = self.clock.now_ms();

        let payload_len = payload.to_string().len();

        let body = MessageBody {
            id: server_msg_id.clone(),
            topic: topic.to_string(),
            sender_id: grant.user_id.clone(),
            seq,
            sent_at,
            payload,
            client_msg_id: client_msg_id.to_string(),
            client_publish_ts,
            t_ingress,
            t_enqueued,
            t_broadcast_begin: None,
            t_ws_write_end: None,
            t_broadcast_end: None,
        };

        self.fan_out(conn_id, topic, body);

        self.send_ack(
            conn_id,
            Ack {
                path: AckPath::Publish,
                ok: true,
                code: None,
                message: None,
                client_msg_id: Some(client_msg_id.to_string()),
                server_assigned_id: Some(server_msg_id),
                seq: Some(seq),
                t_ingress: Some(t_ingress),
            },
        );

        self.pending_usage.push(UsageEvent {
            project_id: grant.project_id,
            key_id: grant.user_id,
            event: UsageEventKind::Message,
            payload_length: Some(payload_len),
            timestamp: sent_at,
        });
    }

    /// Broadcast `body` to every subscriber of `topic` except `publisher`.
    /// Each recipient's write failure is independent: it tears down that
    /// connection only and does not interrupt delivery to the rest.
    fn fan_out(&mut self, publisher: ConnId, topic: &str, mut body: MessageBody) {
        let Some(targets) = self.subscribers.get(topic).cloned() else { return };
        let mut failed = Vec::new();
        let mut first = true;

        for target in targets.iter().copied().filter(|id| *id != publisher) {
            if first {
                body.t_broadcast_begin = Some(self.clock.now_ms());
                first = false;
            }
            let Some(conn) = self.connections.get(&target) else { continue };
            let frame_len = serde_json::to_vec(&ServerFrame::Publish { body: body.clone() }).map(|v| v.len()).unwrap_or(0);
            let current = conn.egress_bytes.fetch_add(frame_len, Ordering::SeqCst) + frame_len;
            if current > self.config.egress_budget_bytes {
                conn.egress_bytes.fetch_sub(frame_len, Ordering::SeqCst);
                failed.push(target);
                continue;
            }
            if conn.sender.send(Outbound::Frame(ServerFrame::Publish { body: body.clone() })).is_err() {
                conn.egress_bytes.fetch_sub(frame_len, Ordering::SeqCst);
                failed.push(target);
            }
        }

        if let Some(begin) = body.t_broadcast_begin {
            let end = self.clock.now_ms();
            body.t_ws_write_end = Some(end);
            body.t_broadcast_end = Some(end);
            record_broadcast_duration(end - begin);
        }

        for conn_id in failed {
            self.close_with(conn_id, ChannelError::BackpressureExceeded.close_code());
        }
    }

    fn send_ack(&self, conn_id: ConnId, ack: Ack) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.sender.send(Outbound::Frame(ServerFrame::Ack(ack)));
        }
    }

    fn close_with(&mut self, conn_id: ConnId, code: CloseCode) {
        if let Some(conn) = self.connections.get(&conn_id) {
            let _ = conn.sender.send(Outbound::Close(code));
        }
        self.close_connection(conn_id);
    }

    fn close_connection(&mut self, conn_id: ConnId) {
        if let Some(mut conn) = self.connections.remove(&conn_id) {
            conn.state = ConnectionState::Closed;
            for topic in conn.subscribed_topics.drain() {
                if let Some(set) = self.subscribers.get_mut(&topic) {
                    set.remove(&conn_id);
                    if set.is_empty() {
                        self.subscribers.remove(&topic);
                    }
                }
            }
        }
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        let mut to_close = Vec::new();
        for (&conn_id, conn) in &mut self.connections {
            match conn.state {
                ConnectionState::Pending => {
                    if now.duration_since(conn.connected_at).as_secs() >= self.config.grace_secs {
                        to_close.push(conn_id);
                    }
                }
                ConnectionState::Authenticated => {
                    if now.duration_since(conn.last_activity).as_secs() >= self.config.heartbeat_secs {
                        conn.missed_heartbeats += 1;
                        conn.last_activity = now;
                        if conn.missed_heartbeats >= 2 {
                            to_close.push(conn_id);
                        }
                    }
                }
                ConnectionState::Closing | ConnectionState::Closed => to_close.push(conn_id),
            }
        }
        for conn_id in to_close {
            self.close_with(conn_id, CloseCode::Timeout);
        }
    }

    async fn shutdown(&mut self) {
        let conn_ids: Vec<ConnId> = self.connections.keys().copied().collect();
        for conn_id in conn_ids {
            self.close_with(conn_id, CloseCode::PreconditionFailed);
        }
        self.flush_usage_if_any().await;
    }

    async fn flush_usage_if_any(&mut self) {
        if self.pending_usage.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending_usage);
        self.usage_sink.ship(events).await;
    }
}

#[cfg(not(feature = "metrics"))]
fn metrics_channel_connections_active_inc(_connections: &HashMap<ConnId, ConnectionEntry>) {}

#[cfg(feature = "metrics")]
fn metrics_channel_connections_active_inc(connections: &HashMap<ConnId, ConnectionEntry>) {
    metrics::gauge!(pulsegate_metrics::channel::CONNECTIONS_ACTIVE).set(connections.len() as f64);
    metrics::counter!(pulsegate_metrics::channel::CONNECTIONS_TOTAL).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_broadcast_duration(_millis: f64) {}

#[cfg(feature = "metrics")]
fn record_broadcast_duration(millis: f64) {
    metrics::histogram!(pulsegate_metrics::channel::BROADCAST_DURATION_SECONDS).record(millis / 1000.0);
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        pulsegate_common::{SignerError, VerifyError},
        pulsegate_protocol::{Scope, TopicGrant},
        std::sync::Mutex,
        tokio::sync::mpsc::unbounded_channel,
    };

    struct FixedSigner(Grant);

    impl pulsegate_common::Signer for FixedSigner {
        fn sign(&self, _grant: &Grant) -> Result<String, SignerError> {
            Ok("token".into())
        }
        fn verify(&self, token: &str) -> Result<Grant, VerifyError> {
            if token == "bad" {
                return Err(VerifyError::BadSignature);
            }
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<UsageEvent>>);

    #[async_trait::async_trait]
    impl pulsegate_common::UsageSink for CollectingSink {
        async fn ship(&self, events: Vec<UsageEvent>) {
            self.0.lock().expect("lock").extend(events);
        }
    }

    fn test_grant(topics: Vec<TopicGrant>) -> Grant {
        Grant { project_id: "proj".into(), channel: "room".into(), topics, user_id: "alice".into(), issued_at: 0, expires_at: 9_999_999_999 }
    }

    async fn spawn_test_actor(grant: Grant) -> ChannelHandle {
        spawn(
            "proj",
            "room",
            Arc::new(FixedSigner(grant)),
            Arc::new(CollectingSink::default()),
            ChannelConfig { sweep_interval: Duration::from_secs(3600), ..ChannelConfig::default() },
            1,
        )
    }

    #[tokio::test]
    async fn two_subscribers_one_publisher_in_order_no_self_delivery() {
        let grant = test_grant(vec![TopicGrant { topic: "chat".into(), scope: Scope::ReadWrite }]);
        let handle = spawn_test_actor(grant).await;

        let (a_tx, mut a_rx) = unbounded_channel();
        let (b_tx, mut b_rx) = unbounded_channel();
        let (a, _a_egress) = handle.register(a_tx).await.unwrap();
        let (b, _b_egress) = handle.register(b_tx).await.unwrap();

        handle.send_frame(a, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();
        handle.send_frame(b, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();
        handle.send_frame(b, ClientFrame::Subscribe { topic: "chat".into(), request_id: None }).unwrap();

        for i in 1..=5 {
            handle
                .send_frame(
                    a,
                    ClientFrame::Publish {
                        topic: "chat".into(),
                        payload: serde_json::json!(format!("m{i}")),
                        client_msg_id: format!("c{i}"),
                        request_id: None,
                        client_publish_ts: None,
                        ack: false,
                    },
                )
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;

        // A sees: its own subscribe-less connect has no ack, 5 publish acks.
        let mut a_acks = 0;
        while let Ok(outbound) = a_rx.try_recv() {
            match outbound {
                Outbound::Frame(ServerFrame::Ack(ack)) => {
                    assert!(ack.ok);
                    a_acks += 1;
                }
                Outbound::Frame(ServerFrame::Publish { .. }) => panic!("publisher must never receive its own message"),
                Outbound::Close(code) => panic!("unexpected close: {code:?}"),
            }
        }
        assert_eq!(a_acks, 5);

        let mut seqs = Vec::new();
        while let Ok(outbound) = b_rx.try_recv() {
            if let Outbound::Frame(ServerFrame::Publish { body }) = outbound {
                assert_eq!(body.sender_id, "alice");
                seqs.push(body.seq);
            }
        }
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn forbidden_publish_is_acked_and_not_fanned_out() {
        let grant = test_grant(vec![TopicGrant { topic: "chat".into(), scope: Scope::Read }]);
        let handle = spawn_test_actor(grant).await;
        let (tx, mut rx) = unbounded_channel();
        let (conn, _egress) = handle.register(tx).await.unwrap();
        handle.send_frame(conn, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();
        handle
            .send_frame(
                conn,
                ClientFrame::Publish {
                    topic: "chat".into(),
                    payload: serde_json::json!("hi"),
                    client_msg_id: "c1".into(),
                    request_id: None,
                    client_publish_ts: None,
                    ack: false,
                },
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let Outbound::Frame(ServerFrame::Ack(ack)) = rx.try_recv().unwrap() else { panic!("expected ack") };
        assert!(!ack.ok);
        assert_eq!(ack.code, Some(AckErrorCode::Forbidden));
    }

    #[tokio::test]
    async fn expired_grant_closes_with_unauthorized_code() {
        let mut grant = test_grant(vec![TopicGrant { topic: "chat".into(), scope: Scope::Read }]);
        grant.expires_at = 0;
        let handle = spawn_test_actor(grant).await;
        let (tx, mut rx) = unbounded_channel();
        let (conn, _egress) = handle.register(tx).await.unwrap();
        handle.send_frame(conn, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let Outbound::Close(code) = rx.try_recv().unwrap() else { panic!("expected close") };
        assert_eq!(code, CloseCode::Unauthorized);
    }

    #[tokio::test]
    async fn idempotent_subscribe_keeps_a_single_membership() {
        let grant = test_grant(vec![TopicGrant { topic: "chat".into(), scope: Scope::Read }]);
        let handle = spawn_test_actor(grant).await;
        let (tx, mut rx) = unbounded_channel();
        let (conn, _egress) = handle.register(tx).await.unwrap();
        handle.send_frame(conn, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();
        for _ in 0..3 {
            handle.send_frame(conn, ClientFrame::Subscribe { topic: "chat".into(), request_id: None }).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut acks = 0;
        while let Ok(Outbound::Frame(ServerFrame::Ack(ack))) = rx.try_recv() {
            assert!(ack.ok);
            acks += 1;
        }
        assert_eq!(acks, 3);
    }

    #[tokio::test]
    async fn shutdown_closes_connections_with_precondition_failed() {
        let grant = test_grant(vec![TopicGrant { topic: "chat".into(), scope: Scope::Read }]);
        let handle = spawn_test_actor(grant).await;
        let (tx, mut rx) = unbounded_channel();
        let (conn, _egress) = handle.register(tx).await.unwrap();
        handle.send_frame(conn, ClientFrame::Connect { grant_jwt: "ok".into() }).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.shutdown();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut saw_close = false;
        while let Ok(outbound) = rx.try_recv() {
            if let Outbound::Close(code) = outbound {
                assert_eq!(code, CloseCode::PreconditionFailed);
                saw_close = true;
            }
        }
        assert!(saw_close, "expected a close frame after shutdown");
    }
}
