// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection protocol state machine (§4.3, §4.5, §4.6).
//!
//! A session owns exactly one transport connection and the bookkeeping
//! for its open transactions. It never touches another connection's
//! state directly — the only channel it has to the rest of the world is
//! the shared [`DomainRuntime`]: it locks the domain to run a mutation,
//! drops the lock, then fans the resulting notifications out through
//! `DomainRuntime::deliver`, which pushes onto each recipient session's
//! own queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use pathfinder_core::{Filter, SubscriptionId, TransactionId};
use pathfinder_wire::{
    read_request, write_reply, ClientNotify, Command, FailBody, FailReason, Framing, MatchType,
    MsgType, NotifyBody, Request, RequestMessage, ReplyBody, ReplyMessage, ServiceNotify,
    SubscriptionNotify, TrackNotify, TrackType, WireProperties,
};

use crate::domain::UserIdentity;
use crate::error::SessionError;
use crate::notify::ServiceMatch;
use crate::runtime::DomainRuntime;

/// How long an `UNGREETED` connection is allowed to go without sending
/// `hello` before the transport is closed (§4.3, "implementation-defined
/// grace period").
const HELLO_GRACE_SECS: u64 = 10;

const READER_QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Ungreeted,
    Ready,
}

enum OpenTransaction {
    Subscribe(SubscriptionId),
    Track,
}

/// Drives one connection end to end: `pathfinder_server::listener` hands
/// this the split transport halves and the domain it belongs to.
pub async fn run<R, W>(
    runtime: Arc<DomainRuntime>,
    user: UserIdentity,
    reader: R,
    writer: W,
    framing: Framing,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::new(runtime, user);
    let result = session.drive(reader, writer, framing).await;
    session.teardown();
    result
}

struct Session {
    runtime: Arc<DomainRuntime>,
    user: UserIdentity,
    state: SessionState,
    client_id: Option<pathfinder_core::ClientId>,
    hello: Option<(pathfinder_core::ClientId, u8, u8)>,
    protocol_version: u8,
    transactions: HashMap<TransactionId, OpenTransaction>,
    subscription_ta: HashMap<SubscriptionId, TransactionId>,
    track_ta: Option<TransactionId>,
    awaiting_track_reply: bool,
    last_activity: Instant,
    events_rx: Option<mpsc::Receiver<ServiceMatch>>,
}

impl Session {
    fn new(runtime: Arc<DomainRuntime>, user: UserIdentity) -> Self {
        Session {
            runtime,
            user,
            state: SessionState::Ungreeted,
            client_id: None,
            hello: None,
            protocol_version: 0,
            transactions: HashMap::new(),
            subscription_ta: HashMap::new(),
            track_ta: None,
            awaiting_track_reply: false,
            last_activity: Instant::now(),
            events_rx: None,
        }
    }

    async fn drive<R, W>(&mut self, reader: R, mut writer: W, framing: Framing) -> Result<(), SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let mut requests_rx = spawn_reader(reader, framing);
        loop {
            let deadline = self.idle_deadline();
            tokio::select! {
                maybe_request = requests_rx.recv() => {
                    match maybe_request {
                        Some(Ok(request)) => {
                            self.last_activity = Instant::now();
                            if let Some(client_id) = self.client_id {
                                self.runtime.domain.lock().touch_activity(client_id, self.last_activity);
                            }
                            self.handle_inbound(request, &mut writer, framing).await?;
                        }
                        Some(Err(err)) => return Err(SessionError::from(err)),
                        None => return Ok(()),
                    }
                }
                maybe_event = recv_event(&mut self.events_rx) => {
                    if let Some(service_match) = maybe_event {
                        self.deliver_notification(service_match, &mut writer, framing).await?;
                    }
                }
                _ = tokio::time::sleep(deadline) => {
                    self.on_idle_timeout(&mut writer, framing).await?;
                }
            }
        }
    }

    fn idle_deadline(&self) -> Duration {
        match self.client_id {
            None => Duration::from_secs(HELLO_GRACE_SECS),
            Some(client_id) => {
                let mut limit = self.runtime.idle.max;
                if let Some(ttl) = self.runtime.domain.lock().min_owned_service_ttl(client_id) {
                    limit = limit.min(ttl);
                }
                limit = limit.max(self.runtime.idle.min);
                let elapsed = self.last_activity.elapsed();
                Duration::from_secs(limit).saturating_sub(elapsed)
            }
        }
    }

    async fn on_idle_timeout<W: AsyncWrite + Unpin>(&mut self, writer: &mut W, framing: Framing) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::HelloGraceExpired);
        }
        if self.awaiting_track_reply {
            return Err(SessionError::LivenessTimeout);
        }
        let Some(ta_id) = self.track_ta else {
            return Err(SessionError::LivenessTimeout);
        };
        let body = NotifyBody::Track(TrackNotify { track_type: TrackType::Query });
        send(writer, framing, notify(ta_id, Command::Track, body)).await?;
        self.awaiting_track_reply = true;
        Ok(())
    }

    async fn handle_inbound<W: AsyncWrite + Unpin>(
        &mut self,
        request: RequestMessage,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        match request.msg_type {
            MsgType::Request => self.handle_request(request.ta_id, request.body, writer, framing).await,
            MsgType::TrackReply => {
                if self.track_ta == Some(request.ta_id) && self.awaiting_track_reply {
                    self.awaiting_track_reply = false;
                } else {
                    tracing::debug!(ta_id = request.ta_id, "ignoring unsolicited track-reply");
                }
                Ok(())
            }
            other => Err(SessionError::UnexpectedMessageType(other)),
        }
    }

    async fn handle_request<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: Request,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        if self.transactions.contains_key(&ta_id) {
            return Err(SessionError::DuplicateTransactionId(ta_id));
        }

        if self.state == SessionState::Ungreeted {
            return match body {
                Request::Hello(hello) => self.handle_hello(ta_id, hello, writer, framing).await,
                other => send(writer, framing, fail(ta_id, command_of(&other), FailReason::NoHello)).await,
            };
        }

        match body {
            Request::Hello(hello) => self.handle_hello(ta_id, hello, writer, framing).await,
            Request::Ping => send(writer, framing, complete(ta_id, Command::Ping)).await,
            Request::Publish(b) => self.handle_publish(ta_id, b, writer, framing).await,
            Request::Unpublish(b) => self.handle_unpublish(ta_id, b, writer, framing).await,
            Request::Subscribe(b) => self.handle_subscribe(ta_id, b, writer, framing).await,
            Request::Unsubscribe(b) => self.handle_unsubscribe(ta_id, b, writer, framing).await,
            Request::Services(b) => self.handle_services(ta_id, b, writer, framing).await,
            Request::Subscriptions => self.handle_subscriptions(ta_id, writer, framing).await,
            Request::Clients => self.handle_clients(ta_id, writer, framing).await,
            Request::Track(b) => self.handle_track(ta_id, b, writer, framing).await,
        }
    }

    async fn handle_hello<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::HelloBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        if let Some((client_id, min, max)) = self.hello {
            if client_id == body.client_id
                && min == body.protocol_minimum_version
                && max == body.protocol_maximum_version
            {
                return send(writer, framing, complete(ta_id, Command::Hello)).await;
            }
            return Err(SessionError::HelloMismatch);
        }

        let server_range = self.runtime.protocol_version;
        let negotiated = server_range.max.min(body.protocol_maximum_version);
        let floor = server_range.min.max(body.protocol_minimum_version);
        if negotiated < floor {
            return send(writer, framing, fail(ta_id, Command::Hello, FailReason::UnsupportedProtocolVersion)).await;
        }

        let admitted = {
            let mut domain = self.runtime.domain.lock();
            if domain.client_id_in_use(body.client_id) {
                Err(FailReason::ClientIdExists)
            } else {
                domain.admit_client(body.client_id, self.user.clone(), negotiated, Instant::now())
            }
        };
        if let Err(reason) = admitted {
            return send(writer, framing, fail(ta_id, Command::Hello, reason)).await;
        }

        self.client_id = Some(body.client_id);
        self.protocol_version = negotiated;
        self.hello = Some((body.client_id, body.protocol_minimum_version, body.protocol_maximum_version));
        self.state = SessionState::Ready;
        self.events_rx = Some(self.runtime.register(body.client_id));
        send(writer, framing, complete(ta_id, Command::Hello)).await
    }

    async fn handle_publish<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::PublishBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let caller = self.ready_client_id()?;
        let properties = body.properties.into();
        let result = {
            let mut domain = self.runtime.domain.lock();
            domain.publish(caller, &self.user, body.service_id, body.generation, properties, body.ttl)
        };
        match result {
            Ok(notifications) => {
                self.runtime.deliver(notifications);
                send(writer, framing, complete(ta_id, Command::Publish)).await
            }
            Err(reason) => send(writer, framing, fail(ta_id, Command::Publish, reason)).await,
        }
    }

    async fn handle_unpublish<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::UnpublishBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let caller = self.ready_client_id()?;
        let result = {
            let mut domain = self.runtime.domain.lock();
            domain.unpublish(caller, &self.user, body.service_id)
        };
        match result {
            Ok(notifications) => {
                self.runtime.deliver(notifications);
                send(writer, framing, complete(ta_id, Command::Unpublish)).await
            }
            Err(reason) => send(writer, framing, fail(ta_id, Command::Unpublish, reason)).await,
        }
    }

    async fn handle_subscribe<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::SubscribeBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let filter = match body.filter.as_deref().map(str::parse::<Filter>) {
            Some(Ok(f)) => Some(f),
            Some(Err(_)) => {
                return send(writer, framing, fail(ta_id, Command::Subscribe, FailReason::InvalidFilterSyntax)).await;
            }
            None => None,
        };

        let caller = self.ready_client_id()?;
        let result = {
            let mut domain = self.runtime.domain.lock();
            domain.subscribe(caller, &self.user, body.subscription_id, filter, body.filter.clone())
        };
        match result {
            Ok(notifications) => {
                send(writer, framing, accept(ta_id, Command::Subscribe)).await?;
                self.transactions.insert(ta_id, OpenTransaction::Subscribe(body.subscription_id));
                self.subscription_ta.insert(body.subscription_id, ta_id);
                for m in notifications {
                    send(writer, framing, notify(ta_id, Command::Subscribe, service_notify(&m))).await?;
                }
                Ok(())
            }
            Err(reason) => send(writer, framing, fail(ta_id, Command::Subscribe, reason)).await,
        }
    }

    async fn handle_unsubscribe<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::UnsubscribeBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let caller = self.ready_client_id()?;
        let result = {
            let mut domain = self.runtime.domain.lock();
            domain.unsubscribe(caller, &self.user, body.subscription_id)
        };
        match result {
            Ok(()) => {
                if let Some(sub_ta) = self.subscription_ta.remove(&body.subscription_id) {
                    self.transactions.remove(&sub_ta);
                    send(writer, framing, complete(sub_ta, Command::Subscribe)).await?;
                }
                send(writer, framing, complete(ta_id, Command::Unsubscribe)).await
            }
            Err(reason) => send(writer, framing, fail(ta_id, Command::Unsubscribe, reason)).await,
        }
    }

    async fn handle_services<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::ServicesBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let filter = match body.filter.as_deref().map(str::parse::<Filter>) {
            Some(Ok(f)) => Some(f),
            Some(Err(_)) => {
                return send(writer, framing, fail(ta_id, Command::Services, FailReason::InvalidFilterSyntax)).await;
            }
            None => None,
        };

        let snapshot: Vec<_> = {
            let domain = self.runtime.domain.lock();
            domain
                .services_snapshot(filter.as_ref())
                .into_iter()
                .map(|s| ServiceNotify {
                    match_type: MatchType::Appeared,
                    service_id: s.id,
                    generation: s.generation,
                    properties: WireProperties::from(&s.properties),
                    ttl: s.ttl_secs,
                    orphan_since: s.orphan_since,
                })
                .collect()
        };

        send(writer, framing, accept(ta_id, Command::Services)).await?;
        for entry in snapshot {
            send(writer, framing, notify(ta_id, Command::Services, NotifyBody::Service(entry))).await?;
        }
        send(writer, framing, complete(ta_id, Command::Services)).await
    }

    async fn handle_subscriptions<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let snapshot: Vec<_> = {
            let domain = self.runtime.domain.lock();
            domain
                .subscriptions_snapshot()
                .into_iter()
                .map(|s| SubscriptionNotify { subscription_id: s.id, filter: s.filter_source.clone() })
                .collect()
        };

        send(writer, framing, accept(ta_id, Command::Subscriptions)).await?;
        for entry in snapshot {
            send(writer, framing, notify(ta_id, Command::Subscriptions, NotifyBody::Subscription(entry))).await?;
        }
        send(writer, framing, complete(ta_id, Command::Subscriptions)).await
    }

    async fn handle_clients<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let extended_fields = self.protocol_version >= 3;
        let snapshot: Vec<_> = {
            let domain = self.runtime.domain.lock();
            domain
                .clients_snapshot()
                .into_iter()
                .map(|c| ClientNotify {
                    client_id: c.id,
                    protocol_version: extended_fields.then_some(c.protocol_version),
                    idle_time_ms: extended_fields
                        .then_some(c.last_activity.elapsed().as_millis() as u64),
                    last_ping_latency_ms: None,
                })
                .collect()
        };

        send(writer, framing, accept(ta_id, Command::Clients)).await?;
        for entry in snapshot {
            send(writer, framing, notify(ta_id, Command::Clients, NotifyBody::Client(entry))).await?;
        }
        send(writer, framing, complete(ta_id, Command::Clients)).await
    }

    /// `track-type: query` on the request itself is the client's
    /// symmetric probe (§4.6): answered immediately, no transaction
    /// installed. Its absence establishes (or refreshes) the
    /// long-lived liveness transaction the server later pushes
    /// `notify(track-type=query)` on.
    async fn handle_track<W: AsyncWrite + Unpin>(
        &mut self,
        ta_id: TransactionId,
        body: pathfinder_wire::TrackBody,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        match body.track_type {
            Some(TrackType::Query) => send(writer, framing, complete(ta_id, Command::Track)).await,
            None => {
                if let Some(old_ta) = self.track_ta.take() {
                    self.transactions.remove(&old_ta);
                    send(writer, framing, complete(old_ta, Command::Track)).await?;
                }
                send(writer, framing, accept(ta_id, Command::Track)).await?;
                self.track_ta = Some(ta_id);
                self.awaiting_track_reply = false;
                self.transactions.insert(ta_id, OpenTransaction::Track);
                Ok(())
            }
        }
    }

    async fn deliver_notification<W: AsyncWrite + Unpin>(
        &mut self,
        m: ServiceMatch,
        writer: &mut W,
        framing: Framing,
    ) -> Result<(), SessionError> {
        let Some(&ta_id) = self.subscription_ta.get(&m.subscription_id) else {
            return Ok(());
        };
        send(writer, framing, notify(ta_id, Command::Subscribe, service_notify(&m))).await
    }

    /// `handle_request` only dispatches to the command handlers below
    /// once `self.state == Ready`, which `handle_hello` never sets
    /// without first recording `client_id` — so this should always find
    /// one. Returns an error instead of panicking if that invariant is
    /// ever broken.
    fn ready_client_id(&self) -> Result<pathfinder_core::ClientId, SessionError> {
        self.client_id
            .ok_or(SessionError::InvariantViolation("ready state reached without a client id"))
    }

    fn teardown(&mut self) {
        let Some(client_id) = self.client_id.take() else { return };
        self.runtime.unregister(client_id);
        let (notifications, orphaned) = self.runtime.domain.lock().remove_client(client_id, epoch_now());
        self.runtime.deliver(notifications);
        for (service_id, ttl_secs) in orphaned {
            self.runtime.schedule_reap(service_id, ttl_secs);
        }
    }
}

fn command_of(request: &Request) -> Command {
    match request {
        Request::Hello(_) => Command::Hello,
        Request::Ping => Command::Ping,
        Request::Publish(_) => Command::Publish,
        Request::Unpublish(_) => Command::Unpublish,
        Request::Subscribe(_) => Command::Subscribe,
        Request::Unsubscribe(_) => Command::Unsubscribe,
        Request::Services(_) => Command::Services,
        Request::Subscriptions => Command::Subscriptions,
        Request::Clients => Command::Clients,
        Request::Track(_) => Command::Track,
    }
}

fn service_notify(m: &ServiceMatch) -> NotifyBody {
    NotifyBody::Service(ServiceNotify {
        match_type: m.match_type,
        service_id: m.service_id,
        generation: m.generation,
        properties: WireProperties::from(&m.properties),
        ttl: m.ttl_secs,
        orphan_since: m.orphan_since,
    })
}

fn fail(ta_id: TransactionId, ta_cmd: Command, reason: FailReason) -> ReplyMessage {
    ReplyMessage { ta_id, ta_cmd, body: ReplyBody::Fail(FailBody { fail_reason: reason }) }
}

fn accept(ta_id: TransactionId, ta_cmd: Command) -> ReplyMessage {
    debug_assert!(ta_cmd.is_multi_response(), "{ta_cmd:?} has no accept phase");
    ReplyMessage { ta_id, ta_cmd, body: ReplyBody::Accept }
}

fn complete(ta_id: TransactionId, ta_cmd: Command) -> ReplyMessage {
    ReplyMessage { ta_id, ta_cmd, body: ReplyBody::Complete }
}

fn notify(ta_id: TransactionId, ta_cmd: Command, body: NotifyBody) -> ReplyMessage {
    debug_assert!(ta_cmd.is_multi_response(), "{ta_cmd:?} has no notify phase");
    ReplyMessage { ta_id, ta_cmd, body: ReplyBody::Notify(body) }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, framing: Framing, reply: ReplyMessage) -> Result<(), SessionError> {
    write_reply(writer, framing, &reply).await.map_err(SessionError::from)
}

async fn recv_event(rx: &mut Option<mpsc::Receiver<ServiceMatch>>) -> Option<ServiceMatch> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn spawn_reader<R>(mut reader: R, framing: Framing) -> mpsc::Receiver<Result<RequestMessage, pathfinder_wire::CodecError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(READER_QUEUE_DEPTH);
    tokio::spawn(async move {
        loop {
            match read_request(&mut reader, framing).await {
                Ok(request) => {
                    if tx.send(Ok(request)).await.is_err() {
                        break;
                    }
                }
                Err(pathfinder_wire::CodecError::Eof) => break,
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
    });
    rx
}

fn epoch_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainConfig, ResourcesConfig};
    use pathfinder_core::ClientId;
    use pathfinder_wire::{HelloBody, MsgType, PublishBody, Request};
    use tokio::io::AsyncWriteExt;

    fn runtime() -> Arc<DomainRuntime> {
        Arc::new(DomainRuntime::new(&DomainConfig::default(), &ResourcesConfig::default(), 0))
    }

    async fn handshake(client: &mut tokio::io::DuplexStream, client_id: i64) -> ReplyMessage {
        let request = RequestMessage {
            ta_id: 1,
            msg_type: MsgType::Request,
            body: Request::Hello(HelloBody {
                client_id: ClientId::new(client_id).expect("in range"),
                protocol_minimum_version: 2,
                protocol_maximum_version: 3,
            }),
        };
        let bytes = serde_json::to_vec(&request).expect("encode");
        client.write_all(&bytes).await.expect("write");
        client.write_all(b"\n").await.expect("write newline");
        read_one_reply(client).await
    }

    async fn read_one_reply(client: &mut tokio::io::DuplexStream) -> ReplyMessage {
        use tokio::io::AsyncBufReadExt;
        let mut reader = tokio::io::BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).await.expect("read a line");
        serde_json::from_str(&line).expect("decode reply")
    }

    #[tokio::test]
    async fn hello_then_publish_completes() {
        let runtime = runtime();
        let (mut client, server) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(server);
        let handle = tokio::spawn(run(
            runtime,
            UserIdentity::local_socket(),
            reader,
            writer,
            Framing::NewlineDelimited,
        ));

        let hello_reply = handshake(&mut client, 1).await;
        assert_eq!(hello_reply.ta_cmd, Command::Hello);
        assert!(matches!(hello_reply.body, ReplyBody::Complete));

        let publish = RequestMessage {
            ta_id: 2,
            msg_type: MsgType::Request,
            body: Request::Publish(PublishBody {
                service_id: pathfinder_core::ServiceId::new(10).expect("in range"),
                generation: 1,
                properties: WireProperties::from(&pathfinder_core::Properties::new()),
                ttl: 30,
            }),
        };
        let bytes = serde_json::to_vec(&publish).expect("encode");
        client.write_all(&bytes).await.expect("write");
        client.write_all(b"\n").await.expect("write newline");
        let publish_reply = read_one_reply(&mut client).await;
        assert_eq!(publish_reply.ta_cmd, Command::Publish);
        assert!(matches!(publish_reply.body, ReplyBody::Complete));

        drop(client);
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session task finished")
            .expect("session task didn't panic");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn request_before_hello_fails_with_no_hello() {
        let runtime = runtime();
        let (mut client, server) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(server);
        let _handle = tokio::spawn(run(
            runtime,
            UserIdentity::local_socket(),
            reader,
            writer,
            Framing::NewlineDelimited,
        ));

        let ping = RequestMessage { ta_id: 1, msg_type: MsgType::Request, body: Request::Ping };
        let bytes = serde_json::to_vec(&ping).expect("encode");
        client.write_all(&bytes).await.expect("write");
        client.write_all(b"\n").await.expect("write newline");

        let reply = read_one_reply(&mut client).await;
        assert_eq!(reply.ta_cmd, Command::Ping);
        assert!(matches!(reply.body, ReplyBody::Fail(FailBody { fail_reason: FailReason::NoHello })));
    }
}
