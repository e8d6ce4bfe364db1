//! TCP transport on tokio
//!
//! Every connection carries length-prefixed bincode frames (see
//! [`crate::net::framing`]). A client opens with `Hello { peer_id }`; the host
//! only reports a peer once that frame has arrived. The join code is simply the
//! host's socket address.
//!
//! Each peer has a small bounded outbound queue. Snapshots are latest-wins, so
//! a peer that stops reading loses frames rather than growing host memory.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::constants::net::OUTBOUND_QUEUE_FRAMES;
use crate::net::framing::{read_frame, write_frame, write_message, FramingError};
use crate::net::mailbox::{Mailbox, MailboxError, MailboxSender};
use crate::net::protocol::{encode, ClientMessage, PeerId, ServerMessage};
use crate::net::transport::{
    ClientEvent, ClientTransport, HostEvent, HostTransport, JoinCode, NetError,
};

/// Pre-encoded frame shared between peer writers
type Frame = Arc<Vec<u8>>;

type PeerWriters = Arc<Mutex<HashMap<PeerId, mpsc::Sender<Frame>>>>;

/// Outcome of handing a frame to a writer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queued {
    Sent,
    /// Queue full; the frame was dropped
    Full,
    /// Writer already gone
    Closed,
}

fn queue_frame(tx: &mpsc::Sender<Frame>, frame: Frame) -> Queued {
    match tx.try_send(frame) {
        Ok(()) => Queued::Sent,
        Err(TrySendError::Full(_)) => Queued::Full,
        Err(TrySendError::Closed(_)) => Queued::Closed,
    }
}

/// Drain `rx` into the socket until the channel closes or the socket fails
async fn pump_frames(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_message(&mut writer, &frame).await {
            debug!(error = %e, "Writer stopped");
            break;
        }
    }
}

pub struct TcpHost {
    code: JoinCode,
    local_addr: SocketAddr,
    inbox: Mailbox<HostEvent>,
    peers: PeerWriters,
    shutdown: watch::Sender<bool>,
    accept_task: Option<JoinHandle<()>>,
    dropped_frames: u64,
}

impl TcpHost {
    /// Bind and start accepting peers on the current runtime
    pub async fn bind(addr: &str, handshake_timeout: Duration) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| NetError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| NetError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let inbox = Mailbox::default();
        let peers: PeerWriters = Arc::default();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let accept_task = tokio::spawn(accept_loop(
            listener,
            inbox.sender(),
            peers.clone(),
            shutdown_rx,
            handshake_timeout,
        ));
        info!(%local_addr, "TCP host listening");

        Ok(Self {
            code: JoinCode(local_addr.to_string()),
            local_addr,
            inbox,
            peers,
            shutdown,
            accept_task: Some(accept_task),
            dropped_frames: 0,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Frames discarded because a peer's queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Frames waiting in `peer`'s writer queue
    pub fn backlog(&self, peer: PeerId) -> Option<usize> {
        self.peers
            .lock()
            .get(&peer)
            .map(|tx| tx.max_capacity() - tx.capacity())
    }

    fn enqueue(&mut self, peer: PeerId, tx: &mpsc::Sender<Frame>, frame: Frame) {
        match queue_frame(tx, frame) {
            Queued::Sent => {}
            Queued::Full => {
                self.dropped_frames += 1;
                warn!(%peer, "Peer not reading, dropping frame");
            }
            Queued::Closed => debug!(%peer, "Writer closed"),
        }
    }

    fn encode_frame(message: &ServerMessage) -> Option<Frame> {
        match encode(message) {
            Ok(bytes) => Some(Arc::new(bytes)),
            Err(e) => {
                warn!(error = %e, "Failed to encode server message");
                None
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    inbox: MailboxSender<HostEvent>,
    peers: PeerWriters,
    mut shutdown: watch::Receiver<bool>,
    handshake_timeout: Duration,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "Incoming connection");
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!(%addr, error = %e, "set_nodelay failed");
                    }
                    tokio::spawn(serve_peer(
                        stream,
                        addr,
                        inbox.clone(),
                        peers.clone(),
                        shutdown.clone(),
                        handshake_timeout,
                    ));
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    addr: SocketAddr,
    inbox: MailboxSender<HostEvent>,
    peers: PeerWriters,
    mut shutdown: watch::Receiver<bool>,
    handshake_timeout: Duration,
) {
    let (mut reader, writer) = stream.into_split();

    let hello = tokio::time::timeout(handshake_timeout, read_frame::<ClientMessage, _>(&mut reader)).await;
    let peer = match hello {
        Ok(Ok(ClientMessage::Hello { peer_id })) => peer_id,
        Ok(Ok(other)) => {
            warn!(%addr, ?other, "Expected Hello as first frame");
            return;
        }
        Ok(Err(e)) => {
            debug!(%addr, error = %e, "Handshake failed");
            return;
        }
        Err(_) => {
            warn!(%addr, "Handshake timed out");
            return;
        }
    };

    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_FRAMES);
    let writer_task = tokio::spawn(pump_frames(writer, rx));
    peers.lock().insert(peer, tx);
    info!(%peer, %addr, "Peer connected");
    report_lifecycle(&inbox, &shutdown, HostEvent::PeerConnected(peer)).await;

    loop {
        tokio::select! {
            frame = read_frame::<ClientMessage, _>(&mut reader) => match frame {
                Ok(ClientMessage::Goodbye) => break,
                Ok(message) => {
                    if let Err(e) = inbox.try_send(HostEvent::PeerMessage { peer, message }) {
                        warn!(%peer, error = %e, "Dropping peer message");
                    }
                }
                Err(FramingError::ConnectionClosed) => break,
                Err(e) => {
                    warn!(%peer, error = %e, "Peer stream error");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    peers.lock().remove(&peer);
    writer_task.abort();
    info!(%peer, "Peer disconnected");
    report_lifecycle(&inbox, &shutdown, HostEvent::PeerDisconnected(peer)).await;
}

/// Deliver a connect/disconnect event, waiting for mailbox room if needed
///
/// Once the host is shutting down nobody drains the mailbox, so delivery is
/// attempted once.
async fn report_lifecycle(
    inbox: &MailboxSender<HostEvent>,
    shutdown: &watch::Receiver<bool>,
    event: HostEvent,
) {
    if *shutdown.borrow() {
        if let Err(e) = inbox.try_send(event) {
            debug!(error = %e, "Lifecycle event dropped during shutdown");
        }
        return;
    }
    match inbox.send_reliable(event).await {
        Ok(()) => {}
        Err(MailboxError::Disconnected) => debug!("Host gone, lifecycle event dropped"),
        Err(e) => warn!(error = %e, "Lifecycle event lost"),
    }
}

impl HostTransport for TcpHost {
    fn join_code(&self) -> &JoinCode {
        &self.code
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = Self::encode_frame(message) else {
            return;
        };
        let targets: Vec<(PeerId, mpsc::Sender<Frame>)> = self
            .peers
            .lock()
            .iter()
            .map(|(peer, tx)| (*peer, tx.clone()))
            .collect();
        for (peer, tx) in &targets {
            self.enqueue(*peer, tx, frame.clone());
        }
    }

    fn send_to(&mut self, peer: PeerId, message: &ServerMessage) {
        let Some(frame) = Self::encode_frame(message) else {
            return;
        };
        let tx = self.peers.lock().get(&peer).cloned();
        if let Some(tx) = tx {
            self.enqueue(peer, &tx, frame);
        }
    }

    fn poll(&mut self) -> Vec<HostEvent> {
        self.inbox.drain()
    }

    fn close(&mut self) {
        let Some(task) = self.accept_task.take() else {
            return;
        };
        let _ = self.shutdown.send(true);
        task.abort();
        self.peers.lock().clear();
        info!(addr = %self.local_addr, "TCP host closed");
    }
}

impl Drop for TcpHost {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct TcpClient {
    peer_id: PeerId,
    outbound: Option<mpsc::Sender<Frame>>,
    inbox: Mailbox<ClientEvent>,
    reader_task: Option<JoinHandle<()>>,
}

impl TcpClient {
    /// Connect to the host at `code` (a socket address) and say hello
    pub async fn connect(code: &str, timeout: Duration) -> Result<Self, NetError> {
        let addr: SocketAddr = code
            .trim()
            .parse()
            .map_err(|_| NetError::InvalidJoinCode(code.to_string()))?;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetError::Timeout(timeout.as_millis() as u64))?
            .map_err(|source| NetError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "set_nodelay failed");
        }

        let peer_id = Uuid::new_v4();
        let (reader, mut writer) = stream.into_split();
        write_frame(&mut writer, &ClientMessage::Hello { peer_id }).await?;

        let inbox = Mailbox::default();
        let reader_task = tokio::spawn(read_server(reader, inbox.sender()));
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_FRAMES);
        tokio::spawn(pump_frames(writer, rx));
        info!(%addr, %peer_id, "Connected to host");

        Ok(Self {
            peer_id,
            outbound: Some(tx),
            inbox,
            reader_task: Some(reader_task),
        })
    }
}

async fn read_server(mut reader: OwnedReadHalf, inbox: MailboxSender<ClientEvent>) {
    loop {
        match read_frame::<ServerMessage, _>(&mut reader).await {
            Ok(message) => {
                if let Err(e) = inbox.try_send(ClientEvent::Message(message)) {
                    warn!(error = %e, "Dropping host message");
                }
            }
            Err(FramingError::ConnectionClosed) => break,
            Err(e) => {
                warn!(error = %e, "Host stream error");
                break;
            }
        }
    }
    if let Err(e) = inbox.send_reliable(ClientEvent::Disconnected).await {
        debug!(error = %e, "Client gone before disconnect was reported");
    }
}

impl ClientTransport for TcpClient {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn send_to_host(&mut self, message: &ClientMessage) {
        let Some(tx) = &self.outbound else {
            return;
        };
        match encode(message) {
            Ok(bytes) => {
                if queue_frame(tx, Arc::new(bytes)) == Queued::Full {
                    warn!(peer = %self.peer_id, "Host not reading, dropping frame");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode client message"),
        }
    }

    fn poll(&mut self) -> Vec<ClientEvent> {
        self.inbox.drain()
    }

    fn close(&mut self) {
        if self.outbound.is_none() {
            return;
        }
        self.send_to_host(&ClientMessage::Goodbye);
        // Dropping the sender lets the writer flush Goodbye and exit
        self.outbound = None;
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Color, EntityKind, FoodKind};
    use crate::net::protocol::{PlayerInput, SnapshotRecord, WorldSnapshot};

    const WAIT: Duration = Duration::from_secs(5);

    async fn poll_host_until(host: &mut TcpHost, n: usize) -> Vec<HostEvent> {
        let mut events = Vec::new();
        let deadline = tokio::time::Instant::now() + WAIT;
        while events.len() < n && tokio::time::Instant::now() < deadline {
            events.extend(host.poll());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        events
    }

    async fn poll_client_until(client: &mut TcpClient, n: usize) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let deadline = tokio::time::Instant::now() + WAIT;
        while events.len() < n && tokio::time::Instant::now() < deadline {
            events.extend(client.poll());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        events
    }

    #[tokio::test]
    async fn test_host_client_exchange() {
        let mut host = TcpHost::bind("127.0.0.1:0", WAIT).await.unwrap();
        let code = host.join_code().clone();
        let mut client = TcpClient::connect(code.as_str(), WAIT).await.unwrap();
        let peer = client.peer_id();

        let events = poll_host_until(&mut host, 1).await;
        assert_eq!(events, vec![HostEvent::PeerConnected(peer)]);

        let input = PlayerInput {
            up: true,
            ..Default::default()
        };
        client.send_to_host(&ClientMessage::Input(input.clone()));
        let events = poll_host_until(&mut host, 1).await;
        assert_eq!(
            events,
            vec![HostEvent::PeerMessage {
                peer,
                message: ClientMessage::Input(input)
            }]
        );

        host.send_to(peer, &ServerMessage::Welcome { peer_id: peer, entity_id: 9 });
        host.broadcast(&ServerMessage::State(WorldSnapshot::default()));
        let events = poll_client_until(&mut client, 2).await;
        assert_eq!(
            events[0],
            ClientEvent::Message(ServerMessage::Welcome { peer_id: peer, entity_id: 9 })
        );

        client.close();
        let events = poll_host_until(&mut host, 1).await;
        assert_eq!(events, vec![HostEvent::PeerDisconnected(peer)]);
        assert_eq!(host.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_client_sees_host_close() {
        let mut host = TcpHost::bind("127.0.0.1:0", WAIT).await.unwrap();
        let mut client = TcpClient::connect(host.join_code().as_str(), WAIT).await.unwrap();
        poll_host_until(&mut host, 1).await;

        host.close();
        let events = poll_client_until(&mut client, 1).await;
        assert_eq!(events.last(), Some(&ClientEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_connect_errors() {
        assert!(matches!(
            TcpClient::connect("not an address", WAIT).await,
            Err(NetError::InvalidJoinCode(_))
        ));

        // Grab a free port, then close it again
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = TcpClient::connect(&addr.to_string(), WAIT).await;
        assert!(matches!(result, Err(NetError::Connect { .. })));
    }

    #[test]
    fn test_queue_frame_reports_full() {
        let (tx, rx) = mpsc::channel(2);
        let frame: Frame = Arc::new(vec![1, 2, 3]);
        assert_eq!(queue_frame(&tx, frame.clone()), Queued::Sent);
        assert_eq!(queue_frame(&tx, frame.clone()), Queued::Sent);
        assert_eq!(queue_frame(&tx, frame.clone()), Queued::Full);

        drop(rx);
        assert_eq!(queue_frame(&tx, frame), Queued::Closed);
    }

    fn bulky_snapshot() -> ServerMessage {
        let record = |id| SnapshotRecord {
            id,
            kind: EntityKind::Food(FoodKind::Square),
            x: 1,
            y: 2,
            rotation: 0.0,
            health: 10,
            max_health: 10,
            color: Color(0),
            radius: 15.0,
            level: 1,
            class_index: 0,
            hit_flash: false,
        };
        ServerMessage::State(WorldSnapshot {
            entities: (0..20_000).map(record).collect(),
        })
    }

    #[tokio::test]
    async fn test_stalled_peer_backlog_is_bounded() {
        let mut host = TcpHost::bind("127.0.0.1:0", WAIT).await.unwrap();
        let addr = host.local_addr();

        // Says hello, then never reads
        let stalled = TcpStream::connect(addr).await.unwrap();
        let (_reader, mut writer) = stalled.into_split();
        let peer = Uuid::new_v4();
        write_frame(&mut writer, &ClientMessage::Hello { peer_id: peer })
            .await
            .unwrap();
        assert_eq!(poll_host_until(&mut host, 1).await, vec![HostEvent::PeerConnected(peer)]);

        let snapshot = bulky_snapshot();
        for _ in 0..300 {
            host.broadcast(&snapshot);
            tokio::task::yield_now().await;
        }

        assert!(host.dropped_frames() > 0);
        let backlog = host.backlog(peer).unwrap();
        assert!(backlog <= OUTBOUND_QUEUE_FRAMES);
    }
}
