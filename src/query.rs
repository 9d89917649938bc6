use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, warn};
use tokio::net::UdpSocket;

use crate::destination::{Destination, Targets};
use crate::error::QueryError;
use crate::event::{Event, EventKind, EventSurface, SubscriptionId};
use crate::info::{decode_info, decode_status};
use crate::master::ServerEntry;
use crate::packet::{QueryKind, RequestPacket, ResponseKind, ResponsePacket, DEFAULT_SERVERS_PROTOCOL};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local address to bind. Defaults to any port on all interfaces.
    pub bind_addr: String,
    /// Largest datagram that can be received in one piece.
    pub recv_buffer_size: usize,
    /// Protocol tag sent with `getservers`.
    pub servers_protocol: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            bind_addr: "0.0.0.0:0".to_owned(),
            recv_buffer_size: 16384,
            servers_protocol: DEFAULT_SERVERS_PROTOCOL,
        }
    }
}

/// Sends queries through one shared socket and turns whatever comes back
/// into [Event]s.
///
/// Replies are not matched to requests: a reply is attributed only to its
/// kind and to the address it came from.
///
/// Example usage:
/// ```no_run
/// # async fn demo() -> Result<(), rq3query::error::QueryError> {
/// use rq3query::event::{Event, EventKind};
/// use rq3query::query::Client;
///
/// let client = Client::bind(None).await?;
/// client.on(EventKind::Servers, |event| {
///     if let Event::Servers { servers, .. } = event {
///         println!("{} servers", servers.len());
///     }
/// });
/// client.send_servers(rq3query::master::official()).await?;
/// client.run().await
/// # }
/// ```
pub struct Client<T: Transport = UdpSocket> {
    transport: T,
    events: Mutex<EventSurface>,
    config: ClientConfig,
}

impl Client<UdpSocket> {
    /// Bind a UDP socket and build a client on it.
    ///
    /// Uses [ClientConfig::default] if `config` is `None`.
    pub async fn bind(config: Option<ClientConfig>) -> Result<Self, QueryError> {
        let config = config.unwrap_or_default();
        let sock: UdpSocket = UdpSocket::bind(config.bind_addr.as_str())
            .await
            .map_err(QueryError::FailedPortBind)?;

        Ok(Client::with_transport(sock, config))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Client {
            transport,
            events: Mutex::new(EventSurface::new()),
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe `handler` to every event of `kind`.
    ///
    /// Handlers run while the registry is locked, so they must not call
    /// [Client::on] or [Client::off] themselves.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.events().subscribe(kind, Box::new(handler))
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events().unsubscribe(id)
    }

    pub async fn send_info(&self, targets: impl Into<Targets>) -> Result<(), QueryError> {
        self.send(QueryKind::Info, targets).await
    }

    pub async fn send_status(&self, targets: impl Into<Targets>) -> Result<(), QueryError> {
        self.send(QueryKind::Status, targets).await
    }

    pub async fn send_servers(&self, targets: impl Into<Targets>) -> Result<(), QueryError> {
        self.send(QueryKind::ServersRequest, targets).await
    }

    /// Send the `kind` query once to every destination in `targets`.
    ///
    /// All destinations are checked before anything is sent.
    pub async fn send(&self, kind: QueryKind, targets: impl Into<Targets>) -> Result<(), QueryError> {
        let targets: Targets = targets.into();
        let dests = targets.into_destinations()?;
        let packet = self.request(kind).pack();

        for dest in &dests {
            self.transmit(&packet, dest).await?;
        }
        Ok(())
    }

    /// Send the `kind` query to a single destination, given either as a
    /// [Destination] or as an `(address, port)` pair.
    pub async fn send_request(&self, kind: QueryKind, dest: impl Into<Destination>) -> Result<(), QueryError> {
        let dest: Destination = dest.into();
        dest.validate()?;
        self.transmit(&self.request(kind).pack(), &dest).await
    }

    fn request(&self, kind: QueryKind) -> RequestPacket {
        RequestPacket::new(kind).with_servers_protocol(self.config.servers_protocol)
    }

    async fn transmit(&self, packet: &[u8], dest: &Destination) -> Result<(), QueryError> {
        debug!("sending {} bytes to {}", packet.len(), dest);
        if let Err(e) = self.transport.send_to(packet, dest).await {
            error!("send to {} failed: {}", dest, e);
            let e = Arc::new(e);
            self.emit(&Event::Error(QueryError::SendError(Arc::clone(&e))));
            return Err(QueryError::SendError(e));
        }
        Ok(())
    }

    /// Classify and decode one inbound datagram, then emit the result.
    pub fn handle_datagram(&self, data: &[u8], peer: Destination) -> ResponseKind {
        let packet = ResponsePacket::unpack(data);
        debug!("received {:?} response ({} bytes) from {}", packet.kind(), data.len(), peer);

        let event = match packet.kind() {
            ResponseKind::Info => Event::Info {
                info: decode_info(packet.body()),
                peer,
            },
            ResponseKind::Status => Event::Status {
                status: decode_status(packet.body()),
                peer,
            },
            ResponseKind::Servers => Event::Servers {
                servers: ServerEntry::parse_list(packet.body()),
                peer,
            },
            ResponseKind::Unknown => {
                warn!("bad response from {}", peer);
                Event::Error(QueryError::MalformedResponse { peer })
            }
        };

        self.emit(&event);
        packet.kind()
    }

    /// Wait for one datagram and dispatch it.
    ///
    /// A receive failure is emitted as an error event and then returned.
    pub async fn recv_once(&self) -> Result<ResponseKind, QueryError> {
        let mut buf = vec![0u8; self.config.recv_buffer_size];

        match self.transport.recv_from(&mut buf).await {
            Ok((len, from)) => Ok(self.handle_datagram(&buf[..len], from.into())),
            Err(e) => {
                error!("receive failed: {}", e);
                let e = Arc::new(e);
                self.emit(&Event::Error(QueryError::ReceiveError(Arc::clone(&e))));
                Err(QueryError::ReceiveError(e))
            }
        }
    }

    /// Dispatch datagrams until the socket fails for good.
    ///
    /// Every receive failure is emitted as an error event. Transient ones,
    /// such as a reset caused by an unreachable peer, do not stop the loop.
    pub async fn run(&self) -> Result<(), QueryError> {
        loop {
            match self.recv_once().await {
                Ok(_) => {}
                Err(e) if e.is_transient() => warn!("continuing after {}", e),
                Err(e) => return Err(e),
            }
        }
    }

    fn emit(&self, event: &Event) {
        let delivered = self.events().emit(event);
        if delivered == 0 {
            debug!("no subscribers for {:?} event", event.kind());
        }
    }

    fn events(&self) -> MutexGuard<'_, EventSurface> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
