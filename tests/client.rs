use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rq3query::event::{Event, EventKind};
use rq3query::info::{InfoRecord, StatusRecord};
use rq3query::master::ServerEntry;
use rq3query::packet::{QueryKind, ResponseKind, GETINFO, GETSERVERS, GETSTATUS};
use rq3query::transport::Transport;
use rq3query::{Client, ClientConfig, Destination, QueryError, Targets};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every send and replays queued datagrams and errors on receive.
/// Once the queue is empty every receive fails as a closed socket.
#[derive(Default)]
struct MockTransport {
    sent: Mutex<Vec<(Vec<u8>, Destination)>>,
    inbound: Mutex<VecDeque<io::Result<(Vec<u8>, SocketAddr)>>>,
    send_failure: Mutex<Option<io::ErrorKind>>,
}

impl MockTransport {
    fn queue(&self, data: &[u8], from: &str) {
        self.inbound
            .lock()
            .unwrap()
            .push_back(Ok((data.to_vec(), from.parse().unwrap())));
    }

    fn queue_error(&self, kind: io::ErrorKind, msg: &str) {
        self.inbound
            .lock()
            .unwrap()
            .push_back(Err(io::Error::new(kind, msg.to_owned())));
    }

    fn fail_sends(&self, kind: io::ErrorKind) {
        *self.send_failure.lock().unwrap() = Some(kind);
    }

    fn sent(&self) -> Vec<(Vec<u8>, Destination)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send_to(&self, data: &[u8], dest: &Destination) -> io::Result<()> {
        if let Some(kind) = *self.send_failure.lock().unwrap() {
            return Err(io::Error::new(kind, "network unreachable"));
        }
        self.sent.lock().unwrap().push((data.to_vec(), dest.clone()));
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(Ok((data, from))) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok((data.len(), from))
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(io::ErrorKind::Other, "socket closed")),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Seen {
    Info(InfoRecord, Destination),
    Status(StatusRecord, Destination),
    Servers(Vec<ServerEntry>, Destination),
    Error(String),
}

fn mock_client() -> Client<MockTransport> {
    init_logger();
    Client::with_transport(MockTransport::default(), ClientConfig::default())
}

/// Subscribe to all four event kinds, collecting what arrives.
fn record_events<T: Transport>(client: &Client<T>) -> Arc<Mutex<Vec<Seen>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Info, EventKind::Status, EventKind::Servers, EventKind::Error] {
        let seen = Arc::clone(&seen);
        client.on(kind, move |event| {
            let item = match event {
                Event::Info { info, peer } => Seen::Info(info.clone(), peer.clone()),
                Event::Status { status, peer } => Seen::Status(status.clone(), peer.clone()),
                Event::Servers { servers, peer } => Seen::Servers(servers.clone(), peer.clone()),
                Event::Error(e) => Seen::Error(e.to_string()),
            };
            seen.lock().unwrap().push(item);
        });
    }
    seen
}

fn servers_datagram(tuples: &[[u8; 6]]) -> Vec<u8> {
    let mut data = b"\xFF\xFF\xFF\xFFgetserversResponse\\".to_vec();
    for tuple in tuples {
        data.extend_from_slice(tuple);
        data.push(b'\\');
    }
    data.extend_from_slice(b"EOT\0\0\0");
    data
}

#[tokio::test]
async fn fans_out_to_every_destination() {
    let client = mock_client();
    let dests = vec![
        Destination::new("10.0.0.1", 29070),
        Destination::new("10.0.0.2", 29071),
        Destination::new("10.0.0.3", 29072),
    ];

    client.send_status(dests.clone()).await.unwrap();

    let sent = client.transport().sent();
    assert_eq!(sent.len(), 3);
    for ((bytes, dest), expected) in sent.iter().zip(&dests) {
        assert_eq!(bytes.as_slice(), GETSTATUS);
        assert_eq!(dest, expected);
    }
}

#[tokio::test]
async fn labelled_map_sends_values() {
    let client = mock_client();
    let mut map = BTreeMap::new();
    map.insert("official".to_owned(), rq3query::master::official());
    map.insert("jkhub".to_owned(), rq3query::master::jkhub());

    client.send_servers(map).await.unwrap();

    let sent = client.transport().sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(bytes, _)| bytes.as_slice() == GETSERVERS));
}

#[tokio::test]
async fn single_destination_and_pair() {
    let client = mock_client();
    client.send_info(Destination::new("127.0.0.1", 29070)).await.unwrap();
    client.send_request(QueryKind::Info, ("127.0.0.1", 29071)).await.unwrap();

    let sent = client.transport().sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0.as_slice(), GETINFO);
    assert_eq!(sent[1].1, Destination::new("127.0.0.1", 29071));
}

#[tokio::test]
async fn invalid_destination_sends_nothing() {
    let client = mock_client();

    let err = Targets::try_from("not-a-destination").unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));

    let bad = vec![Destination::new("10.0.0.1", 29070), Destination::new("10.0.0.2", 0)];
    let err = client.send_info(bad).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));

    let err = client
        .send_request(QueryKind::Status, ("", 29070))
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));

    assert!(client.transport().sent().is_empty());
}

#[tokio::test]
async fn custom_servers_protocol() {
    init_logger();
    let config = ClientConfig {
        servers_protocol: 25,
        ..ClientConfig::default()
    };
    let client = Client::with_transport(MockTransport::default(), config);
    client.send_servers(rq3query::master::official()).await.unwrap();

    assert_eq!(client.transport().sent()[0].0, b"\xFF\xFF\xFF\xFFgetservers 25\0");
}

#[test]
fn dispatches_info() {
    let client = mock_client();
    let seen = record_events(&client);
    let peer = Destination::new("1.2.3.4", 29070);

    let kind = client.handle_datagram(
        b"\xFF\xFF\xFF\xFFinfoResponse\n\\hostname\\My Server\\mapname\\mp/ffa1\\gametype\\0",
        peer.clone(),
    );
    assert_eq!(kind, ResponseKind::Info);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    match &seen[0] {
        Seen::Info(info, from) => {
            assert_eq!(from, &peer);
            assert_eq!(info.get("hostname"), Some("My Server"));
            assert_eq!(info.get("mapname"), Some("mp/ffa1"));
            assert_eq!(info.game_type().to_string(), "FFA");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn dispatches_status_with_players_apart_from_settings() {
    let client = mock_client();
    let seen = record_events(&client);

    client.handle_datagram(
        b"\xFF\xFF\xFF\xFFstatusResponse\n\\sv_hostname\\Test\\g_gametype\\8\n3 50 \"Kyle\"\n10 20 \"Player Two\"\n",
        Destination::new("1.2.3.4", 29070),
    );

    let seen = seen.lock().unwrap();
    let Seen::Status(status, _) = &seen[0] else {
        panic!("unexpected event {:?}", seen[0]);
    };
    assert_eq!(status.settings.keys().collect::<Vec<_>>(), vec!["sv_hostname", "g_gametype"]);
    assert!(!status.settings.contains_key("players"));
    assert_eq!(status.players.len(), 2);
    assert_eq!(status.players[0].name, "Kyle");
    assert_eq!(status.players[1].name, "PlayerTwo");
}

#[test]
fn dispatches_servers() {
    let client = mock_client();
    let seen = record_events(&client);

    let data = servers_datagram(&[[192, 168, 1, 1, 0x1F, 0x90], [10, 0, 0, 1, 0x6D, 0x38]]);
    assert_eq!(
        client.handle_datagram(&data, rq3query::master::official()),
        ResponseKind::Servers
    );

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0],
        Seen::Servers(
            vec![
                ServerEntry {
                    address: "192.168.1.1".to_owned(),
                    port: 8080
                },
                ServerEntry {
                    address: "10.0.0.1".to_owned(),
                    port: 27960
                },
            ],
            rq3query::master::official()
        )
    );
}

#[test]
fn unknown_response_is_an_error_event() {
    let client = mock_client();
    let seen = record_events(&client);

    let datagrams: [&[u8]; 3] = [b"\xFF\xFF\xFF\xFFprint\nhello\\", b"", b"garbage without separators"];
    for data in datagrams {
        let kind = client.handle_datagram(data, Destination::new("5.6.7.8", 1234));
        assert_eq!(kind, ResponseKind::Unknown);
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen
        .iter()
        .all(|s| *s == Seen::Error("bad response from 5.6.7.8:1234".to_owned())));
}

#[test]
fn unsubscribed_handler_is_not_called() {
    let client = mock_client();
    let count = Arc::new(Mutex::new(0));
    let c = Arc::clone(&count);
    let id = client.on(EventKind::Info, move |_| *c.lock().unwrap() += 1);

    let data = b"\xFF\xFF\xFF\xFFinfoResponse\n\\a\\b";
    client.handle_datagram(data, Destination::new("1.1.1.1", 1));
    assert!(client.off(id));
    client.handle_datagram(data, Destination::new("1.1.1.1", 1));

    assert_eq!(*count.lock().unwrap(), 1);
}

#[tokio::test]
async fn run_keeps_dispatching_after_a_reset() {
    let client = mock_client();
    let seen = record_events(&client);
    let transport = client.transport();
    transport.queue(b"\xFF\xFF\xFF\xFFinfoResponse\n\\a\\b", "9.9.9.9:29070");
    transport.queue_error(io::ErrorKind::ConnectionReset, "icmp unreachable");
    transport.queue(b"\xFF\xFF\xFF\xFFinfoResponse\n\\c\\d", "8.8.8.8:29070");
    transport.queue(b"junk", "9.9.9.9:29070");

    let err = client.run().await.unwrap_err();
    assert!(matches!(err, QueryError::ReceiveError(ref e) if e.kind() == io::ErrorKind::Other));
    assert!(err.is_transport());
    assert!(!err.is_transient());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    assert!(matches!(&seen[0], Seen::Info(_, from) if *from == Destination::new("9.9.9.9", 29070)));
    assert_eq!(
        seen[1],
        Seen::Error("failed to receive datagram: icmp unreachable".to_owned())
    );
    match &seen[2] {
        Seen::Info(info, from) => {
            assert_eq!(from, &Destination::new("8.8.8.8", 29070));
            assert_eq!(info.get("c"), Some("d"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(&seen[3], Seen::Error(msg) if msg.starts_with("bad response")));
    assert_eq!(seen[4], Seen::Error("failed to receive datagram: socket closed".to_owned()));
}

#[tokio::test]
async fn recv_once_returns_the_emitted_error() {
    let client = mock_client();
    let seen = record_events(&client);
    client
        .transport()
        .queue_error(io::ErrorKind::ConnectionRefused, "port unreachable");

    let err = client.recv_once().await.unwrap_err();
    assert!(err.is_transient());
    match &err {
        QueryError::ReceiveError(e) => {
            assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused);
            assert_eq!(e.to_string(), "port unreachable");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn send_failure_is_returned_and_emitted() {
    let client = mock_client();
    let seen = record_events(&client);
    client.transport().fail_sends(io::ErrorKind::PermissionDenied);

    let err = client
        .send_info(vec![Destination::new("10.0.0.1", 29070), Destination::new("10.0.0.2", 29070)])
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::SendError(ref e) if e.kind() == io::ErrorKind::PermissionDenied));

    // stops at the first failed destination
    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![Seen::Error("failed to send datagram: network unreachable".to_owned())]
    );
    assert!(client.transport().sent().is_empty());
}

#[tokio::test]
async fn info_round_trip_over_loopback() {
    init_logger();
    let config = ClientConfig {
        bind_addr: "127.0.0.1:0".to_owned(),
        ..ClientConfig::default()
    };
    let client = Client::bind(Some(config)).await.unwrap();
    let seen = record_events(&client);
    let client_addr = client.transport().local_addr().unwrap();

    let server = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server_addr = server.local_addr().unwrap();

    client
        .send_info(("127.0.0.1", server_addr.port()))
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let (len, from) = server.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], GETINFO);
    assert_eq!(from, client_addr);

    server
        .send_to(b"\xFF\xFF\xFF\xFFinfoResponse\n\\hostname\\loop\\clients\\4", from)
        .await
        .unwrap();

    let kind = tokio::time::timeout(Duration::from_secs(5), client.recv_once())
        .await
        .expect("reply should arrive")
        .unwrap();
    assert_eq!(kind, ResponseKind::Info);

    let seen = seen.lock().unwrap();
    let Seen::Info(info, peer) = &seen[0] else {
        panic!("unexpected event {:?}", seen[0]);
    };
    assert_eq!(peer, &Destination::from(server_addr));
    assert_eq!(info.get("hostname"), Some("loop"));
    assert_eq!(info.get("clients"), Some("4"));
}
