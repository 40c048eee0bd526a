//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::time::Duration;

use rusqlite::Connection;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

use chinook_bridge::mcp::{McpServer, MusicHandler, Transport};
use chinook_bridge::{Session, Store, StoreConfig};

/// A small catalogue on disk; keep the `TempDir` alive while it is used
pub fn seed_catalogue() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chinook.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE artists (ArtistId INTEGER PRIMARY KEY, Name TEXT);
        CREATE TABLE albums (AlbumId INTEGER PRIMARY KEY, Title TEXT, ArtistId INTEGER);
        CREATE TABLE genres (GenreId INTEGER PRIMARY KEY, Name TEXT);
        CREATE TABLE tracks (
            TrackId INTEGER PRIMARY KEY, Name TEXT, AlbumId INTEGER,
            GenreId INTEGER, Milliseconds INTEGER
        );
        CREATE TABLE customers (
            CustomerId INTEGER PRIMARY KEY, FirstName TEXT, City TEXT, State TEXT, Country TEXT
        );
        INSERT INTO artists VALUES (1, 'AC/DC'), (2, 'Metallica'), (3, 'Miles Davis');
        INSERT INTO genres VALUES (1, 'Rock'), (2, 'Jazz'), (3, 'Metal');
        INSERT INTO albums VALUES
            (1, 'Back In Black', 1), (2, 'Master Of Puppets', 2), (3, 'Kind Of Blue', 3);
        INSERT INTO tracks VALUES
            (1, 'Hells Bells', 1, 1, 312000),
            (2, 'Shoot to Thrill', 1, 1, 317000),
            (3, 'Battery', 2, 3, 312000),
            (4, 'Orion', 2, 3, 507000),
            (5, 'So What', 3, 2, 562000),
            (6, 'Blue in Green', 3, 2, 337000);
        INSERT INTO customers VALUES
            (1, 'Luís', 'São José dos Campos', 'SP', 'Brazil'),
            (2, 'Frank', 'Mountain View', 'CA', 'USA');
        "#,
    )
    .unwrap();
    drop(conn);

    (dir, Store::new(StoreConfig::new(path.to_string_lossy())))
}

/// Session connected to an in-process worker serving `store`
pub fn in_process_session(store: Store) -> Session {
    let (client, worker) = tokio::io::duplex(64 * 1024);

    let (worker_read, worker_write) = tokio::io::split(worker);
    tokio::spawn(async move {
        let server = McpServer::new(MusicHandler::new(store));
        let mut transport = Transport::new(worker_read, worker_write);
        server.run(&mut transport).await
    });

    let (client_read, client_write) = tokio::io::split(client);
    Session::attach(Transport::new(client_read, client_write))
}

/// Scripted worker end of a duplex pipe
pub struct Peer {
    pub lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    pub writer: WriteHalf<DuplexStream>,
}

impl Peer {
    /// Next message written by the client
    pub async fn recv(&mut self) -> Value {
        let line = self
            .lines
            .next_line()
            .await
            .unwrap()
            .expect("client closed the pipe");
        serde_json::from_str(&line).unwrap()
    }

    /// Whether the client writes anything within `wait`
    pub async fn is_silent(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.lines.next_line())
            .await
            .is_err()
    }

    pub async fn send_bytes(&mut self, line: &[u8]) {
        self.writer.write_all(line).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn send_line(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    pub async fn send(&mut self, message: Value) {
        self.send_line(&message.to_string()).await;
    }

    pub async fn reply(&mut self, id: &Value, result: Value) {
        self.send(json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await;
    }

    /// Answer `initialize` and consume the initialized notification
    pub async fn accept_handshake(&mut self) -> Value {
        let init = self.recv().await;
        self.reply(
            &init["id"],
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "peer", "version": "0.0.0"}
            }),
        )
        .await;
        let initialized = self.recv().await;
        assert_eq!(initialized["method"], "notifications/initialized");
        init
    }
}

/// Session over a duplex pipe with a scripted peer on the other end
pub fn connect(read_timeout: Option<Duration>) -> (Session, Peer) {
    let (client, worker) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = tokio::io::split(client);
    let (worker_read, worker_write) = tokio::io::split(worker);

    let transport = Transport::new(client_read, client_write).with_read_timeout(read_timeout);
    let peer = Peer {
        lines: BufReader::new(worker_read).lines(),
        writer: worker_write,
    };
    (Session::attach(transport), peer)
}

/// A session that has completed its handshake with a scripted peer
pub async fn ready_session(read_timeout: Option<Duration>) -> (Session, Peer) {
    let (mut session, mut peer) = connect(read_timeout);
    let (opened, _) = tokio::join!(session.open(), peer.accept_handshake());
    opened.unwrap();
    (session, peer)
}

pub fn text_result(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}
