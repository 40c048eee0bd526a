//! Small catalogue fixture shared by unit tests

use rusqlite::Connection;
use tempfile::TempDir;

use super::Store;
use crate::types::StoreConfig;

pub const SAMPLE_SCHEMA: &str = r#"
    CREATE TABLE artists (ArtistId INTEGER PRIMARY KEY, Name TEXT);
    CREATE TABLE albums (AlbumId INTEGER PRIMARY KEY, Title TEXT, ArtistId INTEGER);
    CREATE TABLE genres (GenreId INTEGER PRIMARY KEY, Name TEXT);
    CREATE TABLE tracks (
        TrackId INTEGER PRIMARY KEY, Name TEXT, AlbumId INTEGER,
        GenreId INTEGER, Milliseconds INTEGER
    );
    CREATE TABLE customers (CustomerId INTEGER PRIMARY KEY, FirstName TEXT, Country TEXT);
    INSERT INTO artists VALUES (1, 'AC/DC'), (2, 'Metallica');
    INSERT INTO genres VALUES (1, 'Rock'), (3, 'Metal');
    INSERT INTO albums VALUES (1, 'Back In Black', 1), (2, 'Master Of Puppets', 2);
    INSERT INTO tracks VALUES
        (1, 'Hells Bells', 1, 1, 312000),
        (2, 'Shoot to Thrill', 1, 1, 317000),
        (3, 'Battery', 2, 3, 312000),
        (4, 'Orion', 2, NULL, 507000);
    INSERT INTO customers VALUES (1, 'Luís', 'Brazil'), (2, 'Eduardo', 'Brazil'), (3, 'Frank', 'USA');
"#;

/// A store over a freshly seeded database; keep the `TempDir` alive
pub fn sample_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chinook.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SAMPLE_SCHEMA).unwrap();
    drop(conn);

    let store = Store::new(StoreConfig::new(path.to_string_lossy()));
    (dir, store)
}
