//! Catalogue vocabulary for fuzzy relevance scoring

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::storage::Store;

/// Domain words added to every extracted vocabulary
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "artist", "singer", "band", "musician", "album", "song", "track", "music", "rock", "jazz",
    "pop", "metal", "blues", "classical", "country", "playlist", "genre", "composer", "performer",
    "vocalist", "group", "duo", "trio", "customers", "customer", "client", "buyer", "people",
    "person", "employees", "employee", "staff", "worker", "invoices", "invoice", "bill",
    "payment", "purchase", "city", "state", "address", "location", "new", "york", "usa",
    "america", "canada", "brazil", "germany", "france", "2007", "2008", "2009", "2010", "2011",
    "2012", "2013", "year", "date",
];

/// Name columns to harvest, and whether their words are added separately
const SOURCES: &[(&str, bool)] = &[
    ("SELECT Name FROM artists", true),
    ("SELECT Title FROM albums", true),
    ("SELECT Name FROM tracks", true),
    ("SELECT Name FROM genres", false),
];

/// Lowercased names from the catalogue plus [`DOMAIN_KEYWORDS`], sorted
pub fn extract_vocabulary(store: &Store) -> Result<Vec<String>> {
    let mut vocabulary: BTreeSet<String> = store.with_connection(|conn| {
        let mut terms = BTreeSet::new();
        for (sql, with_words) in SOURCES {
            collect_names(conn, sql, *with_words, &mut terms)?;
        }
        Ok(terms)
    })?;

    vocabulary.extend(DOMAIN_KEYWORDS.iter().map(|k| k.to_string()));
    tracing::info!("Extracted {} vocabulary terms", vocabulary.len());
    Ok(vocabulary.into_iter().collect())
}

fn collect_names(
    conn: &Connection,
    sql: &str,
    with_words: bool,
    terms: &mut BTreeSet<String>,
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

    for name in names {
        let Some(name) = name? else { continue };
        let name = name.to_lowercase();
        if with_words {
            terms.extend(
                name.split_whitespace()
                    .filter(|w| w.chars().count() > 2)
                    .map(str::to_string),
            );
        }
        terms.insert(name);
    }
    Ok(())
}

pub fn save_vocabulary(path: impl AsRef<Path>, vocabulary: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(vocabulary)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_vocabulary(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
