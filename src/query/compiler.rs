//! Rule-based query compiler
//!
//! Maps free text to one of a fixed set of parameterized SQL templates.
//! Rules are tried in table order and the first rule whose predicate holds
//! wins. A matched rule that finds no search term goes straight to the
//! default artist search; lower category rules are not consulted. Extracted
//! terms and canonical keyword values are always bound as `?1`, never
//! spliced into the SQL.

use serde::Serialize;

use super::vocabulary::*;

/// Which rule produced a compiled query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    ArtistsByGenre,
    ArtistByName,
    AlbumSearch,
    LongTracks,
    TrackSearch,
    GenreListing,
    CustomersByCountry,
    DefaultArtistSearch,
    PopularArtists,
}

/// A SQL template plus the values bound to its placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub rule: RuleKind,
    pub sql: &'static str,
    pub params: Vec<String>,
}

impl CompiledQuery {
    fn fixed(rule: RuleKind, sql: &'static str) -> Self {
        Self {
            rule,
            sql,
            params: Vec::new(),
        }
    }

    fn bound(rule: RuleKind, sql: &'static str, value: impl Into<String>) -> Self {
        Self {
            rule,
            sql,
            params: vec![value.into()],
        }
    }
}

/// Normalized query text: lowercased, quotes stripped, split on whitespace
#[derive(Debug, Clone)]
pub struct QueryText {
    normalized: String,
    tokens: Vec<String>,
}

impl QueryText {
    pub fn normalize(text: &str) -> Self {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !QUOTE_CHARS.contains(c))
            .collect();
        let tokens = normalized.split_whitespace().map(str::to_string).collect();
        Self { normalized, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether any keyword occurs anywhere in the text
    pub fn contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.normalized.contains(k))
    }

    /// Canonical value of the first table entry occurring in the text
    pub fn first_synonym(&self, table: &[(&str, &'static str)]) -> Option<&'static str> {
        table
            .iter()
            .find(|(word, _)| self.normalized.contains(word))
            .map(|(_, canonical)| *canonical)
    }

    /// First token longer than the minimum that is not a stop word
    pub fn first_term(&self, stop_lists: &[&[&str]]) -> Option<&str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .find(|token| {
                token.chars().count() > MIN_TERM_CHARS
                    && !stop_lists.iter().any(|list| is_stop_word(token, list))
            })
    }
}

/// Stop words also cover their plural (`artists`, `songs`), so a plural
/// role or title word is never picked as the search term
fn is_stop_word(token: &str, list: &[&str]) -> bool {
    let singular = token.strip_suffix('s').unwrap_or(token);
    list.iter().any(|w| *w == token || *w == singular)
}

/// One entry of the ordered rule table
pub struct QueryRule {
    pub priority: u8,
    pub kind: RuleKind,
    pub predicate: fn(&QueryText) -> bool,
    pub build: fn(&QueryText) -> Option<CompiledQuery>,
}

impl std::fmt::Debug for QueryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRule")
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .finish()
    }
}

pub const ARTISTS_BY_GENRE_SQL: &str = "SELECT a.Name AS Artist, g.Name AS Genre, COUNT(t.TrackId) AS TrackCount \
     FROM artists a \
     JOIN albums al ON a.ArtistId = al.ArtistId \
     JOIN tracks t ON al.AlbumId = t.AlbumId \
     JOIN genres g ON t.GenreId = g.GenreId \
     WHERE g.Name LIKE '%' || ?1 || '%' \
     GROUP BY a.ArtistId, a.Name, g.Name \
     ORDER BY TrackCount DESC LIMIT 20";

pub const ARTIST_BY_NAME_SQL: &str = "SELECT a.Name AS Artist, COUNT(DISTINCT al.AlbumId) AS Albums, COUNT(t.TrackId) AS Tracks \
     FROM artists a \
     LEFT JOIN albums al ON a.ArtistId = al.ArtistId \
     LEFT JOIN tracks t ON al.AlbumId = t.AlbumId \
     WHERE a.Name LIKE '%' || ?1 || '%' \
     GROUP BY a.ArtistId, a.Name \
     ORDER BY Albums DESC LIMIT 20";

pub const ALBUM_SEARCH_SQL: &str = "SELECT al.Title AS Album, a.Name AS Artist, COUNT(t.TrackId) AS Tracks \
     FROM albums al \
     JOIN artists a ON al.ArtistId = a.ArtistId \
     LEFT JOIN tracks t ON al.AlbumId = t.AlbumId \
     WHERE al.Title LIKE '%' || ?1 || '%' OR a.Name LIKE '%' || ?1 || '%' \
     GROUP BY al.AlbumId, al.Title, a.Name \
     ORDER BY Tracks DESC LIMIT 20";

pub const LONG_TRACKS_SQL: &str = "SELECT t.Name AS Track, a.Name AS Artist, al.Title AS Album, ROUND(t.Milliseconds / 60000.0, 2) AS Minutes \
     FROM tracks t \
     JOIN albums al ON t.AlbumId = al.AlbumId \
     JOIN artists a ON al.ArtistId = a.ArtistId \
     WHERE t.Milliseconds > 300000 \
     ORDER BY t.Milliseconds DESC LIMIT 20";

pub const TRACK_SEARCH_SQL: &str = "SELECT t.Name AS Track, a.Name AS Artist, al.Title AS Album, g.Name AS Genre \
     FROM tracks t \
     JOIN albums al ON t.AlbumId = al.AlbumId \
     JOIN artists a ON al.ArtistId = a.ArtistId \
     LEFT JOIN genres g ON t.GenreId = g.GenreId \
     WHERE t.Name LIKE '%' || ?1 || '%' \
     ORDER BY t.Name LIMIT 20";

pub const GENRE_LISTING_SQL: &str = "SELECT g.Name AS Genre, COUNT(t.TrackId) AS TrackCount \
     FROM genres g \
     LEFT JOIN tracks t ON g.GenreId = t.GenreId \
     GROUP BY g.GenreId, g.Name \
     ORDER BY TrackCount DESC LIMIT 20";

pub const CUSTOMERS_BY_COUNTRY_SQL: &str = "SELECT c.Country AS Country, COUNT(*) AS CustomerCount \
     FROM customers c \
     WHERE c.Country LIKE '%' || ?1 || '%' \
     GROUP BY c.Country LIMIT 20";

pub const POPULAR_ARTISTS_SQL: &str = "SELECT a.Name AS Artist, COUNT(DISTINCT al.AlbumId) AS Albums, COUNT(t.TrackId) AS Tracks \
     FROM artists a \
     LEFT JOIN albums al ON a.ArtistId = al.ArtistId \
     LEFT JOIN tracks t ON al.AlbumId = t.AlbumId \
     GROUP BY a.ArtistId, a.Name \
     ORDER BY Albums DESC, Tracks DESC LIMIT 20";

/// The rule table, in evaluation order
pub static RULES: &[QueryRule] = &[
    QueryRule {
        priority: 1,
        kind: RuleKind::ArtistsByGenre,
        predicate: mentions_artist_and_genre,
        build: build_artists_by_genre,
    },
    QueryRule {
        priority: 2,
        kind: RuleKind::ArtistByName,
        predicate: mentions_artist,
        build: build_artist_by_name,
    },
    QueryRule {
        priority: 3,
        kind: RuleKind::AlbumSearch,
        predicate: mentions_album,
        build: build_album_search,
    },
    QueryRule {
        priority: 4,
        kind: RuleKind::LongTracks,
        predicate: mentions_long_tracks,
        build: build_long_tracks,
    },
    QueryRule {
        priority: 5,
        kind: RuleKind::TrackSearch,
        predicate: mentions_track,
        build: build_track_search,
    },
    QueryRule {
        priority: 6,
        kind: RuleKind::GenreListing,
        predicate: mentions_style,
        build: build_genre_listing,
    },
    QueryRule {
        priority: 7,
        kind: RuleKind::CustomersByCountry,
        predicate: mentions_nationality,
        build: build_customers_by_country,
    },
    QueryRule {
        priority: 8,
        kind: RuleKind::DefaultArtistSearch,
        predicate: always,
        build: build_default_artist_search,
    },
    QueryRule {
        priority: 9,
        kind: RuleKind::PopularArtists,
        predicate: always,
        build: build_popular_artists,
    },
];

fn always(_: &QueryText) -> bool {
    true
}

fn mentions_artist(q: &QueryText) -> bool {
    q.contains_any(ARTIST_KEYWORDS)
}

fn mentions_artist_and_genre(q: &QueryText) -> bool {
    mentions_artist(q) && q.first_synonym(GENRE_SYNONYMS).is_some()
}

fn mentions_album(q: &QueryText) -> bool {
    q.contains_any(ALBUM_KEYWORDS)
}

fn mentions_track(q: &QueryText) -> bool {
    q.contains_any(TRACK_KEYWORDS)
}

fn mentions_long_tracks(q: &QueryText) -> bool {
    mentions_track(q) && q.contains_any(DURATION_KEYWORDS)
}

fn mentions_style(q: &QueryText) -> bool {
    q.contains_any(STYLE_KEYWORDS)
}

fn mentions_nationality(q: &QueryText) -> bool {
    q.first_synonym(NATIONALITIES).is_some()
}

fn build_artists_by_genre(q: &QueryText) -> Option<CompiledQuery> {
    let genre = q.first_synonym(GENRE_SYNONYMS)?;
    Some(CompiledQuery::bound(
        RuleKind::ArtistsByGenre,
        ARTISTS_BY_GENRE_SQL,
        genre,
    ))
}

fn build_artist_by_name(q: &QueryText) -> Option<CompiledQuery> {
    let term = q.first_term(&[ARTIST_STOP_WORDS, ARTIST_KEYWORDS])?;
    Some(CompiledQuery::bound(
        RuleKind::ArtistByName,
        ARTIST_BY_NAME_SQL,
        term,
    ))
}

fn build_album_search(q: &QueryText) -> Option<CompiledQuery> {
    let term = q.first_term(&[TITLE_STOP_WORDS, ALBUM_KEYWORDS])?;
    Some(CompiledQuery::bound(
        RuleKind::AlbumSearch,
        ALBUM_SEARCH_SQL,
        term,
    ))
}

fn build_long_tracks(_: &QueryText) -> Option<CompiledQuery> {
    Some(CompiledQuery::fixed(RuleKind::LongTracks, LONG_TRACKS_SQL))
}

fn build_track_search(q: &QueryText) -> Option<CompiledQuery> {
    let term = q.first_term(&[TITLE_STOP_WORDS, TRACK_KEYWORDS])?;
    Some(CompiledQuery::bound(
        RuleKind::TrackSearch,
        TRACK_SEARCH_SQL,
        term,
    ))
}

fn build_genre_listing(_: &QueryText) -> Option<CompiledQuery> {
    Some(CompiledQuery::fixed(
        RuleKind::GenreListing,
        GENRE_LISTING_SQL,
    ))
}

fn build_customers_by_country(q: &QueryText) -> Option<CompiledQuery> {
    let country = q.first_synonym(NATIONALITIES)?;
    Some(CompiledQuery::bound(
        RuleKind::CustomersByCountry,
        CUSTOMERS_BY_COUNTRY_SQL,
        country,
    ))
}

fn build_default_artist_search(q: &QueryText) -> Option<CompiledQuery> {
    let term = q.first_term(&[])?;
    Some(CompiledQuery::bound(
        RuleKind::DefaultArtistSearch,
        ARTIST_BY_NAME_SQL,
        term,
    ))
}

fn build_popular_artists(_: &QueryText) -> Option<CompiledQuery> {
    Some(popular_artists())
}

fn popular_artists() -> CompiledQuery {
    CompiledQuery::fixed(RuleKind::PopularArtists, POPULAR_ARTISTS_SQL)
}

/// Compile free text into a parameterized query. Never fails.
pub fn compile(text: &str) -> CompiledQuery {
    let query = QueryText::normalize(text);

    let Some(rule) = RULES.iter().find(|rule| (rule.predicate)(&query)) else {
        return popular_artists();
    };

    let compiled = (rule.build)(&query).unwrap_or_else(|| {
        tracing::trace!(rule = ?rule.kind, "Rule matched but found no search term");
        default_search(&query)
    });
    tracing::debug!(
        rule = ?compiled.rule,
        params = ?compiled.params,
        "Compiled query '{}'",
        query.as_str()
    );
    compiled
}

fn default_search(q: &QueryText) -> CompiledQuery {
    build_default_artist_search(q).unwrap_or_else(popular_artists)
}
