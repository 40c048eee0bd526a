//! Keyword tables for the query compiler
//!
//! Synonym tables are ordered: when several entries match the same text the
//! first one in declaration order wins.

/// Words naming a performer role
pub const ARTIST_KEYWORDS: &[&str] = &[
    "artist",
    "singer",
    "band",
    "musician",
    "performer",
    "vocalist",
    "composer",
    "group",
    "duo",
    "trio",
];

/// Free-text genre word to canonical genre name
pub const GENRE_SYNONYMS: &[(&str, &str)] = &[
    ("rock", "Rock"),
    ("metal", "Metal"),
    ("jazz", "Jazz"),
    ("pop", "Pop"),
    ("blues", "Blues"),
    ("classical", "Classical"),
    ("country", "Country"),
    ("folk", "Folk"),
    ("punk", "Punk"),
    ("reggae", "Reggae"),
    ("electronic", "Electronic"),
    ("dance", "Dance"),
    ("alternative", "Alternative"),
    ("indie", "Alternative"),
    ("grunge", "Rock"),
    ("funk", "Funk"),
    ("soul", "Soul"),
    ("gospel", "Gospel"),
    ("opera", "Classical"),
];

pub const ALBUM_KEYWORDS: &[&str] = &[
    "album", "record", "disc", "cd", "vinyl", "lp", "ep", "release",
];

pub const TRACK_KEYWORDS: &[&str] = &[
    "track", "song", "music", "tune", "melody", "hit", "single",
];

pub const DURATION_KEYWORDS: &[&str] = &["long", "duration", "minute"];

pub const STYLE_KEYWORDS: &[&str] = &["genre", "style", "type"];

/// Nationality adjective to the country name stored on customers
pub const NATIONALITIES: &[(&str, &str)] = &[
    ("indian", "India"),
    ("american", "USA"),
    ("british", "United Kingdom"),
    ("brazilian", "Brazil"),
    ("canadian", "Canada"),
    ("australian", "Australia"),
    ("german", "Germany"),
    ("french", "France"),
    ("italian", "Italy"),
    ("spanish", "Spain"),
    ("japanese", "Japan"),
    ("korean", "South Korea"),
];

/// Connectives skipped when picking an artist search term
pub const ARTIST_STOP_WORDS: &[&str] = &["the", "and", "who", "sing", "by", "from", "with"];

/// Connectives skipped when picking an album or track search term
pub const TITLE_STOP_WORDS: &[&str] = &["the", "and", "by", "from"];

/// Characters removed before tokenizing
pub const QUOTE_CHARS: &[char] = &['\'', '"', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

/// Minimum length (exclusive) for a token to be usable as a search term
pub const MIN_TERM_CHARS: usize = 2;
