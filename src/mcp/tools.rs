//! MCP tool definitions for the music catalogue worker

use serde_json::json;

use super::protocol::ToolDefinition;

pub const SEARCH_MUSIC_DATABASE: &str = "search_music_database";

/// All tool definitions advertised by the worker
pub const TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[(
    SEARCH_MUSIC_DATABASE,
    "Search the Chinook music database using natural language queries. Can find artists, songs, albums, genres, etc.",
    r#"{
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Natural language search query (e.g., 'rock artists', 'albums by metallica', 'long songs')"
            }
        },
        "required": ["query"]
    }"#,
)];

/// Get all tool definitions as ToolDefinition structs
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    TOOL_DEFINITIONS
        .iter()
        .map(|(name, description, schema)| ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::from_str(schema).unwrap_or(json!({})),
        })
        .collect()
}
