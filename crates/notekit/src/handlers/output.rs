//! Structured LLM output
//!
//! Models are unreliable about types: a year comes back as `1999`, a list as
//! a single string, a field as `null`. Every field here deserializes
//! leniently so a sloppy answer still yields well-formed data.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Marker the models use when a field has no value
pub const NOT_SPECIFIED: &str = "Not specified";

/// Parsed output, one variant per content category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LlmOutput {
    Movie(MovieDetails),
    Recipe(RecipeDetails),
    Article(ArticleDetails),
    Video(VideoDetails),
}

impl LlmOutput {
    /// Primary title of the extracted item
    pub fn title(&self) -> &str {
        match self {
            LlmOutput::Movie(m) => &m.movie_title,
            LlmOutput::Recipe(r) => &r.recipe_name,
            LlmOutput::Article(a) => &a.title,
            LlmOutput::Video(v) => &v.video_title,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LlmOutput::Movie(_) => "movie",
            LlmOutput::Recipe(_) => "recipe",
            LlmOutput::Article(_) => "article",
            LlmOutput::Video(_) => "video",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovieDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub movie_title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub director: String,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub genre: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub cast: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub duration: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rating: String,
    #[serde(deserialize_with = "lenient_string")]
    pub plot: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub reviews: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub recipe_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub ingredients: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub instructions: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub prep_time: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cook_time: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_time: String,
    #[serde(deserialize_with = "lenient_string")]
    pub servings: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(deserialize_with = "lenient_string")]
    pub published_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub quotes: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub video_title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub channel: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub topics: Vec<String>,
}

/// True for empty strings and the "Not specified" marker
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_SPECIFIED)
}

/// Replace a blank value with `fallback`
pub(crate) fn fill_blank(value: &mut String, fallback: &str) {
    if is_blank(value) {
        *value = fallback.to_string();
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Strings, numbers and booleans become strings; null becomes empty
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_to_string(other).unwrap_or_default(),
    })
}

/// Arrays keep their non-null elements stringified; anything else becomes empty
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}
