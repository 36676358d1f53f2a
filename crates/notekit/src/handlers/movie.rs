//! Movie pages (IMDb, TMDB, Letterboxd, Rotten Tomatoes)

use super::json::parse_json_object;
use super::output::{fill_blank, LlmOutput, MovieDetails};
use super::render::NoteBuilder;
use super::{
    fill_template, host_matches, is_sentinel, wrong_variant, ContentTypeHandler, SourceMetadata,
};
use crate::error::ImportError;
use url::Url;

const SENTINEL: &str = "Not a movie";
const UNTITLED: &str = "Untitled Movie";

/// Host and path prefix pairs identifying a single movie page
const MOVIE_PAGES: &[(&str, &str)] = &[
    ("imdb.com", "/title/"),
    ("themoviedb.org", "/movie/"),
    ("letterboxd.com", "/film/"),
    ("rottentomatoes.com", "/m/"),
];

const PROMPT_TEMPLATE: &str = r#"Extract information about the movie described in the following web page.

If the page is not about a specific movie, respond with "movieTitle" set to exactly "Not a movie".
Use "Not specified" for any value the page does not provide.

Respond with a single JSON object in a ```json code block using this schema:
```json
{
  "movieTitle": "Title of the movie",
  "director": "Director name",
  "year": "Release year",
  "genre": ["Genre", "..."],
  "cast": ["Actor", "..."],
  "duration": "Runtime",
  "rating": "Rating",
  "plot": "Short plot summary",
  "reviews": ["Short review excerpt", "..."]
}
```

Web page content:
{{content}}"#;

/// Handler for movie pages
#[derive(Debug, Default, Clone)]
pub struct MovieHandler;

impl MovieHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ContentTypeHandler for MovieHandler {
    fn content_type(&self) -> &'static str {
        "movie"
    }

    fn detect(&self, url: &Url) -> bool {
        MOVIE_PAGES
            .iter()
            .any(|(domain, prefix)| host_matches(url, domain) && url.path().starts_with(prefix))
    }

    fn folder_name(&self) -> &'static str {
        "Movies"
    }

    fn prompt(&self, content: &str) -> Result<String, ImportError> {
        fill_template(PROMPT_TEMPLATE, content)
    }

    fn parse_llm_response(&self, raw: &str) -> Result<LlmOutput, ImportError> {
        let mut details: MovieDetails = parse_json_object(raw, "movieTitle")?;
        fill_blank(&mut details.movie_title, UNTITLED);
        Ok(LlmOutput::Movie(details))
    }

    fn validate_llm_output(&self, output: &mut LlmOutput) -> Result<(), ImportError> {
        let LlmOutput::Movie(movie) = output else {
            return Err(wrong_variant("movie", output));
        };
        if is_sentinel(&movie.movie_title, SENTINEL) {
            return Err(ImportError::NotInCategory("movie".to_string()));
        }
        fill_blank(&mut movie.movie_title, UNTITLED);
        Ok(())
    }

    fn render_note(
        &self,
        output: &LlmOutput,
        source: &SourceMetadata,
    ) -> Result<String, ImportError> {
        let LlmOutput::Movie(movie) = output else {
            return Err(wrong_variant("movie", output));
        };

        Ok(NoteBuilder::new(&movie.movie_title)
            .link("Source", &source.url)
            .image(&movie.movie_title, source.image.as_deref())
            .field("Director", &movie.director)
            .field("Year", &movie.year)
            .field_list("Genre", &movie.genre)
            .field("Duration", &movie.duration)
            .field("Rating", &movie.rating)
            .end_fields()
            .paragraph("Plot", &movie.plot)
            .bullets("Cast", &movie.cast)
            .bullets("Reviews", &movie.reviews)
            .finish())
    }
}
