//! Recipes

use super::json::parse_json_object;
use super::output::{fill_blank, LlmOutput, RecipeDetails};
use super::render::NoteBuilder;
use super::{
    fill_template, host_matches, is_blank, is_sentinel, wrong_variant, ContentTypeHandler,
    SourceMetadata,
};
use crate::error::ImportError;
use url::Url;

const SENTINEL: &str = "Not a recipe";
const UNTITLED: &str = "Untitled Recipe";

/// Sites that publish mostly recipes
const RECIPE_SITES: &[&str] = &[
    "allrecipes.com",
    "foodnetwork.com",
    "epicurious.com",
    "seriouseats.com",
    "bonappetit.com",
    "simplyrecipes.com",
    "bbcgoodfood.com",
    "food.com",
    "tasty.co",
    "delish.com",
    "cooking.nytimes.com",
    "thekitchn.com",
    "budgetbytes.com",
    "food52.com",
];

/// Path segments that mark a recipe page on any site
const RECIPE_SEGMENTS: &[&str] = &["recipe", "recipes"];

const PROMPT_TEMPLATE: &str = r#"Extract the recipe from the following web page.

If the page does not contain a recipe, respond with "recipeName" set to exactly "Not a recipe".
Use "Not specified" for any value the page does not provide.

Respond with a single JSON object in a ```json code block using this schema:
```json
{
  "recipeName": "Name of the dish",
  "description": "One or two sentence description",
  "ingredients": ["1 cup flour", "..."],
  "instructions": ["First step", "..."],
  "prepTime": "Preparation time",
  "cookTime": "Cooking time",
  "totalTime": "Total time",
  "servings": "Number of servings",
  "notes": ["Tip or variation", "..."]
}
```

Web page content:
{{content}}"#;

/// Handler for recipe pages
///
/// Recipes live on all kinds of blogs, so beyond the known sites this
/// handler also takes part in content-based classification.
#[derive(Debug, Default, Clone)]
pub struct RecipeHandler;

impl RecipeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ContentTypeHandler for RecipeHandler {
    fn content_type(&self) -> &'static str {
        "recipe"
    }

    fn detect(&self, url: &Url) -> bool {
        if RECIPE_SITES.iter().any(|site| host_matches(url, site)) {
            return true;
        }
        url.path_segments().is_some_and(|mut segments| {
            segments.any(|segment| {
                RECIPE_SEGMENTS
                    .iter()
                    .any(|marker| segment.eq_ignore_ascii_case(marker))
            })
        })
    }

    fn requires_content_detection(&self) -> bool {
        true
    }

    fn folder_name(&self) -> &'static str {
        "Recipes"
    }

    fn prompt(&self, content: &str) -> Result<String, ImportError> {
        fill_template(PROMPT_TEMPLATE, content)
    }

    fn parse_llm_response(&self, raw: &str) -> Result<LlmOutput, ImportError> {
        let mut details: RecipeDetails = parse_json_object(raw, "recipeName")?;
        fill_blank(&mut details.recipe_name, UNTITLED);
        Ok(LlmOutput::Recipe(details))
    }

    fn validate_llm_output(&self, output: &mut LlmOutput) -> Result<(), ImportError> {
        let LlmOutput::Recipe(recipe) = output else {
            return Err(wrong_variant("recipe", output));
        };
        if is_sentinel(&recipe.recipe_name, SENTINEL) {
            return Err(ImportError::NotInCategory("recipe".to_string()));
        }
        let has_ingredients = recipe.ingredients.iter().any(|i| !is_blank(i));
        let has_instructions = recipe.instructions.iter().any(|i| !is_blank(i));
        if !has_ingredients && !has_instructions {
            return Err(ImportError::IncompleteExtraction(
                "recipe has no ingredients or instructions".to_string(),
            ));
        }
        fill_blank(&mut recipe.recipe_name, UNTITLED);
        Ok(())
    }

    fn render_note(
        &self,
        output: &LlmOutput,
        source: &SourceMetadata,
    ) -> Result<String, ImportError> {
        let LlmOutput::Recipe(recipe) = output else {
            return Err(wrong_variant("recipe", output));
        };

        Ok(NoteBuilder::new(&recipe.recipe_name)
            .link("Source", &source.url)
            .image(&recipe.recipe_name, source.image.as_deref())
            .block(if is_blank(&recipe.description) {
                ""
            } else {
                recipe.description.as_str()
            })
            .field("Prep Time", &recipe.prep_time)
            .field("Cook Time", &recipe.cook_time)
            .field("Total Time", &recipe.total_time)
            .field("Servings", &recipe.servings)
            .end_fields()
            .bullets("Ingredients", &recipe.ingredients)
            .numbered("Instructions", &recipe.instructions)
            .bullets("Notes", &recipe.notes)
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_detect() {
        let handler = RecipeHandler::new();
        assert!(handler.detect(&url("https://www.allrecipes.com/recipe/21014/good-old-fashioned-pancakes/")));
        assert!(handler.detect(&url("https://cooking.nytimes.com/recipes/1015819")));
        assert!(handler.detect(&url("https://myblog.example.com/recipes/best-chili")));
        assert!(handler.detect(&url("https://example.com/Recipe/soup")));

        assert!(!handler.detect(&url("https://www.nytimes.com/section/food")));
        assert!(!handler.detect(&url("https://example.com/recipe-ideas")));
        assert!(!handler.detect(&url("https://seafood.company.com/menu")));
    }

    #[test]
    fn test_requires_content_detection() {
        assert!(RecipeHandler::new().requires_content_detection());
    }

    #[test]
    fn test_sentinel() {
        let err = RecipeHandler::new()
            .extract("```json\n{\"recipeName\": \"Not a recipe\"}\n```")
            .unwrap_err();
        assert!(matches!(err, ImportError::NotInCategory(ref c) if c == "recipe"));
    }

    #[test]
    fn test_scalar_ingredients_are_incomplete() {
        let err = RecipeHandler::new()
            .extract(r#"{"recipeName": "Stew", "ingredients": "none listed", "instructions": 7}"#)
            .unwrap_err();
        assert!(matches!(err, ImportError::IncompleteExtraction(_)));
    }

    #[test]
    fn test_incomplete_recipe() {
        let err = RecipeHandler::new()
            .extract(r#"{"recipeName": "Mystery Stew", "ingredients": [], "instructions": null}"#)
            .unwrap_err();
        assert!(matches!(err, ImportError::IncompleteExtraction(_)));
    }

    #[test]
    fn test_render() {
        let handler = RecipeHandler::new();
        let raw = r#"```json
{"recipeName": "Pancakes", "description": "Fluffy breakfast pancakes.",
 "ingredients": ["1 cup flour", "1 egg", "1 cup milk"],
 "instructions": ["Whisk everything", "Cook on a hot griddle"],
 "prepTime": "5 min", "cookTime": "10 min", "totalTime": "Not specified",
 "servings": 4, "notes": []}
```"#;
        let note = handler
            .note_content(raw, &SourceMetadata::new("https://example.com/recipes/pancakes"))
            .unwrap();

        assert_eq!(
            note,
            "# Pancakes\n\n\
             [Source](https://example.com/recipes/pancakes)\n\n\
             Fluffy breakfast pancakes.\n\n\
             **Prep Time:** 5 min\n\
             **Cook Time:** 10 min\n\
             **Servings:** 4\n\n\
             ## Ingredients\n\n- 1 cup flour\n- 1 egg\n- 1 cup milk\n\n\
             ## Instructions\n\n1. Whisk everything\n2. Cook on a hot griddle\n"
        );
    }
}
