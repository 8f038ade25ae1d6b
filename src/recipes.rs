use anyhow::{Context, Result};
use serde::Deserialize;

/// A recipe as served by the backend; only the fields the voice session
/// needs, everything tolerant of omission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Recipe lookup seam
///
/// Fetched once per session while loading; a failure leaves the session
/// with zero steps rather than failing the session.
#[async_trait::async_trait]
pub trait RecipeSource: Send + Sync {
    async fn recipe_by_id(&self, id: &str) -> Result<Recipe>;
}

/// Recipe source backed by the REST API
pub struct HttpRecipeSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecipeSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl RecipeSource for HttpRecipeSource {
    async fn recipe_by_id(&self, id: &str) -> Result<Recipe> {
        let url = format!(
            "{}/api/v1/recipes/id/{}",
            self.base_url.trim_end_matches('/'),
            id
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Recipe request failed")?
            .error_for_status()
            .context("Recipe request rejected")?;

        let recipe = response
            .json::<Recipe>()
            .await
            .context("Recipe response decode failed")?;

        Ok(recipe)
    }
}
