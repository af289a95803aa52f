//! Recipe files on disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use actionarc_core::taskflow::Recipe;
use actionarc_domain::{ActionArcError, Result};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::errors::InfraError;

pub struct RecipeLoader;

impl RecipeLoader {
    /// Loads every `*.json` file in `dir`, sorted by file name.
    ///
    /// A missing directory yields no recipes. Unparseable or invalid
    /// recipes, and two files declaring the same recipe name, are errors.
    #[instrument]
    pub async fn load_dir(dir: &Path) -> Result<Vec<Recipe>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("recipe directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(InfraError::from)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut recipes = Vec::with_capacity(paths.len());
        for path in paths {
            let recipe = Self::load_file(&path).await?;
            if let Some(first) = seen.get(&recipe.name) {
                return Err(ActionArcError::Config(format!(
                    "recipe '{}' is defined in both {} and {}",
                    recipe.name,
                    first.display(),
                    path.display()
                )));
            }
            seen.insert(recipe.name.clone(), path);
            recipes.push(recipe);
        }

        info!(count = recipes.len(), "loaded recipes");
        Ok(recipes)
    }

    pub async fn load_file(path: &Path) -> Result<Recipe> {
        let bytes = fs::read(path).await.map_err(InfraError::from)?;
        let recipe: Recipe = serde_json::from_slice(&bytes)
            .map_err(|e| ActionArcError::Config(format!("invalid recipe {}: {e}", path.display())))?;
        recipe
            .validate()
            .map_err(|e| ActionArcError::Config(format!("invalid recipe {}: {e}", path.display())))?;
        Ok(recipe)
    }
}
