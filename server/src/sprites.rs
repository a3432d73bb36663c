//! Sprite table loading. The table is read once at startup and never changes.

use crate::persistence::PersistenceError;
use log::{info, warn};
use shared::{default_sprites, SpriteTable, DEFAULT_SPRITE};
use std::path::Path;

/// Loads the sprite table from `path`, or the built-in table when no path is
/// given or the file cannot be used.
pub fn load_sprites(path: Option<&Path>) -> SpriteTable {
    let Some(path) = path else {
        return default_sprites();
    };

    match read_sprites(path) {
        Ok(mut sprites) => {
            if !sprites.contains_key(DEFAULT_SPRITE) {
                if let Some(glyph) = default_sprites().remove(DEFAULT_SPRITE) {
                    sprites.insert(DEFAULT_SPRITE.to_string(), glyph);
                }
            }
            info!("Loaded {} sprite(s) from {}", sprites.len(), path.display());
            sprites
        }
        Err(e) => {
            warn!("Using built-in sprites: {}", e);
            default_sprites()
        }
    }
}

fn read_sprites(path: &Path) -> Result<SpriteTable, PersistenceError> {
    let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}
