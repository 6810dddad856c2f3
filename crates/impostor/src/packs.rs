//! Word packs: where secret words come from.
//!
//! Packs live behind [`WordPackSource`] so the server can be backed by
//! a database or a static file. [`InMemoryWordPacks`] is the bundled
//! implementation.

use std::future::Future;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::CoordinatorError;

/// A themed list of secret words. The pack's `name` doubles as the
/// category hint shown to impostors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPack {
    pub id: String,
    pub name: String,
    pub words: Vec<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Category shared by translations of the same pack, e.g. `"food"`
    /// for both the `en` and `es` food packs.
    #[serde(default)]
    pub slug: String,
}

fn default_locale() -> String {
    "en".to_string()
}

impl WordPack {
    fn has_words(&self) -> bool {
        self.words.iter().any(|w| !w.trim().is_empty())
    }

    /// Draws a random non-blank word.
    pub fn draw_word(&self) -> Option<&str> {
        let usable: Vec<&str> = self
            .words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect();
        usable.choose(&mut rand::rng()).copied()
    }
}

/// Lookup interface for word packs.
///
/// # Example
///
/// ```rust
/// use impostor::prelude::*;
///
/// struct OnePack(WordPack);
///
/// impl WordPackSource for OnePack {
///     async fn find_by_id(&self, id: &str) -> Option<WordPack> {
///         (self.0.id == id).then(|| self.0.clone())
///     }
///
///     async fn find_by_slug_and_locale(&self, _slug: &str, _locale: &str) -> Option<WordPack> {
///         None
///     }
///
///     async fn list_all(&self) -> Vec<WordPack> {
///         vec![self.0.clone()]
///     }
/// }
/// ```
pub trait WordPackSource: Send + Sync + 'static {
    fn find_by_id(&self, id: &str) -> impl Future<Output = Option<WordPack>> + Send;

    /// Finds the pack of category `slug` whose locale starts with
    /// `locale_prefix` (`"es"` matches `"es-MX"`).
    fn find_by_slug_and_locale(
        &self,
        slug: &str,
        locale_prefix: &str,
    ) -> impl Future<Output = Option<WordPack>> + Send;

    fn list_all(&self) -> impl Future<Output = Vec<WordPack>> + Send;
}

/// Packs held in memory, typically loaded from JSON at startup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWordPacks {
    packs: Vec<WordPack>,
}

impl InMemoryWordPacks {
    pub fn new(packs: Vec<WordPack>) -> Self {
        Self { packs }
    }

    /// Parses a JSON array of packs.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}

impl WordPackSource for InMemoryWordPacks {
    async fn find_by_id(&self, id: &str) -> Option<WordPack> {
        self.packs.iter().find(|p| p.id == id).cloned()
    }

    async fn find_by_slug_and_locale(&self, slug: &str, locale_prefix: &str) -> Option<WordPack> {
        let prefix = locale_prefix.to_ascii_lowercase();
        self.packs
            .iter()
            .find(|p| p.slug == slug && p.locale.to_ascii_lowercase().starts_with(&prefix))
            .cloned()
    }

    async fn list_all(&self) -> Vec<WordPack> {
        self.packs.clone()
    }
}

/// Picks the pack for a new game.
///
/// An explicit `pack_id` wins; otherwise a random id from `selection`;
/// otherwise a random pack from the whole catalog. If the chosen pack
/// is not in the requested locale, a pack of the same slug in that
/// locale replaces it when one exists.
///
/// # Errors
/// [`CoordinatorError::PackInvalid`] if nothing was found or the pack
/// has no usable words.
pub async fn resolve_pack<W: WordPackSource>(
    source: &W,
    pack_id: Option<&str>,
    selection: &[String],
    locale: &str,
) -> Result<WordPack, CoordinatorError> {
    let chosen = pack_id
        .filter(|id| !id.is_empty())
        .or_else(|| pick(selection).map(String::as_str));
    let base = match chosen {
        Some(id) => source.find_by_id(id).await,
        None => pick_owned(source.list_all().await),
    };
    let pack = base.ok_or_else(|| {
        CoordinatorError::PackInvalid(chosen.unwrap_or("<any>").to_string())
    })?;

    let pack = localize(source, pack, locale).await;
    if !pack.has_words() {
        return Err(CoordinatorError::PackInvalid(pack.id));
    }
    Ok(pack)
}

async fn localize<W: WordPackSource>(source: &W, pack: WordPack, locale: &str) -> WordPack {
    let prefix = locale
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if prefix.is_empty()
        || pack.slug.is_empty()
        || pack.locale.to_ascii_lowercase().starts_with(&prefix)
    {
        return pack;
    }
    match source.find_by_slug_and_locale(&pack.slug, &prefix).await {
        Some(localized) if localized.has_words() => {
            tracing::debug!(from = %pack.id, to = %localized.id, %prefix, "using localized pack");
            localized
        }
        _ => pack,
    }
}

fn pick<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::rng())
}

fn pick_owned<T: Clone>(items: Vec<T>) -> Option<T> {
    pick(&items).cloned()
}
