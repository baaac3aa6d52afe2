//! Product catalog: the read-only list of flavors shown on the page.
//!
//! The animator consumes only `image_path`, `frame_direction` and
//! `frame_count`; the remaining fields are carried for the surrounding UI.
//!
//! JSON layout matches the site's content config (camelCase keys, an array
//! of products in page order).

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::sequence::{FrameDirection, FrameSequence};

/// Frame count used when a product does not specify one.
pub const DEFAULT_FRAME_COUNT: u32 = 191;

fn default_frame_count() -> u32 {
    DEFAULT_FRAME_COUNT
}

/// Gradient theme of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThemeColors {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollText {
    pub headline: String,
    pub subheadline: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub label: String,
    pub value: String,
}

/// One flavor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub colors: ThemeColors,
    /// Base path of the frame images, e.g. `/images/mango`
    pub image_path: String,
    #[serde(default)]
    pub frame_direction: FrameDirection,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
    #[serde(default)]
    pub scroll_texts: Vec<ScrollText>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl ProductConfig {
    pub fn sequence(&self) -> FrameSequence {
        FrameSequence::new(self.image_path.clone(), self.frame_count, self.frame_direction)
    }
}

/// Catalog errors
#[derive(Debug)]
pub enum CatalogError {
    Io(String),
    Parse(String),
    DuplicateId(String),
    NoFrames(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(e) => write!(f, "Catalog IO error: {}", e),
            CatalogError::Parse(e) => write!(f, "Catalog parse error: {}", e),
            CatalogError::DuplicateId(id) => write!(f, "Duplicate product id: {}", id),
            CatalogError::NoFrames(id) => write!(f, "Product {} has frameCount 0", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Products keyed by id, in page order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: IndexMap<String, ProductConfig>,
}

impl Catalog {
    pub fn new(products: Vec<ProductConfig>) -> Result<Self, CatalogError> {
        let mut map = IndexMap::with_capacity(products.len());
        for product in products {
            if product.frame_count == 0 {
                return Err(CatalogError::NoFrames(product.id));
            }
            if map.contains_key(&product.id) {
                return Err(CatalogError::DuplicateId(product.id));
            }
            map.insert(product.id.clone(), product);
        }
        debug!("Catalog created with {} products", map.len());
        Ok(Self { products: map })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<ProductConfig> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(products)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&json)?;
        info!("Loaded catalog {} ({} products)", path.display(), catalog.len());
        Ok(catalog)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        let products: Vec<&ProductConfig> = self.products.values().collect();
        serde_json::to_string_pretty(&products).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&ProductConfig> {
        self.products.get(id)
    }

    pub fn first(&self) -> Option<&ProductConfig> {
        self.products.first().map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductConfig> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Next flavor in page order, wrapping around at the end.
    pub fn next_after(&self, id: &str) -> Option<&ProductConfig> {
        let idx = self.products.get_index_of(id)?;
        self.products
            .get_index((idx + 1) % self.products.len())
            .map(|(_, p)| p)
    }

    /// Sum of frame counts over all products.
    pub fn total_frames(&self) -> u64 {
        self.products.values().map(|p| p.frame_count as u64).sum()
    }

    /// The three flavors the site ships with.
    pub fn builtin() -> Self {
        let product = |id: &str,
                       name: &str,
                       subtitle: &str,
                       price: &str,
                       colors: (&str, &str),
                       direction: FrameDirection| ProductConfig {
            id: id.to_string(),
            name: name.to_string(),
            subtitle: subtitle.to_string(),
            description: String::new(),
            price: price.to_string(),
            colors: ThemeColors {
                from: colors.0.to_string(),
                to: colors.1.to_string(),
            },
            image_path: format!("/images/{}", id),
            frame_direction: direction,
            frame_count: DEFAULT_FRAME_COUNT,
            scroll_texts: Vec::new(),
            features: vec![Feature {
                label: "Volume".to_string(),
                value: "350ml".to_string(),
            }],
        };

        let products = vec![
            product(
                "mango",
                "Mango Fusion",
                "Tropical Paradise",
                "$4.99",
                ("#fbbf24", "#ea580c"),
                FrameDirection::Reverse,
            ),
            product(
                "chocolate",
                "Chocolate Bliss",
                "Pure Indulgence",
                "$5.49",
                ("#3f2212", "#0f0502"),
                FrameDirection::Forward,
            ),
            product(
                "pomegranate",
                "Pomegranate Power",
                "Antioxidant Boost",
                "$5.99",
                ("#be123c", "#4c0519"),
                FrameDirection::Reverse,
            ),
        ];

        let mut map = IndexMap::with_capacity(products.len());
        for p in products {
            map.insert(p.id.clone(), p);
        }
        Self { products: map }
    }
}
