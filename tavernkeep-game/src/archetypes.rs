//! Static patron archetypes and the menu catalog.
//!
//! Both registries load from JSON once and are consulted with weighted
//! draws. Malformed rows are logged and dropped so one bad entry never
//! aborts a population step.

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Template used to instantiate a patron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatronArchetype {
    pub id: String,
    pub name: String,
    /// Relative draw weight; zero-weight rows are dropped at load.
    pub weight: u32,
    /// Coins a freshly arrived patron of this archetype carries.
    pub base_wealth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ArchetypeNoId {
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_wealth: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArchetypeList(pub Vec<PatronArchetype>);

impl ArchetypeList {
    #[must_use]
    pub const fn empty() -> Self {
        Self(vec![])
    }

    /// Load archetypes from a JSON object keyed by archetype id.
    ///
    /// Rows that cannot participate in a weighted draw (zero weight,
    /// negative wealth) are skipped with a warning rather than failing
    /// the whole registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed at all.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let map: std::collections::BTreeMap<String, ArchetypeNoId> = serde_json::from_str(json)?;
        let mut rows = Vec::with_capacity(map.len());
        for (id, row) in map {
            if row.weight == 0 || row.base_wealth < 0 {
                warn!(
                    "skipping malformed archetype {id}: weight={} base_wealth={}",
                    row.weight, row.base_wealth
                );
                continue;
            }
            rows.push(PatronArchetype {
                id,
                name: row.name,
                weight: row.weight,
                base_wealth: row.base_wealth,
            });
        }
        Ok(Self(rows))
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&PatronArchetype> {
        self.0.iter().find(|a| a.id == id)
    }

    /// Weighted draw over the registry. Empty registries yield `None`.
    pub fn pick<'a>(&'a self, rng: &mut impl Rng) -> Option<&'a PatronArchetype> {
        weighted_pick(&self.0, |a| a.weight, rng)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatronArchetype> {
        self.0.iter()
    }
}

/// One orderable item with its price band in whole coins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub weight: u32,
    pub min_price: i64,
    pub max_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MenuCatalog(pub Vec<MenuItem>);

impl MenuCatalog {
    #[must_use]
    pub const fn empty() -> Self {
        Self(vec![])
    }

    /// Load the catalog from a JSON object keyed by item id, dropping rows
    /// with inverted or negative price bands.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed at all.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct ItemNoId {
            name: String,
            #[serde(default)]
            weight: u32,
            min_price: i64,
            max_price: i64,
        }
        let map: std::collections::BTreeMap<String, ItemNoId> = serde_json::from_str(json)?;
        let mut items = Vec::with_capacity(map.len());
        for (id, row) in map {
            if row.weight == 0 || row.min_price < 0 || row.min_price > row.max_price {
                warn!(
                    "skipping malformed menu item {id}: weight={} band={}..{}",
                    row.weight, row.min_price, row.max_price
                );
                continue;
            }
            items.push(MenuItem {
                id,
                name: row.name,
                weight: row.weight,
                min_price: row.min_price,
                max_price: row.max_price,
            });
        }
        Ok(Self(items))
    }

    /// Weighted draw of an item plus a concrete price from its band.
    pub fn draw_order(&self, rng: &mut impl Rng) -> Option<(&MenuItem, i64)> {
        let item = weighted_pick(&self.0, |i| i.weight, rng)?;
        let price = if item.min_price == item.max_price {
            item.min_price
        } else {
            rng.gen_range(item.min_price..=item.max_price)
        };
        Some((item, price))
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }
}

fn weighted_pick<'a, T>(rows: &'a [T], weight: impl Fn(&T) -> u32, rng: &mut impl Rng) -> Option<&'a T> {
    let total: u64 = rows.iter().map(|row| u64::from(weight(row))).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for row in rows {
        let w = u64::from(weight(row));
        if roll < w {
            return Some(row);
        }
        roll -= w;
    }
    rows.last()
}

/// Bundled default registries, embedded so the engine works without any
/// platform asset pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Assets {
    pub archetypes: ArchetypeList,
    pub menu: MenuCatalog,
}

impl Assets {
    /// Load registries from JSON strings.
    ///
    /// # Errors
    ///
    /// Returns an error when either document fails to parse or parses to an
    /// empty registry.
    pub fn from_json(archetypes: &str, menu: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        let archetypes =
            ArchetypeList::from_json(archetypes).context("parsing archetype registry")?;
        let menu = MenuCatalog::from_json(menu).context("parsing menu catalog")?;
        anyhow::ensure!(!archetypes.is_empty(), "archetype registry is empty");
        anyhow::ensure!(!menu.is_empty(), "menu catalog is empty");
        Ok(Self { archetypes, menu })
    }
}

/// The built-in registries shipped with the crate.
#[must_use]
pub fn builtin_assets() -> &'static Assets {
    static ASSETS: OnceLock<Assets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        Assets::from_json(
            include_str!("../assets/archetypes.json"),
            include_str!("../assets/menu.json"),
        )
        .expect("valid built-in asset data")
    })
}
