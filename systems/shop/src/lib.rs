#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shop sequence that decides which building the player can buy next.

use hamlet_core::{BuildingDefinition, ShopStatus};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// Configuration controlling how the shop walks its catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShopConfig {
    /// Restarts the sequence after the last building instead of exhausting.
    pub looping: bool,
    /// Seed for a deterministic shuffle; `None` keeps authored order.
    pub shuffle_seed: Option<u64>,
}

/// Reasons a purchase could not be completed.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    /// Every building of a non-looping sequence has been sold.
    #[error("the shop has no buildings left")]
    Exhausted,
    /// The balance does not cover the upcoming building.
    #[error("building costs {cost} but only {balance} is available")]
    InsufficientFunds {
        /// Price of the upcoming building.
        cost: u32,
        /// Balance offered for the purchase.
        balance: u32,
    },
}

/// Outcome of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    /// Building handed to the player.
    pub definition: BuildingDefinition,
    /// Balance left after paying for the building.
    pub remaining_balance: u32,
}

/// Ordered sequence of buildings offered to the player.
#[derive(Debug)]
pub struct Shop {
    catalog: Vec<BuildingDefinition>,
    order: Vec<usize>,
    cursor: usize,
    config: ShopConfig,
    rng: Option<ChaCha8Rng>,
}

impl Shop {
    /// Creates a shop that offers the catalog under the provided configuration.
    #[must_use]
    pub fn new(catalog: Vec<BuildingDefinition>, config: ShopConfig) -> Self {
        let mut shop = Self {
            order: (0..catalog.len()).collect(),
            catalog,
            cursor: 0,
            config,
            rng: config.shuffle_seed.map(ChaCha8Rng::seed_from_u64),
        };
        shop.reshuffle();
        log::debug!(
            "shop opened with {} buildings (looping: {})",
            shop.catalog.len(),
            config.looping
        );
        shop
    }

    /// Configuration the shop was opened with.
    #[must_use]
    pub const fn config(&self) -> ShopConfig {
        self.config
    }

    /// Building that the next purchase would hand out.
    #[must_use]
    pub fn upcoming(&self) -> Option<&BuildingDefinition> {
        self.order
            .get(self.cursor)
            .and_then(|index| self.catalog.get(*index))
    }

    /// True once a non-looping sequence has sold its last building.
    ///
    /// An empty catalog is exhausted from the start.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.upcoming().is_none()
    }

    /// Number of buildings left before a non-looping shop is exhausted.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.cursor)
    }

    /// Snapshot consumed by the outcome state machine.
    #[must_use]
    pub fn status(&self) -> ShopStatus<'_> {
        ShopStatus {
            upcoming: self.upcoming(),
            exhausted: self.is_exhausted(),
        }
    }

    /// Sells the upcoming building and advances the sequence.
    pub fn purchase(&mut self, balance: u32) -> Result<Purchase, ShopError> {
        let definition = self.upcoming().cloned().ok_or(ShopError::Exhausted)?;
        let remaining_balance =
            balance
                .checked_sub(definition.cost)
                .ok_or(ShopError::InsufficientFunds {
                    cost: definition.cost,
                    balance,
                })?;

        self.cursor += 1;
        if self.config.looping && self.cursor >= self.order.len() {
            self.cursor = 0;
            self.reshuffle();
            log::debug!("shop sequence restarted");
        }
        log::debug!(
            "sold {} for {}, {} left",
            definition.name,
            definition.cost,
            remaining_balance
        );

        Ok(Purchase {
            definition,
            remaining_balance,
        })
    }

    fn reshuffle(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use hamlet_core::{CellCoord, Layout};

    use super::*;

    fn building(name: &str, cost: u32) -> BuildingDefinition {
        BuildingDefinition {
            name: name.to_owned(),
            cost,
            layout: Layout::single_cell(),
        }
    }

    fn names(shop: &mut Shop, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| shop.purchase(u32::MAX).expect("purchase").definition.name)
            .collect()
    }

    #[test]
    fn authored_order_is_kept_without_seed() {
        let mut shop = Shop::new(
            vec![building("hut", 1), building("well", 2), building("mill", 3)],
            ShopConfig::default(),
        );
        assert_eq!(names(&mut shop, 3), vec!["hut", "well", "mill"]);
        assert!(shop.is_exhausted());
        assert_eq!(shop.purchase(10), Err(ShopError::Exhausted));
    }

    #[test]
    fn insufficient_funds_do_not_advance() {
        let mut shop = Shop::new(vec![building("granary", 5)], ShopConfig::default());
        assert_eq!(
            shop.purchase(3),
            Err(ShopError::InsufficientFunds { cost: 5, balance: 3 })
        );
        assert_eq!(shop.remaining(), 1);

        let purchase = shop.purchase(8).expect("affordable");
        assert_eq!(purchase.remaining_balance, 3);
        assert_eq!(purchase.definition.layout.pivot(), CellCoord::new(0, 0));
    }

    #[test]
    fn looping_shop_never_exhausts() {
        let mut shop = Shop::new(
            vec![building("a", 0), building("b", 0)],
            ShopConfig {
                looping: true,
                shuffle_seed: None,
            },
        );
        assert_eq!(names(&mut shop, 5), vec!["a", "b", "a", "b", "a"]);
        assert!(!shop.is_exhausted());
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let catalog: Vec<_> = (0..8).map(|index| building(&format!("b{index}"), 0)).collect();
        let config = ShopConfig {
            looping: false,
            shuffle_seed: Some(42),
        };

        let first = names(&mut Shop::new(catalog.clone(), config), 8);
        let second = names(&mut Shop::new(catalog, config), 8);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        let mut expected: Vec<_> = (0..8).map(|index| format!("b{index}")).collect();
        expected.sort();
        assert_eq!(sorted, expected, "a shuffle must be a permutation");
    }

    #[test]
    fn empty_catalog_is_exhausted() {
        let shop = Shop::new(Vec::new(), ShopConfig::default());
        let status = shop.status();
        assert!(status.exhausted);
        assert!(status.upcoming.is_none());
        assert_eq!(shop.config(), ShopConfig::default());
    }
}
