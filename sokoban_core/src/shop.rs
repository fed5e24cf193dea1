//! Potion shop: spends the player's money on potion effects.

use tracing::{debug, trace};

use crate::{
    PotionKind,
    config::ShopPrices,
    puzzle::{HistoryEntry, PuzzleState, StatOverflow},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("{kind:?} potion costs ${price}, player has ${money}")]
    InsufficientFunds {
        kind: PotionKind,
        price: u32,
        money: u32,
    },
    #[error(transparent)]
    StatOverflow(#[from] StatOverflow),
}

/// A potion on offer and its price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShopItem {
    pub kind: PotionKind,
    pub price: u32,
}

/// Lists every potion for sale, in display order.
pub fn shop_items(prices: &ShopPrices) -> Vec<ShopItem> {
    PotionKind::ALL
        .iter()
        .map(|&kind| ShopItem {
            kind,
            price: prices.price(kind),
        })
        .collect()
}

impl PuzzleState {
    /// Buys a potion and applies its effect immediately.
    ///
    /// A purchase does not cost a move. It is recorded in the history, so
    /// [`PuzzleState::undo`] refunds it.
    pub fn attempt_purchase(&mut self, kind: PotionKind) -> Result<u32, PurchaseError> {
        let price = self.config.shop.price(kind);
        let money = self.player.money;
        if money < price {
            trace!(?kind, price, money, "Purchase rejected");
            return Err(PurchaseError::InsufficientFunds { kind, price, money });
        }
        self.player.apply_effect(kind.effect())?;
        self.player.money -= price;
        self.history.push(HistoryEntry::Purchase { kind, price });
        debug!(?kind, price, money = self.player.money, "Potion purchased");
        Ok(price)
    }

    pub fn shop_items(&self) -> Vec<ShopItem> {
        shop_items(&self.config.shop)
    }
}
