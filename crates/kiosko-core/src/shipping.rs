//! # Shipping Selection
//!
//! Delivery location chain and shipping method for orders that ship.
//!
//! ## Location Chain
//! ```text
//! Country ──► State ──► City ──► Neighborhood
//!    │          │         │
//!    │          │         └── choosing a City clears Neighborhood
//!    │          └── choosing a State clears City, Neighborhood
//!    └── choosing a Country clears everything below
//! ```
//! A level can only be chosen once its parent is. Any location change drops
//! the resolved cost, since rates are keyed by location.
//!
//! ## Rate Resolution
//! The rate table is keyed by `(method, location)`. The most specific level
//! wins: a neighborhood rate beats a city rate, which beats a state rate,
//! which beats a country rate.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{LocationLevel, ShippingRate};

/// Requested shipping details, as sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingUpdate {
    pub country_id: Option<String>,
    pub state_id: Option<String>,
    pub city_id: Option<String>,
    pub neighborhood_id: Option<String>,
    pub shipping_method_id: Option<String>,
    pub address: Option<String>,
    pub reference: Option<String>,
}

/// Shipping state of the sale in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingSelection {
    pub country_id: Option<String>,
    pub state_id: Option<String>,
    pub city_id: Option<String>,
    pub neighborhood_id: Option<String>,
    pub shipping_method_id: Option<String>,
    /// Cost resolved from the rate table for the current chain and method.
    pub cost: Option<Money>,
    pub address: Option<String>,
    pub reference: Option<String>,
}

impl ShippingSelection {
    /// The location chosen at `level`, if any.
    pub fn location(&self, level: LocationLevel) -> Option<&str> {
        match level {
            LocationLevel::Country => self.country_id.as_deref(),
            LocationLevel::State => self.state_id.as_deref(),
            LocationLevel::City => self.city_id.as_deref(),
            LocationLevel::Neighborhood => self.neighborhood_id.as_deref(),
        }
    }

    fn slot(&mut self, level: LocationLevel) -> &mut Option<String> {
        match level {
            LocationLevel::Country => &mut self.country_id,
            LocationLevel::State => &mut self.state_id,
            LocationLevel::City => &mut self.city_id,
            LocationLevel::Neighborhood => &mut self.neighborhood_id,
        }
    }

    /// Chooses (or clears) the location at `level`.
    ///
    /// Deeper levels and the resolved cost are cleared whenever the value
    /// actually changes.
    pub fn select_location(&mut self, level: LocationLevel, id: Option<String>) -> CoreResult<()> {
        if id.is_some() {
            if let Some(parent) = level.parent() {
                if self.location(parent).is_none() {
                    return Err(CoreError::ParentLocationMissing {
                        level: level.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }
        }

        if self.location(level) == id.as_deref() {
            return Ok(());
        }

        *self.slot(level) = id;
        for deeper in LocationLevel::ALL.iter().filter(|l| **l > level) {
            *self.slot(*deeper) = None;
        }
        self.cost = None;
        Ok(())
    }

    /// Applies a full update, walking the chain from the broadest level.
    ///
    /// The cost is cleared; the caller resolves it against the rate table.
    pub fn apply(&mut self, update: ShippingUpdate) -> CoreResult<()> {
        let mut next = self.clone();
        next.select_location(LocationLevel::Country, update.country_id)?;
        next.select_location(LocationLevel::State, update.state_id)?;
        next.select_location(LocationLevel::City, update.city_id)?;
        next.select_location(LocationLevel::Neighborhood, update.neighborhood_id)?;
        next.shipping_method_id = update.shipping_method_id;
        next.address = update.address;
        next.reference = update.reference;
        next.cost = None;
        *self = next;
        Ok(())
    }

    /// Every level chosen, broadest first, stopping at the first gap.
    pub fn chain(&self) -> Vec<(LocationLevel, &str)> {
        LocationLevel::ALL
            .iter()
            .map_while(|level| self.location(*level).map(|id| (*level, id)))
            .collect()
    }

    pub fn has_full_chain(&self) -> bool {
        self.chain().len() == LocationLevel::ALL.len()
    }

    /// Full chain, a method, and a resolved cost.
    pub fn is_complete(&self) -> bool {
        self.has_full_chain() && self.shipping_method_id.is_some() && self.cost.is_some()
    }
}

/// Finds the cost for `method_id` at the most specific level of `selection`
/// that has a rate.
///
/// ```rust
/// use kiosko_core::shipping::{resolve_rate, ShippingSelection};
/// use kiosko_core::types::{LocationLevel, ShippingRate};
/// use kiosko_core::Money;
///
/// let rates = vec![
///     ShippingRate { shipping_method_id: "courier".into(), location_id: "pe".into(),
///                    level: LocationLevel::Country, cost: Money::from_cents(2000) },
///     ShippingRate { shipping_method_id: "courier".into(), location_id: "lima".into(),
///                    level: LocationLevel::City, cost: Money::from_cents(800) },
/// ];
/// let selection = ShippingSelection {
///     country_id: Some("pe".into()),
///     state_id: Some("lima-region".into()),
///     city_id: Some("lima".into()),
///     neighborhood_id: Some("miraflores".into()),
///     ..Default::default()
/// };
///
/// assert_eq!(resolve_rate(&rates, "courier", &selection), Some(Money::from_cents(800)));
/// ```
pub fn resolve_rate(
    rates: &[ShippingRate],
    method_id: &str,
    selection: &ShippingSelection,
) -> Option<Money> {
    selection.chain().into_iter().rev().find_map(|(level, location_id)| {
        rates
            .iter()
            .find(|r| {
                r.shipping_method_id == method_id
                    && r.level == level
                    && r.location_id == location_id
            })
            .map(|r| r.cost)
    })
}
