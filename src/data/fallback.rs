//! Primary/secondary provider selection with sticky per-build fallback.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    data::MarketSource,
    error::ProviderError,
    models::{Category, Headline, PricePoint, ProviderState, Quote, Source},
};

/// Items together with the provider that served them.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub source: Source,
    pub items: T,
}

/// Fallback state for one build. Construct per build; never share across builds.
pub struct FallbackFetcher {
    primary: Option<Arc<dyn MarketSource>>,
    secondary: Arc<dyn MarketSource>,
    demoted: BTreeSet<Category>,
    status: BTreeMap<Category, ProviderState>,
}

impl FallbackFetcher {
    /// Starts on `primary` for every category when it is configured.
    pub fn new(primary: Option<Arc<dyn MarketSource>>, secondary: Arc<dyn MarketSource>) -> Self {
        let primary = primary.filter(|p| p.is_configured());
        Self {
            primary,
            secondary,
            demoted: BTreeSet::new(),
            status: BTreeMap::new(),
        }
    }

    pub fn secondary_only(secondary: Arc<dyn MarketSource>) -> Self {
        Self::new(None, secondary)
    }

    /// Whether the next call for `category` goes to the primary.
    pub fn uses_primary(&self, category: Category) -> bool {
        self.primary.is_some() && !self.demoted.contains(&category)
    }

    /// Source the next call for `category` will try first.
    pub fn current_source(&self, category: Category) -> Source {
        match &self.primary {
            Some(primary) if self.uses_primary(category) => primary.source(),
            _ => self.secondary.source(),
        }
    }

    pub fn provider_status(&self) -> &BTreeMap<Category, ProviderState> {
        &self.status
    }

    /// The status map, or `None` when every category stayed on its first choice.
    pub fn into_status(self) -> Option<BTreeMap<Category, ProviderState>> {
        (!self.status.is_empty()).then_some(self.status)
    }

    pub async fn quotes(&mut self, symbols: &[String]) -> Served<Vec<Quote>> {
        if let Some(primary) = self.primary_for(Category::Quotes) {
            let outcome = primary.quotes(symbols).await;
            if let Some(items) = self.settle(Category::Quotes, outcome) {
                return Served {
                    source: primary.source(),
                    items,
                };
            }
        }
        let outcome = self.secondary.quotes(symbols).await;
        self.from_secondary(Category::Quotes, outcome)
    }

    pub async fn history(
        &mut self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Served<Vec<PricePoint>> {
        if let Some(primary) = self.primary_for(Category::History) {
            let outcome = primary.history(symbol, date_from, date_to).await;
            if let Some(items) = self.settle(Category::History, outcome) {
                return Served {
                    source: primary.source(),
                    items,
                };
            }
        }
        let outcome = self.secondary.history(symbol, date_from, date_to).await;
        self.from_secondary(Category::History, outcome)
    }

    pub async fn news(&mut self, symbol: &str, limit: usize) -> Served<Vec<Headline>> {
        if let Some(primary) = self.primary_for(Category::News) {
            let outcome = primary.news(symbol, limit).await;
            if let Some(items) = self.settle(Category::News, outcome) {
                return Served {
                    source: primary.source(),
                    items,
                };
            }
        }
        let outcome = self.secondary.news(symbol, limit).await;
        self.from_secondary(Category::News, outcome)
    }

    fn primary_for(&self, category: Category) -> Option<Arc<dyn MarketSource>> {
        if self.uses_primary(category) {
            self.primary.clone()
        } else {
            None
        }
    }

    /// Keep a non-empty primary answer; otherwise demote the category for the build.
    fn settle<T>(
        &mut self,
        category: Category,
        outcome: Result<Vec<T>, ProviderError>,
    ) -> Option<Vec<T>> {
        let state = match outcome {
            Ok(items) if !items.is_empty() => return Some(items),
            Ok(_) | Err(ProviderError::RateLimited { .. }) => ProviderState::RateLimited,
            Err(err) => {
                warn!(?category, %err, "primary provider failed");
                ProviderState::Unavailable
            }
        };
        info!(?category, ?state, "falling back to secondary provider for this build");
        self.demoted.insert(category);
        self.status.insert(category, state);
        None
    }

    fn from_secondary<T>(
        &self,
        category: Category,
        outcome: Result<Vec<T>, ProviderError>,
    ) -> Served<Vec<T>> {
        let items = outcome.unwrap_or_else(|err| {
            warn!(?category, %err, "secondary provider failed");
            Vec::new()
        });
        Served {
            source: self.secondary.source(),
            items,
        }
    }
}
