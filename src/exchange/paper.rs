//! In-memory venue for paper trading and tests.
//!
//! Quotes come from a scripted book queue, a fixed book, or a live venue used
//! read-only as market data source. Orders never leave the process.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::error::VenueError;
use super::traits::Venue;
use super::types::*;

/// Remote operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperOp {
    BestBidAsk,
    NetPosition,
    CancelAll,
    PlaceLimit,
    PlaceMarket,
}

/// A simulated resting order.
#[derive(Debug, Clone)]
pub struct RestingOrder {
    pub order_id: u64,
    pub side: OrderSide,
    pub price: Decimal,
    pub remaining: Decimal,
}

/// One simulated execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub contract: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
    pub maker: bool,
}

/// Counters for assertions and end-of-run logging.
#[derive(Debug, Clone, Default)]
pub struct PaperStats {
    pub limit_orders: u64,
    pub market_orders: u64,
    pub cancels: u64,
    /// Highest number of simultaneously resting orders seen on any contract
    pub max_resting: usize,
}

#[derive(Debug, Default)]
struct PaperState {
    books: HashMap<String, BookTop>,
    scripted_books: HashMap<String, VecDeque<BookTop>>,
    positions: HashMap<String, Decimal>,
    resting: HashMap<String, Vec<RestingOrder>>,
    scripted_fills: HashMap<String, VecDeque<Decimal>>,
    failures: HashMap<PaperOp, VecDeque<VenueError>>,
    fills: Vec<PaperFill>,
    /// Market executions by client order id
    executed: HashMap<String, FillConfirmation>,
    stats: PaperStats,
}

impl PaperState {
    fn take_failure(&mut self, op: PaperOp) -> Result<(), VenueError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply_fill(&mut self, contract: &str, side: OrderSide, size: Decimal, price: Decimal, maker: bool) {
        *self.positions.entry(contract.to_string()).or_default() += side.sign() * size;
        self.fills.push(PaperFill {
            contract: contract.to_string(),
            side,
            size,
            price,
            maker,
        });
        info!(
            %contract,
            side = %side,
            %size,
            %price,
            maker,
            position = %self.positions[contract],
            "Paper fill"
        );
    }

    /// Fill resting orders the current book has traded through.
    fn match_resting(&mut self, contract: &str) {
        let Some(book) = self.books.get(contract).copied() else {
            return;
        };
        let Some(orders) = self.resting.get_mut(contract) else {
            return;
        };

        let mut executed = Vec::new();
        orders.retain(|order| {
            let crossed = match order.side {
                OrderSide::Buy => book.ask <= order.price,
                OrderSide::Sell => book.bid >= order.price,
            };
            if crossed {
                executed.push(order.clone());
            }
            !crossed
        });

        for order in executed {
            self.apply_fill(contract, order.side, order.remaining, order.price, true);
        }
    }
}

/// Simulated venue.
pub struct PaperVenue {
    name: String,
    state: Arc<RwLock<PaperState>>,
    quote_source: Option<Arc<dyn Venue>>,
    order_id_counter: AtomicU64,
    tick_size: Decimal,
    lot_size: Decimal,
}

impl PaperVenue {
    /// Create an empty paper venue; quotes must be set or scripted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(PaperState::default())),
            quote_source: None,
            order_id_counter: AtomicU64::new(1),
            tick_size: Decimal::ZERO,
            lot_size: Decimal::ZERO,
        }
    }

    /// Paper venue that prices off a live venue's order book.
    pub fn with_quote_source(name: impl Into<String>, source: Arc<dyn Venue>) -> Self {
        Self {
            quote_source: Some(source),
            ..Self::new(name)
        }
    }

    /// Contract rules reported when there is no quote source.
    pub fn with_contract_rules(mut self, tick_size: Decimal, lot_size: Decimal) -> Self {
        self.tick_size = tick_size;
        self.lot_size = lot_size;
        self
    }

    fn next_order_id(&self) -> u64 {
        self.order_id_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Replace the current book.
    pub async fn set_book(&self, contract: &str, bid: Decimal, ask: Decimal) {
        let mut state = self.state.write().await;
        state.books.insert(contract.to_string(), BookTop::new(bid, ask));
        state.match_resting(contract);
    }

    /// Queue a book to be served by a future quote read.
    ///
    /// Each read pops one entry; the last served book stays current.
    pub async fn push_book(&self, contract: &str, bid: Decimal, ask: Decimal) {
        self.state
            .write()
            .await
            .scripted_books
            .entry(contract.to_string())
            .or_default()
            .push_back(BookTop::new(bid, ask));
    }

    /// Queue an immediate partial fill for the next limit order placed.
    pub async fn push_fill(&self, contract: &str, size: Decimal) {
        self.state
            .write()
            .await
            .scripted_fills
            .entry(contract.to_string())
            .or_default()
            .push_back(size);
    }

    /// Make the next call of `op` fail with `error`.
    pub async fn fail_next(&self, op: PaperOp, error: VenueError) {
        self.state
            .write()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Force the position (e.g. a leftover from a previous session).
    pub async fn set_position(&self, contract: &str, size: Decimal) {
        self.state
            .write()
            .await
            .positions
            .insert(contract.to_string(), size);
    }

    /// Fill up to `size` of the oldest resting order at its own price.
    pub async fn fill_resting(&self, contract: &str, size: Decimal) -> Decimal {
        let mut state = self.state.write().await;
        let Some(order) = state.resting.get_mut(contract).and_then(|o| o.first_mut()) else {
            return Decimal::ZERO;
        };

        let filled = size.min(order.remaining);
        order.remaining -= filled;
        let (side, price, done) = (order.side, order.price, order.remaining <= Decimal::ZERO);
        if done {
            if let Some(orders) = state.resting.get_mut(contract) {
                orders.remove(0);
            }
        }
        state.apply_fill(contract, side, filled, price, true);
        filled
    }

    pub async fn position(&self, contract: &str) -> Decimal {
        self.state
            .read()
            .await
            .positions
            .get(contract)
            .copied()
            .unwrap_or_default()
    }

    pub async fn resting_orders(&self, contract: &str) -> Vec<RestingOrder> {
        self.state
            .read()
            .await
            .resting
            .get(contract)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.state.read().await.fills.clone()
    }

    pub async fn stats(&self) -> PaperStats {
        self.state.read().await.stats.clone()
    }

    /// Advance the book: scripted entry first, then the quote source.
    async fn refresh_book(&self, contract: &str) -> Result<BookTop, VenueError> {
        {
            let mut state = self.state.write().await;
            state.take_failure(PaperOp::BestBidAsk)?;
            let scripted = state
                .scripted_books
                .get_mut(contract)
                .and_then(VecDeque::pop_front);
            if let Some(book) = scripted {
                state.books.insert(contract.to_string(), book);
                state.match_resting(contract);
                return Ok(book);
            }
        }

        if let Some(source) = &self.quote_source {
            let book = source.best_bid_ask(contract).await?;
            let mut state = self.state.write().await;
            state.books.insert(contract.to_string(), book);
            state.match_resting(contract);
            return Ok(book);
        }

        self.state
            .read()
            .await
            .books
            .get(contract)
            .copied()
            .ok_or_else(|| VenueError::UnknownContract(format!("no paper book for {}", contract)))
    }
}

#[async_trait]
impl Venue for PaperVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contract_spec(&self, contract: &str) -> Result<ContractSpec, VenueError> {
        if let Some(source) = &self.quote_source {
            return source.contract_spec(contract).await;
        }
        Ok(ContractSpec {
            symbol: contract.to_string(),
            tick_size: self.tick_size,
            lot_size: self.lot_size,
        })
    }

    async fn best_bid_ask(&self, contract: &str) -> Result<BookTop, VenueError> {
        self.refresh_book(contract).await
    }

    async fn net_position(&self, contract: &str) -> Result<Decimal, VenueError> {
        let mut state = self.state.write().await;
        state.take_failure(PaperOp::NetPosition)?;
        Ok(state.positions.get(contract).copied().unwrap_or_default())
    }

    async fn cancel_all_orders(&self, contract: &str) -> Result<(), VenueError> {
        let mut state = self.state.write().await;
        state.take_failure(PaperOp::CancelAll)?;
        let cancelled = state.resting.remove(contract).map(|o| o.len()).unwrap_or(0);
        state.stats.cancels += cancelled as u64;
        if cancelled > 0 {
            debug!(venue = %self.name, %contract, cancelled, "Paper orders cancelled");
        }
        Ok(())
    }

    async fn place_limit_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
        post_only: bool,
    ) -> Result<OrderHandle, VenueError> {
        let mut state = self.state.write().await;
        state.take_failure(PaperOp::PlaceLimit)?;

        if size <= Decimal::ZERO {
            return Err(VenueError::Rejected(format!("invalid size {}", size)));
        }
        if post_only {
            if let Some(book) = state.books.get(contract) {
                let crosses = match side {
                    OrderSide::Buy => price >= book.ask,
                    OrderSide::Sell => price <= book.bid,
                };
                if crosses {
                    return Err(VenueError::Rejected(format!(
                        "post-only {} at {} would cross {:?}",
                        side, price, book
                    )));
                }
            }
        }

        let order_id = self.next_order_id();
        state.stats.limit_orders += 1;

        let scripted = state
            .scripted_fills
            .get_mut(contract)
            .and_then(VecDeque::pop_front)
            .map(|qty| qty.min(size))
            .unwrap_or_default();
        if scripted > Decimal::ZERO {
            state.apply_fill(contract, side, scripted, price, true);
        }

        let remaining = size - scripted;
        if remaining > Decimal::ZERO {
            let orders = state.resting.entry(contract.to_string()).or_default();
            orders.push(RestingOrder {
                order_id,
                side,
                price,
                remaining,
            });
            let resting = orders.len();
            state.stats.max_resting = state.stats.max_resting.max(resting);
        }

        debug!(venue = %self.name, %contract, order_id, side = %side, %size, %price, "Paper limit order");

        Ok(OrderHandle {
            order_id: order_id.to_string(),
            contract: contract.to_string(),
            side,
            size,
            price,
        })
    }

    async fn place_market_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        reduce_only: bool,
        client_order_id: &str,
    ) -> Result<FillConfirmation, VenueError> {
        if let Some(previous) = self.state.read().await.executed.get(client_order_id) {
            debug!(venue = %self.name, %client_order_id, "Duplicate market order ignored");
            return Ok(previous.clone());
        }

        let book = self.refresh_book(contract).await?;

        let mut state = self.state.write().await;
        state.take_failure(PaperOp::PlaceMarket)?;

        let position = state.positions.get(contract).copied().unwrap_or_default();
        let size = if reduce_only {
            if OrderSide::closing(position) != Some(side) {
                return Err(VenueError::Rejected(
                    "reduce-only order would increase position".to_string(),
                ));
            }
            size.min(position.abs())
        } else {
            size
        };

        let price = book.far_touch(side);
        state.stats.market_orders += 1;
        state.apply_fill(contract, side, size, price, false);

        let confirmation = FillConfirmation {
            order_id: self.next_order_id().to_string(),
            contract: contract.to_string(),
            side,
            size,
            avg_price: Some(price),
            timestamp: Utc::now(),
        };
        state
            .executed
            .insert(client_order_id.to_string(), confirmation.clone());
        Ok(confirmation)
    }
}
