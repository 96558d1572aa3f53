//! A small share-trading game used to drive sessions in tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use session::Game;
use state_kernel::{
    IntegerState, MapState, Ownable, OwnableItem, Portfolio, StateError, StateManager, Wallet,
    WalletSet,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub players: Vec<String>,
    pub companies: Vec<String>,
    pub starting_cash: i64,
    pub shares_per_company: i64,
    pub par_price: i64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            players: vec!["alice".into(), "bob".into()],
            companies: vec!["B&O".into(), "PRR".into()],
            starting_cash: 300,
            shares_per_company: 4,
            par_price: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Trade {
    Buy { player: usize, company: String },
    Sell { player: usize, company: String },
    Pass { player: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("player {0} does not exist")]
    UnknownPlayer(usize),
    #[error("company {0} does not exist")]
    UnknownCompany(String),
    #[error("no {0} shares left in the pool")]
    SoldOut(String),
    #[error("{player} holds no {company} shares")]
    NotHeld { player: String, company: String },
    #[error("{player} needs {needed} but has {available}")]
    InsufficientCash {
        player: String,
        needed: i64,
        available: i64,
    },
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub bank: i64,
    pub cash: Vec<i64>,
    pub holdings: Vec<Vec<(String, i64)>>,
    pub pool: Vec<(String, i64)>,
    pub prices: BTreeMap<String, i64>,
    /// President of each company, if any.
    pub presidents: Vec<Option<String>>,
    pub passes: i64,
}

pub struct Market {
    players: Vec<String>,
    bank: Wallet,
    cash: Vec<Wallet>,
    holdings: Vec<WalletSet<String>>,
    pool: WalletSet<String>,
    prices: MapState<String, i64>,
    charters: Vec<OwnableItem>,
    ipo: Portfolio<OwnableItem>,
    desks: Vec<Portfolio<OwnableItem>>,
    passes: IntegerState,
}

impl Market {
    fn player(&self, index: usize) -> Result<&str, TradeError> {
        self.players
            .get(index)
            .map(String::as_str)
            .ok_or(TradeError::UnknownPlayer(index))
    }

    fn company(&self, name: &str) -> Result<usize, TradeError> {
        self.charters
            .iter()
            .position(|charter| charter.id() == name)
            .ok_or_else(|| TradeError::UnknownCompany(name.to_string()))
    }

    pub fn cash(&self, player: usize) -> i64 {
        self.cash[player].value()
    }

    pub fn shares(&self, player: usize, company: &str) -> i64 {
        self.holdings[player].value_of(&company.to_string())
    }

    pub fn president(&self, company: &str) -> Option<String> {
        let index = self.company(company).ok()?;
        self.charters[index]
            .owner()
            .filter(|desk| *desk != self.ipo)
            .map(|desk| desk.owner().to_string())
    }

    pub fn price(&self, company: &str) -> Option<i64> {
        self.prices.get(&company.to_string())
    }

    pub fn cash_cell(&self, player: usize) -> &IntegerState {
        self.cash[player].balance()
    }
}

impl Game for Market {
    type Config = MarketConfig;
    type Action = Trade;
    type Snapshot = MarketSnapshot;
    type Error = TradeError;

    fn build(config: &MarketConfig, manager: &StateManager) -> Result<Self, TradeError> {
        let bank = Wallet::new(manager, "bank.cash", "bank", 10_000)?;
        let pool = WalletSet::new(manager, "pool.shares", "pool")?;
        let prices = MapState::new(manager, "prices")?;
        let ipo = Portfolio::new(manager, "ipo.charters", "ipo")?;
        let passes = IntegerState::new(manager, "passes", 0)?;

        let mut cash = Vec::new();
        let mut holdings = Vec::new();
        let mut desks = Vec::new();
        for name in &config.players {
            let wallet = Wallet::new(manager, format!("{name}.cash"), name.clone(), 0)?;
            bank.transfer(config.starting_cash, &wallet);
            cash.push(wallet);
            holdings.push(WalletSet::new(manager, format!("{name}.shares"), name.clone())?);
            desks.push(Portfolio::new(manager, format!("{name}.charters"), name.clone())?);
        }

        let mut charters = Vec::new();
        for company in &config.companies {
            pool.change(company.clone(), config.shares_per_company);
            prices.put(company.clone(), config.par_price);
            let charter = OwnableItem::new(company.clone());
            charter.move_to(&ipo);
            charters.push(charter);
        }

        Ok(Self {
            players: config.players.clone(),
            bank,
            cash,
            holdings,
            pool,
            prices,
            charters,
            ipo,
            desks,
            passes,
        })
    }

    fn process(&mut self, action: &Trade) -> Result<(), TradeError> {
        match action {
            Trade::Buy { player, company } => {
                let name = self.player(*player)?.to_string();
                let charter = self.company(company)?;
                if self.pool.value_of(company) == 0 {
                    return Err(TradeError::SoldOut(company.clone()));
                }
                let price = self.price(company).unwrap_or_default();

                // shares move before payment is checked; a failed payment is
                // rolled back by the session
                self.pool.transfer(company.clone(), 1, &self.holdings[*player]);
                if self.charters[charter].owner().as_ref() == Some(&self.ipo) {
                    self.charters[charter].move_to(&self.desks[*player]);
                }
                let available = self.cash(*player);
                if available < price {
                    return Err(TradeError::InsufficientCash {
                        player: name,
                        needed: price,
                        available,
                    });
                }
                self.cash[*player].transfer(price, &self.bank);
                self.prices.put(company.clone(), price + 10);
                self.passes.set(0);
            }
            Trade::Sell { player, company } => {
                let name = self.player(*player)?.to_string();
                self.company(company)?;
                if self.shares(*player, company) == 0 {
                    return Err(TradeError::NotHeld {
                        player: name,
                        company: company.clone(),
                    });
                }
                let price = self.price(company).unwrap_or_default();
                self.holdings[*player].transfer(company.clone(), 1, &self.pool);
                self.bank.transfer(price, &self.cash[*player]);
                self.prices.put(company.clone(), (price - 10).max(10));
                self.passes.set(0);
            }
            Trade::Pass { player } => {
                self.player(*player)?;
                self.passes.add(1);
            }
        }
        Ok(())
    }

    fn label(action: &Trade) -> String {
        match action {
            Trade::Buy { player, company } => format!("player {player} buys {company}"),
            Trade::Sell { player, company } => format!("player {player} sells {company}"),
            Trade::Pass { player } => format!("player {player} passes"),
        }
    }

    fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            bank: self.bank.value(),
            cash: self.cash.iter().map(Wallet::value).collect(),
            holdings: self.holdings.iter().map(WalletSet::view).collect(),
            pool: self.pool.view(),
            prices: self.prices.view(),
            presidents: self
                .charters
                .iter()
                .map(|charter| charter.owner().map(|desk| desk.owner().to_string()))
                .collect(),
            passes: self.passes.value(),
        }
    }
}

pub fn buy(player: usize, company: &str) -> Trade {
    Trade::Buy {
        player,
        company: company.to_string(),
    }
}

pub fn sell(player: usize, company: &str) -> Trade {
    Trade::Sell {
        player,
        company: company.to_string(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
