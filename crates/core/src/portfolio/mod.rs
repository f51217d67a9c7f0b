//! Portfolio file: `{"stocks": [{"symbol": "AAPL", "weight": 0.6}, ...], "email": "me@example.com"}`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

pub const DEFAULT_PATH: &str = "config/portfolio.json";
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-2;
const MAX_SYMBOL_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioFile {
    pub stocks: Vec<HoldingEntry>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingEntry {
    pub symbol: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub weight: f64,
}

/// Validated portfolio. Holdings keep file order.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub email: Option<String>,
}

impl Portfolio {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: PortfolioFile = serde_json::from_str(text)?;
        file.validate()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.holdings.iter().map(|h| h.symbol.as_str())
    }
}

impl PortfolioFile {
    pub fn validate(self) -> Result<Portfolio, ConfigError> {
        if self.stocks.is_empty() {
            return Err(ConfigError::EmptyPortfolio);
        }

        let mut seen = BTreeSet::new();
        let mut holdings = Vec::with_capacity(self.stocks.len());
        for entry in self.stocks {
            let symbol = normalize_symbol(&entry.symbol)?;
            if !(entry.weight.is_finite() && entry.weight > 0.0 && entry.weight <= 1.0) {
                return Err(ConfigError::InvalidWeight {
                    symbol,
                    weight: entry.weight,
                });
            }
            if !seen.insert(symbol.clone()) {
                return Err(ConfigError::DuplicateSymbol(symbol));
            }
            holdings.push(Holding {
                symbol,
                weight: entry.weight,
            });
        }

        let total: f64 = holdings.iter().map(|h| h.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum(total));
        }

        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(e) = email.as_deref() {
            if !looks_like_email(e) {
                return Err(ConfigError::InvalidEmail(e.to_string()));
            }
        }

        Ok(Portfolio { holdings, email })
    }
}

/// Trims and upper-cases; accepts tickers like `BRK.B`, `RDS-A`, `^GSPC`.
pub fn normalize_symbol(raw: &str) -> Result<String, ConfigError> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '^')
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(symbol)
    } else {
        Err(ConfigError::InvalidSymbol(raw.to_string()))
    }
}

pub fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .rsplit_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
}

pub fn sample() -> PortfolioFile {
    let stocks = [
        ("NVDA", 0.321),
        ("PLTR", 0.210),
        ("SMCI", 0.126),
        ("SNAP", 0.088),
        ("RIVN", 0.088),
        ("AAPL", 0.059),
        ("GOOGL", 0.045),
        ("MSFT", 0.023),
        ("AMD", 0.014),
        ("TSLA", 0.014),
        ("AMZN", 0.007),
        ("COIN", 0.005),
    ]
    .into_iter()
    .map(|(symbol, weight)| HoldingEntry {
        symbol: symbol.to_string(),
        weight,
    })
    .collect();

    PortfolioFile {
        stocks,
        email: Some("your-email@example.com".to_string()),
    }
}

/// Writes [`sample`] to `path`, creating parent directories.
pub fn write_sample(path: &Path, overwrite: bool) -> anyhow::Result<()> {
    use anyhow::Context;

    anyhow::ensure!(
        overwrite || !path.exists(),
        "{} already exists (pass --force to overwrite)",
        path.display()
    );
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(&sample())?;
    std::fs::write(path, body + "\n")
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
