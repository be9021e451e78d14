use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listing venue of a stock symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "NASDAQ")]
    Nasdaq,
    #[serde(rename = "NYSE")]
    Nyse,
    #[serde(rename = "NYSEAMERICAN")]
    NyseAmerican,
    #[serde(rename = "NYSEARCA")]
    NyseArca,
    #[serde(rename = "BATS")]
    Bats,
    #[serde(rename = "IEX")]
    Iex,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nasdaq => "NASDAQ",
            Exchange::Nyse => "NYSE",
            Exchange::NyseAmerican => "NYSEAMERICAN",
            Exchange::NyseArca => "NYSEARCA",
            Exchange::Bats => "BATS",
            Exchange::Iex => "IEX",
        }
    }

    /// Map the single-letter code used by `otherlisted.txt`
    pub fn from_other_listed_code(code: &str) -> Option<Self> {
        match code.trim() {
            "N" => Some(Exchange::Nyse),
            "A" => Some(Exchange::NyseAmerican),
            "P" => Some(Exchange::NyseArca),
            "Z" => Some(Exchange::Bats),
            "V" => Some(Exchange::Iex),
            _ => None,
        }
    }
}

impl FromStr for Exchange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '_', '-'], "").as_str() {
            "NASDAQ" => Ok(Exchange::Nasdaq),
            "NYSE" => Ok(Exchange::Nyse),
            "NYSEAMERICAN" | "NYSEMKT" | "AMEX" => Ok(Exchange::NyseAmerican),
            "NYSEARCA" | "ARCA" => Ok(Exchange::NyseArca),
            "BATS" | "CBOE" => Ok(Exchange::Bats),
            "IEX" => Ok(Exchange::Iex),
            other => Err(AppError::InvalidInput(format!("Unknown exchange: {}", other))),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the stock list file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedStock {
    pub symbol: String,
    pub name: String,
    pub exchange: Exchange,
    pub is_etf: bool,
}

/// Row of `nasdaqlisted.txt`
#[derive(Debug, Deserialize)]
pub struct RawNasdaqListed {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Security Name")]
    pub security_name: String,
    #[serde(rename = "Test Issue")]
    pub test_issue: String,
    #[serde(rename = "ETF")]
    pub etf: String,
}

/// Row of `otherlisted.txt`
#[derive(Debug, Deserialize)]
pub struct RawOtherListed {
    #[serde(rename = "ACT Symbol")]
    pub symbol: String,
    #[serde(rename = "Security Name")]
    pub security_name: String,
    #[serde(rename = "Exchange")]
    pub exchange: String,
    #[serde(rename = "ETF")]
    pub etf: String,
    #[serde(rename = "Test Issue")]
    pub test_issue: String,
}

/// Intermediate listing before filters are applied
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub stock: ListedStock,
    pub is_test_issue: bool,
}

impl RawNasdaqListed {
    pub fn to_entry(&self) -> ListingEntry {
        ListingEntry {
            stock: ListedStock {
                symbol: self.symbol.trim().to_string(),
                name: self.security_name.trim().to_string(),
                exchange: Exchange::Nasdaq,
                is_etf: is_flag_set(&self.etf),
            },
            is_test_issue: is_flag_set(&self.test_issue),
        }
    }
}

impl RawOtherListed {
    pub fn to_entry(&self) -> Option<ListingEntry> {
        let exchange = Exchange::from_other_listed_code(&self.exchange)?;
        Some(ListingEntry {
            stock: ListedStock {
                symbol: self.symbol.trim().to_string(),
                name: self.security_name.trim().to_string(),
                exchange,
                is_etf: is_flag_set(&self.etf),
            },
            is_test_issue: is_flag_set(&self.test_issue),
        })
    }
}

fn is_flag_set(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("Y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_parsing() {
        assert_eq!("nasdaq".parse::<Exchange>().unwrap(), Exchange::Nasdaq);
        assert_eq!("NYSE American".parse::<Exchange>().unwrap(), Exchange::NyseAmerican);
        assert_eq!("nyse-arca".parse::<Exchange>().unwrap(), Exchange::NyseArca);
        assert!("LSE".parse::<Exchange>().is_err());
        assert_eq!(Exchange::from_other_listed_code("P"), Some(Exchange::NyseArca));
        assert_eq!(Exchange::from_other_listed_code("Q"), None);
    }
}
