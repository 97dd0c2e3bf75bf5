//! Market universes — named ticker lists to scan.
//!
//! A universe is a TOML file with a `[markets]` table mapping a market name
//! to its tickers. The built-in universe carries the FTSE MIB, DAX and
//! S&P 500 large-cap lists.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const FTSE_MIB: &str = "FTSE MIB";
pub const DAX: &str = "DAX";
pub const SP500_LARGE_CAPS: &str = "S&P 500 Large Caps";

const FTSE_MIB_TICKERS: &[&str] = &[
    "UCG.MI", "ISP.MI", "ENI.MI", "ENEL.MI", "TIT.MI", "STM.MI", "G.MI", "RACE.MI", "ATL.MI",
    "STLAM.MI", "BAMI.MI", "CPR.MI", "MB.MI", "TEN.MI", "CNHI.MI", "AZM.MI", "BMED.MI", "SPM.MI",
    "BGN.MI", "MONC.MI", "SRG.MI", "PST.MI", "PRY.MI", "REC.MI", "AMP.MI", "DIA.MI", "FBK.MI",
    "HER.MI", "IP.MI", "LDO.MI", "NEX.MI", "IG.MI", "TEL.MI", "TRN.MI", "UNI.MI", "US.MI",
];

const DAX_TICKERS: &[&str] = &[
    "SIE.DE", "SAP.DE", "ALV.DE", "DTE.DE", "VOW3.DE", "BAS.DE", "BMW.DE", "ADS.DE", "MUV2.DE",
    "BAYN.DE", "DAI.DE", "DB1.DE", "DBK.DE", "HEN3.DE", "IFX.DE", "MRK.DE", "RWE.DE", "HEI.DE",
    "VNA.DE", "SHL.DE", "BEI.DE", "CON.DE", "FRE.DE", "PAH3.DE", "ZAL.DE", "DHER.DE", "EOAN.DE",
    "1COV.DE", "PUM.DE", "QIA.DE",
];

const SP500_LARGE_CAP_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "BRK-B", "V", "UNH", "JNJ", "WMT",
    "XOM", "JPM", "MA", "PG", "AVGO", "HD", "CVX", "MRK", "ABBV", "KO", "PEP", "COST", "BAC",
    "ADBE", "CRM", "MCD", "CSCO", "ACN", "TMO", "LIN", "NFLX", "NKE", "DIS", "ABT", "WFC", "AMD",
    "CMCSA", "VZ", "DHR", "INTC", "TXN", "PM", "NEE", "RTX", "UNP", "UPS", "AMGN", "HON", "QCOM",
    "LOW", "BMY", "T", "SPGI", "SBUX", "BA", "IBM", "GE", "CAT", "INTU", "DE", "AMAT", "BKNG",
    "MDT", "BLK", "ADP", "CI", "GILD", "MMC", "PLD", "MDLZ", "TJX", "SYK", "ADI", "CVS", "REGN",
    "CB",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub markets: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    /// The three built-in markets.
    pub fn builtin() -> Self {
        let to_owned = |list: &[&str]| list.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let mut markets = BTreeMap::new();
        markets.insert(FTSE_MIB.to_string(), to_owned(FTSE_MIB_TICKERS));
        markets.insert(DAX.to_string(), to_owned(DAX_TICKERS));
        markets.insert(SP500_LARGE_CAPS.to_string(), to_owned(SP500_LARGE_CAP_TICKERS));
        Self { markets }
    }

    pub fn market_names(&self) -> Vec<&str> {
        self.markets.keys().map(|s| s.as_str()).collect()
    }

    /// Tickers of one market. Names match case-insensitively.
    pub fn market(&self, name: &str) -> Option<&[String]> {
        self.markets
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    pub fn ticker_count(&self) -> usize {
        self.markets.values().map(|v| v.len()).sum()
    }

    /// Concatenate the named markets in the order given, keeping the first
    /// occurrence of a ticker that appears more than once.
    pub fn select(&self, names: &[impl AsRef<str>]) -> Result<Vec<String>, String> {
        let mut seen = HashSet::new();
        let mut tickers = Vec::new();
        for name in names {
            let name = name.as_ref();
            let list = self.market(name).ok_or_else(|| {
                format!(
                    "unknown market '{name}' (available: {})",
                    self.market_names().join(", ")
                )
            })?;
            for ticker in list {
                if seen.insert(ticker.as_str()) {
                    tickers.push(ticker.clone());
                }
            }
        }
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_three_markets() {
        let u = Universe::builtin();
        assert_eq!(u.market_names().len(), 3);
        assert_eq!(u.market(FTSE_MIB).unwrap().len(), 36);
        assert_eq!(u.market(DAX).unwrap().len(), 30);
        assert!(u.market(SP500_LARGE_CAPS).unwrap().contains(&"BRK-B".to_string()));
    }

    #[test]
    fn market_lookup_ignores_case() {
        let u = Universe::builtin();
        assert!(u.market("dax").is_some());
        assert!(u.market("ftse mib").is_some());
        assert!(u.market("nikkei").is_none());
    }

    #[test]
    fn select_preserves_requested_order() {
        let u = Universe::builtin();
        let tickers = u.select(&[DAX, FTSE_MIB]).unwrap();
        assert_eq!(tickers.len(), 66);
        assert_eq!(tickers[0], "SIE.DE");
        assert_eq!(tickers[30], "UCG.MI");
    }

    #[test]
    fn select_drops_duplicates() {
        let u = Universe::builtin();
        let tickers = u.select(&[DAX, DAX]).unwrap();
        assert_eq!(tickers.len(), 30);
    }

    #[test]
    fn select_unknown_market_fails() {
        let err = Universe::builtin().select(&["Nikkei"]).unwrap_err();
        assert!(err.contains("Nikkei"));
        assert!(err.contains("DAX"));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::builtin();
        let parsed = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u, parsed);
    }

    #[test]
    fn custom_universe_from_toml() {
        let u = Universe::from_toml(
            r#"
            [markets]
            Watchlist = ["AAPL", "ENI.MI"]
            "#,
        )
        .unwrap();
        assert_eq!(u.select(&["watchlist"]).unwrap(), vec!["AAPL", "ENI.MI"]);
    }
}
