// =============================================================================
// Company selection list
// =============================================================================
//
// The dashboard only offers a fixed set of large-cap US names. The first entry
// is the default selection.
// =============================================================================

use serde::Serialize;

/// A selectable company and its exchange ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Company {
    pub name: &'static str,
    pub ticker: &'static str,
}

const COMPANIES: &[Company] = &[
    Company { name: "Apple Inc.", ticker: "AAPL" },
    Company { name: "Microsoft Corporation", ticker: "MSFT" },
    Company { name: "Amazon.com Inc.", ticker: "AMZN" },
    Company { name: "Alphabet Inc. (Google)", ticker: "GOOGL" },
    Company { name: "Tesla Inc.", ticker: "TSLA" },
    Company { name: "Meta Platforms Inc.", ticker: "META" },
    Company { name: "NVIDIA Corporation", ticker: "NVDA" },
    Company { name: "Netflix Inc.", ticker: "NFLX" },
    Company { name: "JPMorgan Chase & Co.", ticker: "JPM" },
    Company { name: "Johnson & Johnson", ticker: "JNJ" },
    Company { name: "Procter & Gamble Co.", ticker: "PG" },
    Company { name: "Visa Inc.", ticker: "V" },
    Company { name: "Mastercard Inc.", ticker: "MA" },
    Company { name: "Coca-Cola Company", ticker: "KO" },
    Company { name: "Walt Disney Company", ticker: "DIS" },
    Company { name: "Nike Inc.", ticker: "NKE" },
    Company { name: "McDonald's Corporation", ticker: "MCD" },
    Company { name: "Intel Corporation", ticker: "INTC" },
    Company { name: "Cisco Systems Inc.", ticker: "CSCO" },
    Company { name: "IBM Corporation", ticker: "IBM" },
];

/// All selectable companies in display order.
pub fn all() -> &'static [Company] {
    COMPANIES
}

/// The company selected when the page first loads.
pub fn default_company() -> Company {
    COMPANIES[0]
}

/// Case-insensitive ticker lookup.
pub fn by_ticker(ticker: &str) -> Option<Company> {
    let wanted = ticker.trim();
    COMPANIES
        .iter()
        .copied()
        .find(|c| c.ticker.eq_ignore_ascii_case(wanted))
}
