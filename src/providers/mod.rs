pub mod exchangerate_host;

pub use exchangerate_host::{ANCHOR_CURRENCY, ExchangeRateHostProvider};
