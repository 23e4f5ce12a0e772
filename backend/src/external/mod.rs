pub mod coingecko;
pub mod cryptocompare;
pub mod price_provider;
