mod price_point;
pub mod prediction;

pub use price_point::{PricePoint, PriceSeries};
pub use prediction::{
    Frequency, PredictionRecord, PredictionRequest, TrendMethod, MAX_PERIOD, MIN_PERIOD,
};
