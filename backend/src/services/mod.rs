pub mod date_range;
pub mod prediction_cache;
pub mod prediction_service;
pub mod price_service;
pub mod report_service;
pub mod result_formatter;
pub mod trend_model;
