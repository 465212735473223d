pub mod aggregation;
pub mod day_session;
