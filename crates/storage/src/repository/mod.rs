pub mod category;
pub mod day;
pub mod leaderboard;
pub mod player;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::ledger::Record;

pub(crate) fn decode_all<T: DeserializeOwned>(records: &[Record]) -> Result<Vec<T>> {
    records.iter().map(Record::decode).collect()
}
