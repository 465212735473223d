pub mod category;
pub mod day;
pub mod leaderboard;
pub mod player;
