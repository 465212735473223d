pub mod categories;
pub mod day;
pub mod leaderboard;
pub mod players;
