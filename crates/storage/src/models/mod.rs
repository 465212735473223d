mod category;
mod day_event;
mod day_session;
mod player;

pub use category::Category;
pub use day_event::DayEvent;
pub use day_session::{DAY_META_ID, DayMeta, DayState, PendingRevert, SessionRecord};
pub use player::Player;
