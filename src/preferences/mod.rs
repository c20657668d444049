mod aggregator;
mod profile;

pub use aggregator::apply;
pub use profile::{MealHistoryEntry, UserProfile};
