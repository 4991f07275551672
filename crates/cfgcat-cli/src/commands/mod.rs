pub mod areas;
pub mod check;
pub mod kinds;
