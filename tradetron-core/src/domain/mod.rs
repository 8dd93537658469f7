//! Domain types: bars, bar series and ticker reference data.

pub mod bar;
pub mod series;
pub mod ticker;

pub use bar::Bar;
pub use series::BarSeries;
pub use ticker::Ticker;
