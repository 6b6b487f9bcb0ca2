//! Interactive terminal dashboard

mod app;
pub mod theme;
pub mod widgets;
pub mod worker;

pub use app::run;
