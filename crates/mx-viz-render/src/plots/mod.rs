pub mod event_study;
pub mod pretrends;

mod axes_draw;
