pub mod check;
pub mod convert;
pub mod guidance;
pub mod rates;
pub mod run;
