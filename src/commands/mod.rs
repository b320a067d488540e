pub mod generate;
pub mod key;
pub mod quiz;
