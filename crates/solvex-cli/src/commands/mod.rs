pub mod data;
pub mod describe;
pub mod optimize;
pub mod prepare;
pub mod train;
