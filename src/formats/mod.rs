pub mod dat;
pub mod spr;
