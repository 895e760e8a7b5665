//! SeaORM entity definitions

pub mod lease;
