//! Rule-table serialization.

pub mod csv;
