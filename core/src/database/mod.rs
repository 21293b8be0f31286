pub mod named_params;
pub mod postgres;
pub mod sql_value;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;
