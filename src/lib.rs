#![doc = include_str!("RUSTDOC.md")]

pub mod analytics;
pub mod logger;

#[cfg(test)]
pub mod test_support;
