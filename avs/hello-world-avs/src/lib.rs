pub mod avs;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod operator;
pub mod registration;

#[cfg(test)]
pub(crate) mod test_utils;
