//! Application services layer: backend selection and operation dispatch.

pub mod dispatch;
pub mod error;
pub mod repos;
pub mod selector;
