//! Domain result type

pub type Result<T> = std::result::Result<T, crate::domain::shared::error::DomainError>;
