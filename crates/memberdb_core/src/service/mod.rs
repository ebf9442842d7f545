//! Use-case services that sit between callers and repositories.

pub mod member_service;
