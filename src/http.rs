//! HTTP loaders for JWKS retrieval.

pub mod jwks;
