//! Request authentication

pub mod operator_auth;
