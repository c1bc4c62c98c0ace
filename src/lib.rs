// src/lib.rs
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod market;
pub mod models;
