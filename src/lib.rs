//! Parking-yard device-state synchronization.
//!
//! Sensor devices publish spot occupancy over MQTT; the listener keeps
//! one canonical row per device in the relational store, and operators
//! push commands back to individual devices over the same broker.

pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod mqtt;
