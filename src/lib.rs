pub mod chat_prefs;
pub mod clients;
pub mod commands;
pub mod config;
pub mod currency;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod gamification;
pub mod logging;
pub mod pdf;
pub mod reminders;
pub mod runtime;
pub mod telegram;
pub mod web;
