//! Telegram bot that summarizes text messages and PDF/DOCX documents with the
//! `DeepSeek` chat completions API.
#![deny(missing_docs)]

/// Telegram transport layer
pub mod bot;
/// Configuration and settings
pub mod config;
/// Summarization client
pub mod llm;
/// Classification, extraction and progress composition
pub mod pipeline;
/// Dispatcher setup and application context
pub mod runner;
/// Text formatting helpers
pub mod utils;
