pub mod api;
pub mod config;
pub mod downloader;
pub mod humanize;
pub mod manager;
pub mod observability;
pub mod storage;
pub mod tasks;
