pub mod config;
pub mod db;
pub mod search;
pub mod services;
pub mod web;
