pub mod config;
pub mod controller;
pub mod datasource;
pub mod domain;
pub mod export;
pub mod filter;
pub mod inputter;
pub mod inventory;
pub mod model;
pub mod record;
pub mod ui;
