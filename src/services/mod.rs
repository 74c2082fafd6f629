pub mod accounts;
pub mod audit;
pub mod catalog;
pub mod submissions;
pub mod webhook;
