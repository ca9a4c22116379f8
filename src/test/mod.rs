mod config;
mod receiver;
mod tick;
mod viz;
