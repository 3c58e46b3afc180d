mod config;
mod proxy;
mod support;
