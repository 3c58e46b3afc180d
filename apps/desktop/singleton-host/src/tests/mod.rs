mod config;
mod settings_file;
mod settings_state;
