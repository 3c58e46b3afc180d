// End-to-end tests: local server + settings actor + settings file.
#![cfg(unix)]

mod proxy_handover;
