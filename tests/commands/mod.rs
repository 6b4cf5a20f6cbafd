//! Command-level tests

mod test_download;
mod test_init_session;
mod test_report;
