//! Integration tests against real temporary git repositories

mod helpers;
mod test_cli;
mod test_detect;
mod test_system_git;
