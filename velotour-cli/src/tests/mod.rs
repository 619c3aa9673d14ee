//! Shared test harness modules for the Velotour CLI.

use super::*;

mod helpers;
