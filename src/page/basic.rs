//! Plain page with default behavior.

use super::PageHandler;

/// Handler with every default: renders its title, `NEXT` completes and
/// advances, `PREVIOUS` retreats.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicPage;

impl PageHandler for BasicPage {}
