//! Log-only backend.

use anyhow::Result;

use super::IndicatorBackend;
use crate::phase::BitPattern;

/// Prints each pattern as a row of lit and dark slices.
pub struct TerminalBackend {
    debug_enabled: bool,
}

impl TerminalBackend {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }
}

/// Draw a pattern left to right, `●` for lit and `○` for dark.
pub fn render(pattern: BitPattern) -> String {
    (0..6)
        .map(|i| if pattern.is_lit(i) { '●' } else { '○' })
        .collect()
}

impl IndicatorBackend for TerminalBackend {
    fn apply_pattern(&mut self, pattern: BitPattern) -> Result<()> {
        log_decorated!("LED arrangement: {} {}", pattern, render(pattern));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Terminal"
    }

    fn cleanup(self: Box<Self>, debug_enabled: bool) {
        if debug_enabled || self.debug_enabled {
            log_debug!("Terminal backend released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_orders_left_to_right() {
        assert_eq!(render(BitPattern::new(0b110000)), "●●○○○○");
        assert_eq!(render(BitPattern::OFF), "○○○○○○");
        assert_eq!(render(BitPattern::FULL), "●●●●●●");
    }

    #[test]
    fn test_apply_never_fails() {
        crate::logger::Log::set_enabled(false);
        let mut backend = TerminalBackend::new(false);
        assert!(backend.apply_pattern(BitPattern::new(0b001100)).is_ok());
        assert_eq!(backend.backend_name(), "Terminal");
    }
}
