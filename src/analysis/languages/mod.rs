//! Language-specific front-end implementations.

mod java;

pub use java::JavaAnalyzer;

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static storage for the Java analyzer.
static JAVA_ANALYZER: OnceCell<JavaAnalyzer> = OnceCell::new();

/// Whether analyzers have been registered.
static REGISTERED: AtomicBool = AtomicBool::new(false);

/// Register all available language analyzers.
///
/// Idempotent; `get_analyzer` calls it on demand.
pub fn register_analyzers() {
    if REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }

    JAVA_ANALYZER.get_or_init(JavaAnalyzer::new);
}

/// Get an analyzer for the given file extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    register_analyzers();

    match ext {
        // get_or_init: another thread may have flipped REGISTERED first.
        "java" => Some(JAVA_ANALYZER.get_or_init(JavaAnalyzer::new) as &'static dyn LanguageAnalyzer),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_analyzer() {
        let analyzer = get_analyzer("java").unwrap();
        assert_eq!(analyzer.language_id(), "java");
        assert!(analyzer.handles_extension("java"));
        assert!(get_analyzer("kt").is_none());
    }
}
