//! # Utilities Module
//!
//! ## Purpose
//! Common utility functions and helpers used throughout the retrieval engine
//! for text processing and performance monitoring.
//!
//! ## Input/Output Specification
//! - **Input**: Various data types requiring common operations
//! - **Output**: Processed data, performance metrics
//! - **Functions**: Text utilities, timing helpers

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

/// Text processing utilities
pub struct TextUtils;

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Get elapsed time in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

impl TextUtils {
    /// Truncate text to specified length with ellipsis
    pub fn truncate(text: &str, max_length: usize) -> String {
        if text.len() <= max_length {
            text.to_string()
        } else {
            let cut = max_length.saturating_sub(3);
            let boundary = text
                .char_indices()
                .take_while(|(i, _)| *i <= cut)
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            format!("{}...", &text[..boundary])
        }
    }

    /// Leading prefix of text, respecting char boundaries
    pub fn leading(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Count words in text
    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Generate text hash for chunk IDs and cache keys
    pub fn text_hash(text: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

/// Macro for timing code blocks
#[macro_export]
macro_rules! time_block {
    ($name:expr, $block:block) => {{
        let timer = $crate::utils::Timer::new($name);
        let result = $block;
        timer.stop();
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_truncate() {
        assert_eq!(TextUtils::truncate("Hello world", 20), "Hello world");
        assert_eq!(TextUtils::truncate("This is a very long text", 10), "This is...");
    }

    #[test]
    fn test_leading() {
        assert_eq!(TextUtils::leading("abcdef", 3), "abc");
        assert_eq!(TextUtils::leading("ab", 10), "ab");
    }

    #[test]
    fn test_text_hash_is_deterministic() {
        let a = TextUtils::text_hash("doc1:0:Diabetes is a chronic condition");
        let b = TextUtils::text_hash("doc1:0:Diabetes is a chronic condition");
        assert_eq!(a, b);
        let c = TextUtils::text_hash("doc1:1:Diabetes is a chronic condition");
        assert_ne!(a, c);
    }
}
