//! Compiler configuration.
//!
//! Small, builder-style configuration bag for the default optimization
//! pipeline and the constants the LLVM lowering interface (`llvm.rs`)
//! needs. Mirrors the shape of a typical `CompilerConfig` builder: plain
//! fields, `with_*` methods returning `Self`, a `default()` baseline.

/// Toggles for `analysis::run_default_pipeline`.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Constant folding + algebraic identities + strength reduction.
    pub fold: bool,
    /// Print-string coalescing.
    pub coalesce_strings: bool,
    /// Single-entry block joining.
    pub join_blocks: bool,
    /// Optional post-join `Call(L); Ret` -> `Jmp(L)` canonicalization.
    pub canonicalize_tail_calls: bool,
    /// Entry function name emitted by the LLVM lowering interface.
    pub entry_function: String,
    /// Maximum stack depth the generated `check_stack` calls assume —
    /// forwarded into `llvm::GlobalsLayout`.
    pub max_stack: u32,
    /// Maximum call-stack depth, likewise forwarded into the globals layout.
    pub max_call_stack: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            fold: true,
            coalesce_strings: true,
            join_blocks: true,
            canonicalize_tail_calls: false,
            entry_function: "main".to_string(),
            max_stack: 1 << 16,
            max_call_stack: 1 << 12,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_fold(mut self, enabled: bool) -> Self {
        self.fold = enabled;
        self
    }

    pub fn with_coalesce_strings(mut self, enabled: bool) -> Self {
        self.coalesce_strings = enabled;
        self
    }

    pub fn with_join_blocks(mut self, enabled: bool) -> Self {
        self.join_blocks = enabled;
        self
    }

    pub fn with_canonicalize_tail_calls(mut self, enabled: bool) -> Self {
        self.canonicalize_tail_calls = enabled;
        self
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_the_safe_passes() {
        let config = CompilerConfig::default();
        assert!(config.fold);
        assert!(config.coalesce_strings);
        assert!(config.join_blocks);
        assert!(!config.canonicalize_tail_calls);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = CompilerConfig::new()
            .with_fold(false)
            .with_max_stack(256);
        assert!(!config.fold);
        assert_eq!(config.max_stack, 256);
    }
}
