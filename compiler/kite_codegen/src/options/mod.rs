//! Code generator configuration.
//!
//! Options default to the conventions of the target runtime and can be
//! overridden through environment variables:
//!
//! - `KITE_CLASS_SEPARATOR` - first character separates segments of
//!   generated class names (default `$`)
//! - `KITE_VERIFY_CONTEXTS` - `1`/`true` re-checks every parent chain when
//!   a context is discarded (default: on in debug builds)

/// Configuration for context-tree construction and class naming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Separator between segments of generated class names.
    pub class_name_separator: char,
    /// Verify the whole context tree every time a context is discarded.
    pub verify_tree_on_pop: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            class_name_separator: '$',
            verify_tree_on_pop: cfg!(debug_assertions),
        }
    }
}

impl CodegenOptions {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, falling back to defaults for unset
    /// or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(separator) = lookup("KITE_CLASS_SEPARATOR").and_then(|v| v.chars().next()) {
            options.class_name_separator = separator;
        }

        if let Some(verify) = lookup("KITE_VERIFY_CONTEXTS").and_then(|v| parse_flag(&v)) {
            options.verify_tree_on_pop = verify;
        }

        tracing::debug!(?options, "codegen options");
        options
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
