use std::collections::HashMap;

/// Whether a macro takes a parenthesized argument list. A function-like
/// macro of arity zero (`#define NAME()`) is a distinct flavor from an
/// object-like macro even though both are invoked without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroFlavor {
    ObjectLike,
    FunctionLike,
}

/// A defined macro. `body` holds the replacement list as already-collapsed
/// text (no leading/trailing newline, no leading horizontal whitespace, a
/// single space standing in for any run of whitespace between tokens) —
/// re-readable by a fresh tokenizer whenever the macro is expanded.
#[derive(Debug, Clone)]
pub struct Macro {
    pub flavor: MacroFlavor,
    pub parameters: Vec<String>,
    pub body: String,
}

impl Macro {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p == name)
    }
}

/// Name → [`Macro`] mapping. Redefining an existing name is legal — it
/// just replaces the old binding — the stricter "identical replacement
/// list" check some preprocessors perform is intentionally not done here.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `macro_` under `name`, returning the macro it replaced, if
    /// any. Callers use the `Some` case to decide whether to emit a
    /// redefinition warning.
    pub fn define(&mut self, name: impl Into<String>, macro_: Macro) -> Option<Macro> {
        self.macros.insert(name.into(), macro_)
    }

    /// Removes the binding for `name`, if present. Returns whether a
    /// binding existed.
    pub fn undef(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_like(body: &str) -> Macro {
        Macro {
            flavor: MacroFlavor::ObjectLike,
            parameters: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn define_then_undef_round_trips() {
        let mut table = MacroTable::new();
        assert!(table.define("X", object_like("42")).is_none());
        assert!(table.is_defined("X"));
        assert!(table.undef("X"));
        assert!(!table.is_defined("X"));
        assert!(!table.undef("X"));
    }

    #[test]
    fn redefinition_replaces_and_reports_previous() {
        let mut table = MacroTable::new();
        table.define("X", object_like("1"));
        let previous = table.define("X", object_like("2"));
        assert!(previous.is_some());
        assert_eq!(table.get("X").unwrap().body, "2");
    }

    #[test]
    fn zero_arity_function_like_is_distinct_from_object_like() {
        let mut table = MacroTable::new();
        table.define(
            "F",
            Macro {
                flavor: MacroFlavor::FunctionLike,
                parameters: Vec::new(),
                body: "1".into(),
            },
        );
        assert_eq!(table.get("F").unwrap().flavor, MacroFlavor::FunctionLike);
    }
}
