//! Creo trail file validation.
//!
//! Checks generated trail text in four passes:
//!
//! 1. **Syntax**: every non-blank, non-`#` line must be one of
//!    ``~ Command `Name` ``, ``~ Activate `Name` ``,
//!    ``~ Input `v1` `v2` ...`` or `! text`.
//! 2. **Semantics**: every `~ Command` must name a command in the catalog.
//! 3. **Execution flow**: each command must run in one of the contexts its
//!    catalog entry requires. The context stack starts as `[startup]`;
//!    commands add and remove contexts as they run.
//! 4. **Parameters**: the first value of an `~ Input` line following a
//!    command that takes a numeric parameter must parse as a number.
//!
//! Default context transitions:
//!
//! ```text
//! startup ──DashboardActivate──► modeling ──Square/Circle/Rectangle──► sketch_active
//!                                                                         │
//!        ◄──DashboardAccept/FeatureDone── operation_pending ◄──Extrude────┘
//!             (clears sketch_active)
//! ```
//!
//! Validation only reports; it never rewrites the trail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Overall classification of a trail.
///
/// When several kinds of error are present the first in declaration order
/// (after `Valid`) wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    SyntaxError,
    SemanticError,
    ExecutionError,
    ParameterError,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationResult::Valid => "valid",
            ValidationResult::SyntaxError => "syntax_error",
            ValidationResult::SemanticError => "semantic_error",
            ValidationResult::ExecutionError => "execution_error",
            ValidationResult::ParameterError => "parameter_error",
        };
        f.write_str(s)
    }
}

/// Classification plus every error message found, in pass order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub result: ValidationResult,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.result == ValidationResult::Valid
    }
}

/// One parsed trail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailLine<'a> {
    Command(&'a str),
    Activate(&'a str),
    Input(Vec<&'a str>),
    Comment(&'a str),
}

/// A backtick-quoted value with at least one character and no backticks.
fn quoted(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix('`')?;
    let end = rest.find('`')?;
    if end == 0 {
        return None;
    }
    Some((&rest[..end], &rest[end + 1..]))
}

fn single_quoted(s: &str) -> Option<&str> {
    match quoted(s)? {
        (value, "") => Some(value),
        _ => None,
    }
}

impl<'a> TrailLine<'a> {
    /// Parses an already-trimmed line. Returns `None` when the line matches
    /// none of the four forms.
    pub fn parse(line: &'a str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix("~ Command ") {
            return single_quoted(rest).map(TrailLine::Command);
        }
        if let Some(rest) = line.strip_prefix("~ Activate ") {
            return single_quoted(rest).map(TrailLine::Activate);
        }
        if let Some(rest) = line.strip_prefix("~ Input ") {
            let (first, mut rest) = quoted(rest)?;
            let mut values = vec![first];
            while !rest.is_empty() {
                let (value, tail) = quoted(rest.strip_prefix(' ')?)?;
                values.push(value);
                rest = tail;
            }
            return Some(TrailLine::Input(values));
        }
        if let Some(text) = line.strip_prefix("! ") {
            if !text.is_empty() {
                return Some(TrailLine::Comment(text));
            }
        }
        None
    }
}

/// Initial context of every trail.
pub const STARTUP: &str = "startup";
/// A model is open.
pub const MODELING: &str = "modeling";
/// A sketch has been created and can be dimensioned or extruded.
pub const SKETCH_ACTIVE: &str = "sketch_active";
/// A feature dashboard is open and waiting for accept.
pub const OPERATION_PENDING: &str = "operation_pending";

/// Catalog entry for one Creo command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    /// The `~ Input` that follows must start with a number.
    #[serde(default)]
    pub numeric_parameter: bool,
    /// At least one of these must be on the context stack. Empty means any.
    #[serde(default)]
    pub contexts: Vec<String>,
    /// Context pushed after the command runs.
    #[serde(default)]
    pub enters: Option<String>,
    /// Contexts removed after the command runs.
    #[serde(default)]
    pub leaves: Vec<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            numeric_parameter: false,
            contexts: Vec::new(),
            enters: None,
            leaves: Vec::new(),
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            numeric_parameter: true,
            ..Self::new(name)
        }
    }

    /// Set the contexts the command may run in.
    pub fn requires(mut self, contexts: &[&str]) -> Self {
        self.contexts = contexts.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Set the context the command enters.
    pub fn enters(mut self, context: &str) -> Self {
        self.enters = Some(context.to_string());
        self
    }

    /// Set the contexts the command closes.
    pub fn leaves(mut self, contexts: &[&str]) -> Self {
        self.leaves = contexts.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Commands known to the validator by default.
pub fn default_catalog() -> Vec<CommandSpec> {
    let sketch = |name: &str| CommandSpec::new(name).requires(&[MODELING]).enters(SKETCH_ACTIVE);
    let accept = |name: &str| {
        CommandSpec::new(name)
            .requires(&[OPERATION_PENDING])
            .leaves(&[OPERATION_PENDING, SKETCH_ACTIVE])
    };
    let extrude = |name: &str| {
        CommandSpec::numeric(name)
            .requires(&[SKETCH_ACTIVE])
            .enters(OPERATION_PENDING)
    };

    vec![
        CommandSpec::new("ProCmdDashboardActivate")
            .requires(&[STARTUP, MODELING])
            .enters(MODELING),
        CommandSpec::new("ProCmdModelNew")
            .requires(&[MODELING])
            .enters(MODELING),
        extrude("ProCmdExtrudeDashboard"),
        extrude("ProCmdExtrude"),
        accept("ProCmdDashboardAccept"),
        accept("ProCmdFeatureDone"),
        sketch("ProCmdSquare"),
        sketch("ProCmdCircle"),
        sketch("ProCmdRectangle"),
        CommandSpec::numeric("ProCmdDimLinear").requires(&[SKETCH_ACTIVE]),
        CommandSpec::numeric("ProCmdDimDiameter").requires(&[SKETCH_ACTIVE]),
        CommandSpec::new("ProCmdSketchDone").requires(&[SKETCH_ACTIVE]),
    ]
}

/// Validates trail text against a command catalog.
#[derive(Debug, Clone)]
pub struct TrailValidator {
    catalog: HashMap<String, CommandSpec>,
}

impl Default for TrailValidator {
    fn default() -> Self {
        Self::with_catalog(default_catalog())
    }
}

impl TrailValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: impl IntoIterator<Item = CommandSpec>) -> Self {
        Self {
            catalog: catalog
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    /// Adds or replaces a catalog entry.
    pub fn register(&mut self, spec: CommandSpec) {
        self.catalog.insert(spec.name.clone(), spec);
    }

    pub fn is_known(&self, command: &str) -> bool {
        self.catalog.contains_key(command)
    }

    /// Runs all passes and classifies the trail.
    pub fn validate(&self, trail: &str) -> ValidationReport {
        let syntax = self.validate_syntax(trail);
        let semantic = self.validate_semantics(trail);
        let flow = self.validate_execution_flow(trail);
        let parameter = self.validate_parameters(trail);

        let result = if !syntax.is_empty() {
            ValidationResult::SyntaxError
        } else if !semantic.is_empty() {
            ValidationResult::SemanticError
        } else if !flow.is_empty() {
            ValidationResult::ExecutionError
        } else if !parameter.is_empty() {
            ValidationResult::ParameterError
        } else {
            ValidationResult::Valid
        };

        let errors: Vec<String> = syntax
            .into_iter()
            .chain(semantic)
            .chain(flow)
            .chain(parameter)
            .collect();
        if !errors.is_empty() {
            log::debug!("Trail failed validation ({}): {} errors", result, errors.len());
        }
        ValidationReport { result, errors }
    }

    pub fn validate_syntax(&self, trail: &str) -> Vec<String> {
        numbered_lines(trail)
            .filter(|(_, line)| TrailLine::parse(line).is_none())
            .map(|(n, line)| format!("Line {}: Invalid syntax format: {}", n, line))
            .collect()
    }

    pub fn validate_semantics(&self, trail: &str) -> Vec<String> {
        extract_commands(trail)
            .into_iter()
            .filter(|(_, name)| !self.is_known(name))
            .map(|(n, name)| format!("Line {}: Unknown command '{}'", n, name))
            .collect()
    }

    /// Replays the commands against the context stack. Unknown commands are
    /// left to the semantic pass and neither checked nor applied here.
    pub fn validate_execution_flow(&self, trail: &str) -> Vec<String> {
        let mut errors = Vec::new();
        let mut stack: Vec<String> = vec![STARTUP.to_string()];
        for (n, name) in extract_commands(trail) {
            let Some(spec) = self.catalog.get(&name) else {
                continue;
            };
            if !spec.contexts.is_empty() && !spec.contexts.iter().any(|c| stack.contains(c)) {
                errors.push(format!(
                    "Line {}: Command '{}' cannot be executed in context {:?}. Required: {:?}",
                    n, name, stack, spec.contexts
                ));
            }
            stack.retain(|c| !spec.leaves.contains(c));
            if let Some(context) = &spec.enters {
                if !stack.contains(context) {
                    stack.push(context.clone());
                }
            }
        }
        errors
    }

    pub fn validate_parameters(&self, trail: &str) -> Vec<String> {
        let mut errors = Vec::new();
        let mut expects_number = false;
        for (n, line) in numbered_lines(trail) {
            match TrailLine::parse(line) {
                Some(TrailLine::Command(name)) => {
                    expects_number = self
                        .catalog
                        .get(name)
                        .map(|spec| spec.numeric_parameter)
                        .unwrap_or(false);
                }
                Some(TrailLine::Input(values)) => {
                    if expects_number && values[0].trim().parse::<f64>().is_err() {
                        errors.push(format!(
                            "Line {}: Expected numeric value, got '{}'",
                            n, values[0]
                        ));
                    }
                    expects_number = false;
                }
                _ => {}
            }
        }
        errors
    }
}

/// 1-based line numbers over the trimmed trail, skipping blank and `#` lines.
fn numbered_lines(trail: &str) -> impl Iterator<Item = (usize, &str)> {
    trail
        .trim()
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// `(line_number, name)` for every ``~ Command `Name` `` line.
pub fn extract_commands(trail: &str) -> Vec<(usize, String)> {
    numbered_lines(trail)
        .filter_map(|(n, line)| match TrailLine::parse(line) {
            Some(TrailLine::Command(name)) => Some((n, name.to_string())),
            _ => None,
        })
        .collect()
}
