//! The dictionary/case collaborators spec.md §6.2 calls out as the codec's
//! opaque containers. Nothing outside this module and [`crate::reader`]/
//! [`crate::writer`] needs to know how a variable's on-disk bytes are
//! framed -- this is the crate-native, already-resolved shape a caller
//! builds a [`Dictionary`] in before writing, or receives one in after
//! reading.

use indexmap::IndexMap;

use crate::constants::{Alignment, Measure, SpssFormat, VarType};
use crate::error::{Result, SpssError};

/// A single cell value: either the variable's numeric value or, for a
/// string variable, its (already space-trimmed) text. Also doubles as the
/// key type for value-label maps and the payload type for discrete missing
/// values (spec.md §3: "discrete values may be either numeric or strings
/// of width ≤ 8").
#[derive(Debug, Clone)]
pub enum Value {
    Numeric(f64),
    Str(String),
}

impl Value {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            Value::Numeric(_) => None,
        }
    }

    pub fn is_sysmis(&self) -> bool {
        matches!(self, Value::Numeric(v) if crate::constants::is_sysmis(*v))
    }
}

// f64 has no total order/hash of its own; compare and hash by bit pattern,
// which is exactly how the codec compares sentinel values elsewhere.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Numeric(v) => {
                0u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Str(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => {
                a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Numeric(_), Value::Str(_)) => std::cmp::Ordering::Less,
            (Value::Str(_), Value::Numeric(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Numeric(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{}", *v as i64),
            Value::Numeric(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A variable's missing-value specification (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub enum Missing {
    None,
    /// 1 to 3 discrete values.
    Discrete(Vec<Value>),
    /// A numeric range `[low, high]`.
    Range(f64, f64),
    /// A numeric range plus one discrete value.
    RangeAndDiscrete(f64, f64, Value),
}

impl Missing {
    /// Enforce spec.md §3: ranges are numeric-only; discrete string values
    /// must fit in one segment (width ≤ 8); at most 3 discrete values.
    fn validate(&self, var_type: VarType, var_name: &str) -> Result<()> {
        let is_string = matches!(var_type, VarType::String(_));
        match self {
            Missing::None => Ok(()),
            Missing::Discrete(values) => {
                if values.is_empty() || values.len() > 3 {
                    return Err(SpssError::MissingValueNotAllowed {
                        name: var_name.to_string(),
                        reason: "discrete missing values must number 1 to 3",
                    });
                }
                for v in values {
                    check_value_matches_type(v, var_type, var_name)?;
                }
                Ok(())
            }
            Missing::Range(..) | Missing::RangeAndDiscrete(..) if is_string => {
                Err(SpssError::MissingValueNotAllowed {
                    name: var_name.to_string(),
                    reason: "missing-value ranges are only valid on numeric variables",
                })
            }
            Missing::Range(_, _) => Ok(()),
            Missing::RangeAndDiscrete(_, _, v) => check_value_matches_type(v, var_type, var_name),
        }
    }

    /// How many discrete/range slots this spec occupies on disk, signed per
    /// spec.md §4.3 (`n_missing`): negative means "starts with a range".
    pub fn n_missing_code(&self) -> i32 {
        match self {
            Missing::None => 0,
            Missing::Discrete(values) => values.len() as i32,
            Missing::Range(_, _) => -2,
            Missing::RangeAndDiscrete(..) => -3,
        }
    }
}

fn check_value_matches_type(value: &Value, var_type: VarType, var_name: &str) -> Result<()> {
    match (value, var_type) {
        (Value::Numeric(_), VarType::Numeric) => Ok(()),
        (Value::Str(s), VarType::String(width)) if width <= 8 => {
            if s.len() > width as usize {
                Err(SpssError::MissingValueNotAllowed {
                    name: var_name.to_string(),
                    reason: "discrete string missing value wider than the variable",
                })
            } else {
                Ok(())
            }
        }
        (Value::Str(_), VarType::String(_)) => Err(SpssError::MissingValueNotAllowed {
            name: var_name.to_string(),
            reason: "discrete string missing values require width <= 8",
        }),
        _ => Err(SpssError::MissingValueNotAllowed {
            name: var_name.to_string(),
            reason: "missing value type does not match variable type",
        }),
    }
}

/// Validate an on-disk short name (spec.md §4.3): first byte letter/@/#;
/// remainder alphanumeric or `. @ # $ _`; 1..=8 characters.
pub fn validate_short_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 8 {
        return Err(SpssError::BadVariableName {
            name: name.to_string(),
            reason: "short name must be 1 to 8 characters",
        });
    }
    validate_name_chars(name, "short")
}

/// Validate a long name (spec.md §3): up to 64 characters, same character
/// set as a short name.
pub fn validate_long_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(SpssError::BadVariableName {
            name: name.to_string(),
            reason: "long name must be 1 to 64 characters",
        });
    }
    validate_name_chars(name, "long")
}

fn validate_name_chars(name: &str, which: &'static str) -> Result<()> {
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '@' || first == '#') {
        return Err(SpssError::BadVariableName {
            name: name.to_string(),
            reason: if which == "short" {
                "must start with a letter, '@', or '#'"
            } else {
                "long name must start with a letter, '@', or '#'"
            },
        });
    }
    for c in chars {
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '#' | '$' | '_')) {
            return Err(SpssError::BadVariableName {
                name: name.to_string(),
                reason: "contains a character outside [A-Za-z0-9.@#$_]",
            });
        }
    }
    Ok(())
}

/// One column of the dataset (spec.md §3).
#[derive(Debug, Clone)]
pub struct Variable {
    short_name: String,
    long_name: Option<String>,
    var_type: VarType,
    pub print_format: SpssFormat,
    pub write_format: SpssFormat,
    pub label: Option<String>,
    missing: Missing,
    pub measure: Measure,
    pub display_width: u32,
    pub alignment: Alignment,
    value_labels: IndexMap<Value, String>,
}

impl Variable {
    pub fn new(short_name: &str, var_type: VarType) -> Result<Variable> {
        let short_name = short_name.to_ascii_uppercase();
        validate_short_name(&short_name)?;
        let default_format = match var_type {
            VarType::Numeric => SpssFormat {
                format_type: crate::constants::FormatType::F,
                width: 8,
                decimals: 2,
            },
            VarType::String(w) => SpssFormat {
                format_type: crate::constants::FormatType::A,
                width: w,
                decimals: 0,
            },
        };
        Ok(Variable {
            short_name,
            long_name: None,
            var_type,
            print_format: default_format,
            write_format: default_format,
            label: None,
            missing: Missing::None,
            measure: Measure::Unknown,
            display_width: match var_type {
                VarType::Numeric => 8,
                VarType::String(w) => w as u32,
            },
            alignment: if matches!(var_type, VarType::Numeric) {
                Alignment::Right
            } else {
                Alignment::Left
            },
            value_labels: IndexMap::new(),
        })
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The display name: the long name if set, else the short name.
    pub fn name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.short_name)
    }

    pub fn long_name(&self) -> Option<&str> {
        self.long_name.as_deref()
    }

    pub(crate) fn set_short_name_raw(&mut self, name: String) {
        self.short_name = name;
    }

    pub(crate) fn set_long_name_raw(&mut self, name: Option<String>) {
        self.long_name = name;
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    /// Number of 8-byte segments this variable occupies in a case.
    pub fn segments(&self) -> usize {
        self.var_type.n_segments()
    }

    pub fn missing(&self) -> &Missing {
        &self.missing
    }

    pub fn set_missing(&mut self, missing: Missing) -> Result<()> {
        missing.validate(self.var_type, self.name())?;
        self.missing = missing;
        Ok(())
    }

    pub fn value_labels(&self) -> &IndexMap<Value, String> {
        &self.value_labels
    }

    /// Install a value-label map. Spec.md §3/§4.3: restricted to numeric
    /// variables and strings of width ≤ 8.
    pub fn set_value_labels(&mut self, labels: IndexMap<Value, String>) -> Result<()> {
        if let VarType::String(width) = self.var_type {
            if width > 8 {
                return Err(SpssError::MissingValueNotAllowed {
                    name: self.name().to_string(),
                    reason: "value labels are not allowed on strings wider than 8 bytes",
                });
            }
        }
        for value in labels.keys() {
            check_value_matches_type(value, self.var_type, self.name())?;
        }
        self.value_labels = labels;
        Ok(())
    }

    /// Insert or overwrite a single value label, warning the caller (via
    /// return value) if it replaces an existing one.
    pub fn add_value_label(&mut self, value: Value, label: String) -> Result<bool> {
        if let VarType::String(width) = self.var_type {
            if width > 8 {
                return Err(SpssError::MissingValueNotAllowed {
                    name: self.name().to_string(),
                    reason: "value labels are not allowed on strings wider than 8 bytes",
                });
            }
        }
        check_value_matches_type(&value, self.var_type, self.name())?;
        Ok(self.value_labels.insert(value, label).is_some())
    }
}

/// The column/row-layout metadata for a dataset (spec.md §3 "Dictionary").
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    variables: Vec<Variable>,
    file_label: Option<String>,
    documents: Vec<String>,
    weight_variable: Option<usize>,
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    pub fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    pub fn variable_mut(&mut self, index: usize) -> &mut Variable {
        &mut self.variables[index]
    }

    pub fn find_by_short_name(&self, name: &str) -> Option<usize> {
        let name = name.to_ascii_uppercase();
        self.variables.iter().position(|v| v.short_name == name)
    }

    /// Append a new variable, validating short-name uniqueness (spec.md §3:
    /// "Short names are unique (ASCII case-insensitive)").
    pub fn push_variable(&mut self, short_name: &str, var_type: VarType) -> Result<usize> {
        let var = Variable::new(short_name, var_type)?;
        if self.find_by_short_name(var.short_name()).is_some() {
            return Err(SpssError::DuplicateVariableName(
                var.short_name().to_string(),
            ));
        }
        self.variables.push(var);
        Ok(self.variables.len() - 1)
    }

    pub fn rename_short_name(&mut self, index: usize, new_name: &str) -> Result<()> {
        let new_name = new_name.to_ascii_uppercase();
        validate_short_name(&new_name)?;
        if self
            .variables
            .iter()
            .enumerate()
            .any(|(i, v)| i != index && v.short_name() == new_name)
        {
            return Err(SpssError::DuplicateVariableName(new_name));
        }
        self.variables[index].set_short_name_raw(new_name);
        Ok(())
    }

    /// Set (or clear) a variable's long name. Spec.md §3: "Long names are
    /// unique" (case-insensitively).
    pub fn set_long_name(&mut self, index: usize, name: Option<String>) -> Result<()> {
        if let Some(ref name) = name {
            validate_long_name(name)?;
            let lowered = name.to_ascii_lowercase();
            if self.variables.iter().enumerate().any(|(i, v)| {
                i != index
                    && v.long_name()
                        .map(|n| n.to_ascii_lowercase() == lowered)
                        .unwrap_or(false)
            }) {
                return Err(SpssError::DuplicateVariableName(name.clone()));
            }
        }
        self.variables[index].set_long_name_raw(name);
        Ok(())
    }

    /// Reorder variables in place. `order` must be a permutation of
    /// `0..variables.len()`; the weight-variable reference is adjusted to
    /// follow its variable.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.variables.len() {
            return Err(SpssError::CorruptRecord {
                tag: 0,
                detail: "reorder() permutation length does not match variable count".to_string(),
            });
        }
        let mut seen = vec![false; order.len()];
        for &idx in order {
            if idx >= order.len() || seen[idx] {
                return Err(SpssError::CorruptRecord {
                    tag: 0,
                    detail: "reorder() argument is not a permutation".to_string(),
                });
            }
            seen[idx] = true;
        }
        let old = std::mem::take(&mut self.variables);
        self.variables = order.iter().map(|&i| old[i].clone()).collect();
        if let Some(w) = self.weight_variable {
            self.weight_variable = order.iter().position(|&i| i == w);
        }
        Ok(())
    }

    pub fn file_label(&self) -> Option<&str> {
        self.file_label.as_deref()
    }

    pub fn set_file_label(&mut self, label: Option<String>) {
        self.file_label = label;
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn set_documents(&mut self, lines: Vec<String>) {
        self.documents = lines;
    }

    pub fn weight_variable(&self) -> Option<usize> {
        self.weight_variable
    }

    /// Spec.md §3: "The weighting variable, if any, indexes a numeric
    /// variable".
    pub fn set_weight_variable(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(idx) = index {
            let var = self
                .variables
                .get(idx)
                .ok_or_else(|| SpssError::WeightInvalid(format!("variable index {idx} out of range")))?;
            if !matches!(var.var_type(), VarType::Numeric) {
                return Err(SpssError::WeightInvalid(format!(
                    "{:?} is not numeric",
                    var.name()
                )));
            }
        }
        self.weight_variable = index;
        Ok(())
    }

    /// Total 8-byte segments a case occupies (spec.md §3 invariant).
    pub fn total_segments(&self) -> usize {
        self.variables.iter().map(Variable::segments).sum()
    }

    /// 0-based segment offset of the given variable's first segment.
    pub fn segment_offset(&self, index: usize) -> usize {
        self.variables[..index].iter().map(Variable::segments).sum()
    }
}

/// One row: exactly one [`Value`] per variable, in dictionary order.
#[derive(Debug, Clone, Default)]
pub struct Case(pub Vec<Value>);

impl Case {
    pub fn new(values: Vec<Value>) -> Case {
        Case(values)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}
