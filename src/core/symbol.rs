//! Typed catalogs of random data.
//!
//! A symbol knows how to `generate` an unconstrained random value and how to
//! `model` a value that also honors its scope and exclusions.

use crate::core::rnd::Rnd;
use crate::utils::error::{DiceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Weibull parameters used for lengths and magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub alpha: f64,
    pub beta: f64,
}

impl Shape {
    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(20.0, 1.8)
    }
}

/// Allowed and excluded values of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints<T> {
    pub scope: Option<Vec<T>>,
    pub excs: Vec<T>,
    pub max_attempts: usize,
}

impl<T> Default for Constraints<T> {
    fn default() -> Self {
        Self {
            scope: None,
            excs: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl<T: PartialEq> Constraints<T> {
    pub fn is_excluded(&self, value: &T) -> bool {
        self.excs.contains(value)
    }
}

pub trait Symbol {
    type Value: Clone + PartialEq + fmt::Debug;

    fn name(&self) -> &'static str;

    fn default_shape(&self) -> Shape {
        Shape::default()
    }

    fn constraints(&self) -> &Constraints<Self::Value>;

    /// Random value ignoring scope and exclusions.
    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<Self::Value>;

    fn model(&self, rnd: &mut Rnd) -> Result<Self::Value> {
        self.model_with(rnd, self.default_shape())
    }

    /// Random value drawn from the scope when there is one, never excluded.
    fn model_with(&self, rnd: &mut Rnd, shape: Shape) -> Result<Self::Value> {
        let constraints = self.constraints();
        match &constraints.scope {
            None => {
                for _ in 0..constraints.max_attempts {
                    let value = self.generate(rnd, shape)?;
                    if !constraints.is_excluded(&value) {
                        return Ok(value);
                    }
                }
                Err(self.exhausted(constraints.max_attempts, "every draw was excluded"))
            }
            Some(scope) => {
                let allowed: Vec<&Self::Value> = scope
                    .iter()
                    .filter(|v| !constraints.is_excluded(v))
                    .collect();
                rnd.choice(&allowed)
                    .map(|v| (*v).clone())
                    .ok_or_else(|| self.exhausted(0, "scope holds only excluded values"))
            }
        }
    }

    fn exhausted(&self, attempts: usize, reason: &str) -> DiceError {
        DiceError::ExhaustedError {
            symbol: self.name().to_string(),
            attempts,
            reason: reason.to_string(),
        }
    }
}

/// String of random non-zero bytes.
#[derive(Debug, Clone, Default)]
pub struct Bytes {
    pub constraints: Constraints<Vec<u8>>,
}

impl Bytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constraints(constraints: Constraints<Vec<u8>>) -> Self {
        Self { constraints }
    }
}

impl Symbol for Bytes {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "Bytes"
    }

    fn constraints(&self) -> &Constraints<Vec<u8>> {
        &self.constraints
    }

    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<Vec<u8>> {
        let count = rnd.weibull_count(shape.alpha, shape.beta);
        Ok(rnd.nonzero_bytes(count))
    }
}

/// Like [`Bytes`] but never empty.
#[derive(Debug, Clone, Default)]
pub struct NonEmptyBytes {
    pub constraints: Constraints<Vec<u8>>,
}

impl NonEmptyBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constraints(constraints: Constraints<Vec<u8>>) -> Self {
        Self { constraints }
    }
}

impl Symbol for NonEmptyBytes {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "NonEmptyBytes"
    }

    fn constraints(&self) -> &Constraints<Vec<u8>> {
        &self.constraints
    }

    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<Vec<u8>> {
        let count = rnd.weibull_count(shape.alpha, shape.beta) + 1;
        Ok(rnd.nonzero_bytes(count))
    }
}

/// Random printable string.
#[derive(Debug, Clone, Default)]
pub struct Text {
    pub constraints: Constraints<String>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constraints(constraints: Constraints<String>) -> Self {
        Self { constraints }
    }
}

impl Symbol for Text {
    type Value = String;

    fn name(&self) -> &'static str {
        "String"
    }

    fn constraints(&self) -> &Constraints<String> {
        &self.constraints
    }

    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<String> {
        let count = rnd.weibull_count(shape.alpha, shape.beta);
        Ok(rnd.printable(count))
    }
}

/// Exclusion entry of a [`StringList`]: either plain values to drop from the
/// candidates, or groups that must never appear together in a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeSet {
    Items(Vec<String>),
    Groups(Vec<Vec<String>>),
}

/// Random-length list of distinct strings.
#[derive(Debug, Clone)]
pub struct StringList {
    /// Candidates are the intersection of every scope.
    pub scopes: Vec<Vec<String>>,
    pub exc_scopes: Vec<ScopeSet>,
    /// Each entry must be met by the result.
    pub any_scopes: Vec<ScopeSet>,
    /// A result must not lie entirely within any of these.
    pub excany_scopes: Vec<Vec<String>>,
    /// Always added to the result.
    pub required: Vec<Vec<String>>,
    pub constraints: Constraints<Vec<String>>,
}

impl Default for StringList {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            exc_scopes: Vec::new(),
            any_scopes: Vec::new(),
            excany_scopes: Vec::new(),
            required: Vec::new(),
            constraints: Constraints::default(),
        }
    }
}

impl StringList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn excluding(mut self, values: Vec<String>) -> Self {
        self.exc_scopes.push(ScopeSet::Items(values));
        self
    }

    pub fn excluding_groups(mut self, groups: Vec<Vec<String>>) -> Self {
        self.exc_scopes.push(ScopeSet::Groups(groups));
        self
    }

    pub fn requiring_any(mut self, scope: ScopeSet) -> Self {
        self.any_scopes.push(scope);
        self
    }

    pub fn excluding_any(mut self, scope: Vec<String>) -> Self {
        self.excany_scopes.push(scope);
        self
    }

    pub fn requiring(mut self, values: Vec<String>) -> Self {
        self.required.push(values);
        self
    }

    fn accepts(&self, result: &BTreeSet<String>, all_not: &[BTreeSet<String>]) -> bool {
        let any_met = self.any_scopes.iter().all(|scope| match scope {
            ScopeSet::Items(items) => items.iter().any(|item| result.contains(item)),
            ScopeSet::Groups(groups) => groups
                .iter()
                .any(|group| group.iter().all(|item| result.contains(item))),
        });
        if !any_met {
            return false;
        }

        // 空結果不算「只含這些值」
        let only_within = !result.is_empty()
            && self
                .excany_scopes
                .iter()
                .any(|scope| result.iter().all(|item| scope.contains(item)));
        if only_within {
            return false;
        }

        !all_not.iter().any(|group| group.is_subset(result))
    }
}

impl Symbol for StringList {
    type Value = Vec<String>;

    fn name(&self) -> &'static str {
        "StringList"
    }

    fn default_shape(&self) -> Shape {
        Shape::new(3.0, 1.8)
    }

    fn constraints(&self) -> &Constraints<Vec<String>> {
        &self.constraints
    }

    /// One random printable string (a list entry), not a list.
    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<Vec<String>> {
        let count = rnd.weibull_count(shape.alpha, shape.beta);
        Ok(vec![rnd.printable(count)])
    }

    fn model_with(&self, rnd: &mut Rnd, shape: Shape) -> Result<Vec<String>> {
        let count = rnd.weibull_count(shape.alpha, shape.beta);

        let mut candidates: BTreeSet<String> = match self.scopes.split_first() {
            Some((first, rest)) => {
                let mut set: BTreeSet<String> = first.iter().cloned().collect();
                for scope in rest {
                    set.retain(|item| scope.contains(item));
                }
                set
            }
            None => {
                let entry_shape = Shape::default();
                (0..count)
                    .map(|_| {
                        let len = rnd.weibull_count(entry_shape.alpha, entry_shape.beta);
                        rnd.printable(len)
                    })
                    .collect()
            }
        };

        let mut all_not: Vec<BTreeSet<String>> = Vec::new();
        for exc in &self.exc_scopes {
            match exc {
                ScopeSet::Items(items) => {
                    for item in items {
                        candidates.remove(item);
                    }
                }
                ScopeSet::Groups(groups) => {
                    all_not.extend(groups.iter().map(|g| g.iter().cloned().collect()));
                }
            }
        }

        let candidates: Vec<String> = candidates.into_iter().collect();
        let mut result = BTreeSet::new();
        if !candidates.is_empty() {
            let mut accepted = false;
            for attempt in 0..self.constraints.max_attempts {
                // 重抽時連長度一起換，否則長度 0 會永遠不滿足 any_scopes
                let draws = if attempt == 0 {
                    count
                } else {
                    rnd.weibull_count(shape.alpha, shape.beta)
                };
                result = (0..draws)
                    .filter_map(|_| rnd.choice(&candidates).cloned())
                    .collect();
                if self.accepts(&result, &all_not) {
                    accepted = true;
                    break;
                }
            }
            if !accepted {
                return Err(self.exhausted(
                    self.constraints.max_attempts,
                    "no draw satisfied the list constraints",
                ));
            }
        }

        for required in &self.required {
            result.extend(required.iter().cloned());
        }

        Ok(result.into_iter().collect())
    }
}

/// Random integer, optionally bounded.
#[derive(Debug, Clone, Default)]
pub struct Integer {
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub constraints: Constraints<i64>,
}

impl Integer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(minimum: Option<i64>, maximum: Option<i64>) -> Self {
        Self {
            minimum,
            maximum,
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints<i64>) -> Self {
        self.constraints = constraints;
        self
    }

    fn in_bounds(&self, value: i64) -> bool {
        self.minimum.is_none_or(|min| value >= min) && self.maximum.is_none_or(|max| value <= max)
    }

    fn rejects(&self, raw: f64) -> bool {
        if let Some(max) = self.maximum {
            let max = max as f64;
            if (max >= 0.0 && raw > max + 1.0) || (max < 0.0 && raw > max) {
                return true;
            }
        }
        if let Some(min) = self.minimum {
            let min = min as f64;
            if (min >= 0.0 && raw < min) || (min < 0.0 && raw < min - 1.0) {
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minimum = self
            .minimum
            .map_or_else(|| "-Inf".to_string(), |v| v.to_string());
        let maximum = self
            .maximum
            .map_or_else(|| "Inf".to_string(), |v| v.to_string());
        write!(f, "<Integer {}~{}>", minimum, maximum)
    }
}

impl Symbol for Integer {
    type Value = i64;

    fn name(&self) -> &'static str {
        "Integer"
    }

    fn default_shape(&self) -> Shape {
        Shape::new(30.0, 1.1)
    }

    fn constraints(&self) -> &Constraints<i64> {
        &self.constraints
    }

    fn generate(&self, rnd: &mut Rnd, shape: Shape) -> Result<i64> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(DiceError::generation(format!(
                    "{} has minimum greater than maximum",
                    self
                )));
            }
        }

        for _ in 0..self.constraints.max_attempts {
            let sign = if rnd.coin_flip() { 1.0 } else { -1.0 };
            let raw = sign * (2f64.powf(rnd.weibull(shape.alpha, shape.beta)) - 1.0);
            if self.rejects(raw) || raw.abs() >= i64::MAX as f64 {
                continue;
            }
            let value = raw.trunc() as i64;
            if self.in_bounds(value) {
                return Ok(value);
            }
        }

        // 兩端都有界時改用均勻分佈，避免窄區間一直被拒絕
        match (self.minimum, self.maximum) {
            (Some(min), Some(max)) => Ok(rnd.randint(min, max)),
            _ => Err(self.exhausted(
                self.constraints.max_attempts,
                "bound is out of reach of the magnitude distribution",
            )),
        }
    }
}

/// Symbol output in a form every symbol shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolValue {
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<String>),
    Integer(i64),
}

impl SymbolValue {
    /// Raw bytes as written to a corpus file.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            SymbolValue::Bytes(bytes) => bytes.clone(),
            SymbolValue::Text(text) => text.as_bytes().to_vec(),
            SymbolValue::List(items) => items.join("\n").into_bytes(),
            SymbolValue::Integer(value) => value.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for SymbolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolValue::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            SymbolValue::Text(text) => write!(f, "{}", text.escape_debug()),
            SymbolValue::List(items) => {
                let escaped: Vec<String> =
                    items.iter().map(|i| i.escape_debug().to_string()).collect();
                write!(f, "[{}]", escaped.join(", "))
            }
            SymbolValue::Integer(value) => write!(f, "{}", value),
        }
    }
}

#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Bytes,
    NonEmptyBytes,
    String,
    StringList,
    Integer,
}

/// Declarative description of a symbol, as given on the command line or in a
/// job config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub kind: SymbolKind,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub minimum: Option<i64>,
    #[serde(default)]
    pub maximum: Option<i64>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl SymbolSpec {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            scope: None,
            exclude: Vec::new(),
            minimum: None,
            maximum: None,
            required: Vec::new(),
        }
    }

    pub fn sample(&self, rnd: &mut Rnd) -> Result<SymbolValue> {
        match self.kind {
            SymbolKind::Bytes => Bytes::with_constraints(self.byte_constraints())
                .model(rnd)
                .map(SymbolValue::Bytes),
            SymbolKind::NonEmptyBytes => NonEmptyBytes::with_constraints(self.byte_constraints())
                .model(rnd)
                .map(SymbolValue::Bytes),
            SymbolKind::String => Text::with_constraints(Constraints {
                scope: self.scope.clone(),
                excs: self.exclude.clone(),
                ..Constraints::default()
            })
            .model(rnd)
            .map(SymbolValue::Text),
            SymbolKind::StringList => {
                let mut list = StringList::new();
                if let Some(scope) = &self.scope {
                    list = list.with_scope(scope.clone());
                }
                if !self.exclude.is_empty() {
                    list = list.excluding(self.exclude.clone());
                }
                if !self.required.is_empty() {
                    list = list.requiring(self.required.clone());
                }
                list.model(rnd).map(SymbolValue::List)
            }
            SymbolKind::Integer => {
                let scope = self.scope.as_ref().map(|s| parse_integers("scope", s)).transpose()?;
                let excs = parse_integers("exclude", &self.exclude)?;
                Integer::bounded(self.minimum, self.maximum)
                    .with_constraints(Constraints {
                        scope,
                        excs,
                        ..Constraints::default()
                    })
                    .model(rnd)
                    .map(SymbolValue::Integer)
            }
        }
    }

    fn byte_constraints(&self) -> Constraints<Vec<u8>> {
        Constraints {
            scope: self
                .scope
                .as_ref()
                .map(|s| s.iter().map(|v| v.as_bytes().to_vec()).collect()),
            excs: self.exclude.iter().map(|v| v.as_bytes().to_vec()).collect(),
            ..Constraints::default()
        }
    }
}

fn parse_integers(field: &str, values: &[String]) -> Result<Vec<i64>> {
    values
        .iter()
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|e| DiceError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: v.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}
