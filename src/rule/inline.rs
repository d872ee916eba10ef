//! Inline expressions
//!
//! Two small grammars share the `${...}` placeholder syntax:
//!
//! - Data-node expressions expand to a list of nodes:
//!   `ds_${0..1}.t_order_${0..1}` or `ds_${['a','b']}.t_user`, with
//!   comma-separated alternatives. Placeholders expand left to right, the
//!   leftmost varying slowest.
//! - Algorithm expressions compute one target from column values:
//!   `t_order_${order_id % 2}` or `ds_${user_id % 2}_${order_id % 4}`.

use std::sync::OnceLock;

use regex::Regex;

use super::algorithm::ShardingValue;
use super::data_node::DataNode;
use super::errors::{RuleError, RuleResult};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("static regex"))
}

fn column_regex() -> &'static Regex {
    static COLUMN: OnceLock<Regex> = OnceLock::new();
    COLUMN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:%\s*([0-9]+)\s*)?$").expect("static regex")
    })
}

/// Expand a data-node expression into its nodes, in declaration order.
pub fn expand_data_nodes(expression: &str) -> RuleResult<Vec<DataNode>> {
    let mut nodes = Vec::new();
    for alternative in split_top_level(expression) {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            continue;
        }
        for text in expand(expression, alternative)? {
            nodes.push(DataNode::parse(&text)?);
        }
    }
    if nodes.is_empty() {
        return Err(RuleError::invalid_expression(expression, "expands to no data nodes"));
    }
    Ok(nodes)
}

/// Split on commas that are not inside `${...}`.
fn split_top_level(expression: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in expression.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&expression[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&expression[start..]);
    parts
}

fn expand(full: &str, alternative: &str) -> RuleResult<Vec<String>> {
    let mut acc = vec![String::new()];
    let mut cursor = 0usize;
    for caps in placeholder_regex().captures_iter(alternative) {
        let whole = caps.get(0).expect("group 0 always present");
        let literal = &alternative[cursor..whole.start()];
        for prefix in acc.iter_mut() {
            prefix.push_str(literal);
        }
        let choices = parse_choices(full, &caps[1])?;
        acc = acc
            .iter()
            .flat_map(|prefix| choices.iter().map(move |c| format!("{}{}", prefix, c)))
            .collect();
        cursor = whole.end();
    }
    let tail = &alternative[cursor..];
    if tail.contains("${") {
        return Err(RuleError::invalid_expression(full, "unterminated placeholder"));
    }
    for prefix in acc.iter_mut() {
        prefix.push_str(tail);
    }
    Ok(acc)
}

fn parse_choices(full: &str, inner: &str) -> RuleResult<Vec<String>> {
    let inner = inner.trim();
    if let Some(list) = inner.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let items: Vec<String> = list
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|item| !item.is_empty())
            .collect();
        if items.is_empty() {
            return Err(RuleError::invalid_expression(full, "empty list placeholder"));
        }
        return Ok(items);
    }
    if let Some((lo, hi)) = inner.split_once("..") {
        let lo: i64 = lo
            .trim()
            .parse()
            .map_err(|_| RuleError::invalid_expression(full, "range start is not an integer"))?;
        let hi: i64 = hi
            .trim()
            .parse()
            .map_err(|_| RuleError::invalid_expression(full, "range end is not an integer"))?;
        if lo > hi {
            return Err(RuleError::invalid_expression(full, "range start exceeds range end"));
        }
        return Ok((lo..=hi).map(|v| v.to_string()).collect());
    }
    Err(RuleError::invalid_expression(
        full,
        format!("unsupported placeholder '${{{}}}'", inner),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Column { name: String, modulo: Option<u64> },
}

/// A parsed algorithm expression such as `t_order_${order_id % 2}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmExpression {
    source: String,
    segments: Vec<Segment>,
}

impl AlgorithmExpression {
    pub fn parse(source: &str) -> RuleResult<Self> {
        let mut segments = Vec::new();
        let mut cursor = 0usize;
        for caps in placeholder_regex().captures_iter(source) {
            let whole = caps.get(0).expect("group 0 always present");
            if whole.start() > cursor {
                segments.push(Segment::Literal(source[cursor..whole.start()].to_string()));
            }
            let column = column_regex().captures(&caps[1]).ok_or_else(|| {
                RuleError::invalid_expression(source, format!("cannot evaluate '${{{}}}'", &caps[1]))
            })?;
            let modulo = match column.get(2) {
                Some(m) => {
                    let n: u64 = m
                        .as_str()
                        .parse()
                        .map_err(|_| RuleError::invalid_expression(source, "modulo overflows"))?;
                    if n == 0 {
                        return Err(RuleError::invalid_expression(source, "modulo by zero"));
                    }
                    Some(n)
                }
                None => None,
            };
            segments.push(Segment::Column {
                name: column[1].to_string(),
                modulo,
            });
            cursor = whole.end();
        }
        if cursor < source.len() {
            segments.push(Segment::Literal(source[cursor..].to_string()));
        }
        let expression = Self {
            source: source.to_string(),
            segments,
        };
        if expression.columns().is_empty() {
            return Err(RuleError::invalid_expression(source, "no sharding column placeholder"));
        }
        Ok(expression)
    }

    /// The expression text as configured
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct columns referenced, in order of first appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Column { name, .. } = segment {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
        }
        columns
    }

    /// Modulus of the single placeholder, when the expression has exactly
    /// one placeholder and it is a modulo.
    pub fn single_modulus(&self) -> Option<u64> {
        let mut placeholders = self.segments.iter().filter_map(|s| match s {
            Segment::Column { modulo, .. } => Some(*modulo),
            Segment::Literal(_) => None,
        });
        match (placeholders.next(), placeholders.next()) {
            (Some(modulo), None) => modulo,
            _ => None,
        }
    }

    /// Render the target for the given column values.
    pub fn render<'v, F>(&self, lookup: F) -> RuleResult<String>
    where
        F: Fn(&str) -> Option<&'v ShardingValue>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Column { name, modulo } => {
                    let value = lookup(name).ok_or_else(|| {
                        RuleError::invalid_value(name.as_str(), "no value supplied for column")
                    })?;
                    match modulo {
                        Some(n) => {
                            let v = value.as_i64().ok_or_else(|| {
                                RuleError::invalid_value(name.as_str(), "modulo requires an integer")
                            })?;
                            // i128 keeps huge moduli from overflowing the cast.
                            let class = (v as i128).rem_euclid(*n as i128);
                            out.push_str(&class.to_string());
                        }
                        None => out.push_str(&value.to_string()),
                    }
                }
            }
        }
        Ok(out)
    }
}
