//! Block-selector grammar: `(("//"|"/")? item)("/" item)*`, where an item is
//! an element name (or `*`, or `text()`), optional `#id`/`.class` shorthands
//! and optional `[...]` predicate blocks (attribute conditions, one trailing
//! index condition).

use crate::error::SelectorError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::recognize,
    multi::{many0, many1},
    sequence::{delimited, pair},
};
use std::fmt;
use trellis_event::Attribute;

const ID_ATTRIBUTE_NAME: &str = "id";
const CLASS_ATTRIBUTE_NAME: &str = "class";
const TEXT_SELECTOR: &str = "text()";

/// Comparison applied by an attribute condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// Bare `[@attr]`: the attribute is present, whatever its value.
    Exists,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
}

impl fmt::Display for AttributeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            AttributeOperator::Exists => "",
            AttributeOperator::Equals => "=",
            AttributeOperator::NotEquals => "!=",
            AttributeOperator::StartsWith => "^=",
            AttributeOperator::EndsWith => "$=",
        };
        f.write_str(repr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCondition {
    pub name: String,
    pub operator: AttributeOperator,
    pub value: Option<String>,
}

impl AttributeCondition {
    fn new(name: impl Into<String>, operator: AttributeOperator, value: Option<String>) -> Self {
        AttributeCondition {
            name: name.into(),
            operator,
            value,
        }
    }

    pub(crate) fn matches(&self, case_sensitive: bool, attributes: &[Attribute]) -> bool {
        let found = attributes
            .iter()
            .find(|a| names_equal(case_sensitive, &self.name, &a.name));
        match (self.operator, found) {
            (AttributeOperator::Exists, present) => present.is_some(),
            // An absent attribute trivially has a value different from the
            // required one.
            (AttributeOperator::NotEquals, None) => true,
            (_, None) => false,
            (AttributeOperator::Equals, Some(a)) => Some(&a.value) == self.value.as_ref(),
            (AttributeOperator::NotEquals, Some(a)) => Some(&a.value) != self.value.as_ref(),
            (AttributeOperator::StartsWith, Some(a)) => self
                .value
                .as_ref()
                .is_some_and(|v| a.value.starts_with(v.as_str())),
            (AttributeOperator::EndsWith, Some(a)) => self
                .value
                .as_ref()
                .is_some_and(|v| a.value.ends_with(v.as_str())),
        }
    }
}

/// Position predicate over the matching siblings of one markup block,
/// counted 1-based in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCondition {
    Value(usize),
    Even,
    Odd,
}

impl IndexCondition {
    pub(crate) fn matches(self, count: usize) -> bool {
        match self {
            IndexCondition::Value(n) => count == n,
            IndexCondition::Even => count % 2 == 0,
            IndexCondition::Odd => count % 2 == 1,
        }
    }
}

impl fmt::Display for IndexCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexCondition::Value(n) => write!(f, "{n}"),
            IndexCondition::Even => f.write_str("even()"),
            IndexCondition::Odd => f.write_str("odd()"),
        }
    }
}

/// One parsed path item of a block selector. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorItem {
    /// `//item` (match at any depth) vs `/item` (immediate child).
    pub any_level: bool,
    /// `text()`: the item selects text events instead of elements.
    pub text_selector: bool,
    /// `None` means wildcard (`*` or empty name with predicates).
    pub element_name: Option<String>,
    pub index: Option<IndexCondition>,
    pub attributes: Vec<AttributeCondition>,
}

impl SelectorItem {
    /// Name and attribute conditions against an element; the index
    /// condition is evaluated separately because it needs per-block match
    /// counting.
    pub(crate) fn matches_element(
        &self,
        case_sensitive: bool,
        name: &str,
        attributes: &[Attribute],
    ) -> bool {
        if self.text_selector {
            return false;
        }
        if let Some(target) = &self.element_name {
            if !names_equal(case_sensitive, target, name) {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|cond| cond.matches(case_sensitive, attributes))
    }
}

impl fmt::Display for SelectorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.any_level { "//" } else { "/" })?;
        match &self.element_name {
            Some(name) => f.write_str(name)?,
            None if self.text_selector => f.write_str(TEXT_SELECTOR)?,
            None => f.write_str("*")?,
        }
        for cond in &self.attributes {
            match &cond.value {
                Some(value) => write!(f, "[{}{}'{}']", cond.name, cond.operator, value)?,
                None => write!(f, "[{}]", cond.name)?,
            }
        }
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

pub(crate) fn names_equal(case_sensitive: bool, normalized: &str, candidate: &str) -> bool {
    if case_sensitive {
        normalized == candidate
    } else {
        normalized.eq_ignore_ascii_case(candidate)
    }
}

// --- Structural parsers ---

fn slash_run(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == '/').parse(input)
}

fn bracket_block(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('['), take_while(|c| c != ']'), char(']'))).parse(input)
}

fn chunk_fragment(input: &str) -> IResult<&str, &str> {
    // A '/' inside a predicate block does not split items.
    alt((bracket_block, take_while1(|c: char| c != '/' && c != '['))).parse(input)
}

fn item_chunk(input: &str) -> IResult<&str, &str> {
    recognize(many1(chunk_fragment)).parse(input)
}

fn selector_split(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    many1(pair(slash_run, item_chunk)).parse(input)
}

fn item_parts(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    pair(
        take_while(|c: char| c != '['),
        many0(delimited(char('['), take_while(|c| c != ']'), char(']'))),
    )
    .parse(input)
}

// --- Public parser ---

/// Parses a block selector into its ordered path items.
///
/// A selector that does not start with `/` is equivalent to the same
/// selector prefixed with `//` (`div/p` ≡ `//div/p`). When
/// `case_sensitive` is false, element and attribute names are lower-cased
/// here, at parse time, so event matching never needs to normalize.
pub fn parse_selector(
    selector: &str,
    case_sensitive: bool,
) -> Result<Vec<SelectorItem>, SelectorError> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::malformed(selector, "selector cannot be empty"));
    }

    let normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("//{trimmed}")
    };

    let (rest, parts) = selector_split(&normalized).map_err(|_| {
        SelectorError::malformed(
            selector,
            "selector does not match ((\"//\"|\"/\")? item)(\"/\" item)* syntax",
        )
    })?;
    if !rest.is_empty() {
        return Err(SelectorError::malformed(
            selector,
            "'/' should be followed by further selector specification",
        ));
    }

    let mut items = Vec::with_capacity(parts.len());
    for (slashes, chunk) in parts {
        let any_level = match slashes.len() {
            1 => false,
            2 => true,
            _ => {
                return Err(SelectorError::malformed(
                    selector,
                    "more than two consecutive '/' characters",
                ));
            }
        };
        items.push(parse_item(selector, case_sensitive, any_level, chunk)?);
    }

    log::debug!(
        "parsed block selector \"{}\" into {} path item(s)",
        selector,
        items.len()
    );
    Ok(items)
}

// --- Item assembly ---

fn parse_item(
    selector: &str,
    case_sensitive: bool,
    any_level: bool,
    chunk: &str,
) -> Result<SelectorItem, SelectorError> {
    let (rest, (name_part, blocks)) = item_parts(chunk)
        .map_err(|_| SelectorError::malformed(selector, "item does not match item syntax"))?;
    if !rest.is_empty() {
        return Err(SelectorError::malformed(
            selector,
            format!("unexpected input \"{rest}\" in item \"{chunk}\""),
        ));
    }
    if name_part.chars().any(char::is_whitespace) {
        return Err(SelectorError::malformed(
            selector,
            format!("whitespace is not allowed inside item \"{chunk}\""),
        ));
    }

    let (path, mut attributes) = extract_shorthand(selector, name_part)?;

    let text_selector = path == TEXT_SELECTOR;
    let element_name = if text_selector || path.is_empty() || path == "*" {
        None
    } else if case_sensitive {
        Some(path.to_string())
    } else {
        Some(path.to_ascii_lowercase())
    };

    let mut index = None;
    let block_count = blocks.len();
    for (i, block) in blocks.into_iter().enumerate() {
        let block = block.trim();
        if block.is_empty() {
            return Err(SelectorError::malformed(selector, "empty predicate block"));
        }
        if let Some(condition) = parse_index(selector, block)? {
            if i != block_count - 1 {
                return Err(SelectorError::malformed(
                    selector,
                    "an index predicate must be the last predicate of an item",
                ));
            }
            if any_level {
                return Err(SelectorError::malformed(
                    selector,
                    "an index predicate cannot be applied to an any-level (\"//\") item",
                ));
            }
            index = Some(condition);
        } else {
            parse_attribute_block(selector, case_sensitive, block, &mut attributes)?;
        }
    }

    Ok(SelectorItem {
        any_level,
        text_selector,
        element_name,
        index,
        attributes,
    })
}

/// Splits `x#id` / `x.class` shorthands off the item name, turning them into
/// equivalent attribute conditions.
fn extract_shorthand<'a>(
    selector: &str,
    name_part: &'a str,
) -> Result<(&'a str, Vec<AttributeCondition>), SelectorError> {
    let id_pos = name_part.find('#');
    let class_pos = name_part.find('.');
    if id_pos.is_some() && class_pos.is_some() {
        return Err(SelectorError::malformed(
            selector,
            "more than one modifier (id, class) specified on a single item",
        ));
    }

    let (separator_pos, attribute_name) = match (id_pos, class_pos) {
        (Some(pos), None) => (pos, ID_ATTRIBUTE_NAME),
        (None, Some(pos)) => (pos, CLASS_ATTRIBUTE_NAME),
        _ => return Ok((name_part, Vec::new())),
    };

    let value = &name_part[separator_pos + 1..];
    if value.trim().is_empty() {
        return Err(SelectorError::malformed(
            selector,
            format!("empty {attribute_name} modifier"),
        ));
    }
    let condition = AttributeCondition::new(
        attribute_name,
        AttributeOperator::Equals,
        Some(value.to_string()),
    );
    Ok((&name_part[..separator_pos], vec![condition]))
}

fn parse_index(selector: &str, block: &str) -> Result<Option<IndexCondition>, SelectorError> {
    if block.eq_ignore_ascii_case("even()") {
        return Ok(Some(IndexCondition::Even));
    }
    if block.eq_ignore_ascii_case("odd()") {
        return Ok(Some(IndexCondition::Odd));
    }
    match block.parse::<usize>() {
        Ok(0) => Err(SelectorError::malformed(
            selector,
            "index predicates are 1-based; [0] can never match",
        )),
        Ok(n) => Ok(Some(IndexCondition::Value(n))),
        Err(_) => Ok(None),
    }
}

fn parse_attribute_block(
    selector: &str,
    case_sensitive: bool,
    block: &str,
    attributes: &mut Vec<AttributeCondition>,
) -> Result<(), SelectorError> {
    for spec in block.split(" and ") {
        attributes.push(parse_attribute(selector, case_sensitive, spec.trim())?);
    }
    Ok(())
}

fn parse_attribute(
    selector: &str,
    case_sensitive: bool,
    spec: &str,
) -> Result<AttributeCondition, SelectorError> {
    let (name_raw, operator, value_raw) = tokenize_attribute_spec(spec);

    let name_raw = name_raw.strip_prefix('@').unwrap_or(name_raw);
    if name_raw.is_empty() {
        return Err(SelectorError::malformed(
            selector,
            format!("attribute condition \"{spec}\" has no attribute name"),
        ));
    }
    let name = if case_sensitive {
        name_raw.to_string()
    } else {
        name_raw.to_ascii_lowercase()
    };

    match operator {
        None => Ok(AttributeCondition::new(name, AttributeOperator::Exists, None)),
        Some(operator) => {
            let value = value_raw.unwrap_or("");
            let quoted = value.len() >= 2
                && ((value.starts_with('\'') && value.ends_with('\''))
                    || (value.starts_with('"') && value.ends_with('"')));
            if !quoted {
                return Err(SelectorError::malformed(
                    selector,
                    format!("attribute value in \"{spec}\" must be quoted"),
                ));
            }
            Ok(AttributeCondition::new(
                name,
                operator,
                Some(value[1..value.len() - 1].to_string()),
            ))
        }
    }
}

/// Splits `name<op>value` on the first `=`, classifying the operator by the
/// character preceding it (`!=`, `^=`, `$=`, plain `=`). No `=` means a bare
/// existence condition.
fn tokenize_attribute_spec(spec: &str) -> (&str, Option<AttributeOperator>, Option<&str>) {
    let Some(equals_pos) = spec.find('=') else {
        return (spec.trim(), None, None);
    };
    if equals_pos == 0 {
        return ("", Some(AttributeOperator::Equals), Some(spec[1..].trim()));
    }
    let (operator, name_end) = match spec.as_bytes()[equals_pos - 1] {
        b'!' => (AttributeOperator::NotEquals, equals_pos - 1),
        b'^' => (AttributeOperator::StartsWith, equals_pos - 1),
        b'$' => (AttributeOperator::EndsWith, equals_pos - 1),
        _ => (AttributeOperator::Equals, equals_pos),
    };
    (
        spec[..name_end].trim(),
        Some(operator),
        Some(spec[equals_pos + 1..].trim()),
    )
}
