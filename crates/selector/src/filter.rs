//! The per-document filter chain behind a block selector.
//!
//! One node per selector path item. Each node keeps, per execution level, the
//! markup level at which it matched; execution levels let several sibling
//! subtrees race toward a full-chain match without contaminating each other.
//! The backtracking search over (node, execution level) pairs is an explicit
//! loop, not recursion, so sibling-candidate count never grows the stack.

use crate::item::SelectorItem;
use std::collections::HashMap;
use std::fmt;
use trellis_event::Attribute;

/// Recorded-match sentinel: "no match at this execution level".
pub(crate) const NO_MATCH: usize = usize::MAX;

const INITIAL_EXEC_LEVELS: usize = 10;

struct FilterNode {
    item: SelectorItem,
    /// Execution level -> markup level at which this node matched.
    matching_levels: Vec<usize>,
    /// Markup block index -> how many elements this node's item has matched
    /// inside that block. Only consulted for items with an index predicate.
    block_counts: HashMap<usize, usize>,
    /// Memoized item evaluation for the current event, so that revisits of
    /// the same node through different execution levels neither re-run the
    /// predicate checks nor double-count toward the index condition.
    memo: Option<(u64, bool)>,
}

impl FilterNode {
    fn new(item: SelectorItem) -> Self {
        FilterNode {
            item,
            matching_levels: vec![NO_MATCH; INITIAL_EXEC_LEVELS],
            block_counts: HashMap::new(),
            memo: None,
        }
    }

    fn matched_level(&self, exec_level: usize) -> usize {
        self.matching_levels
            .get(exec_level)
            .copied()
            .unwrap_or(NO_MATCH)
    }

    fn record(&mut self, exec_level: usize, markup_level: usize) {
        if exec_level >= self.matching_levels.len() {
            self.matching_levels.resize(exec_level + 1, NO_MATCH);
        }
        self.matching_levels[exec_level] = markup_level;
    }
}

pub struct FilterChain {
    nodes: Vec<FilterNode>,
    case_sensitive: bool,
    event_serial: u64,
}

impl FilterChain {
    /// Builds a chain from parsed selector items. The item list is never
    /// empty: `parse_selector` guarantees at least one item.
    pub fn new(items: Vec<SelectorItem>, case_sensitive: bool) -> Self {
        assert!(!items.is_empty(), "selector item list cannot be empty");
        FilterChain {
            nodes: items.into_iter().map(FilterNode::new).collect(),
            case_sensitive,
            event_serial: 0,
        }
    }

    /// Attempts to match an element-open event. Records the match level on
    /// the deepest node that matched; only a match of the *last* node
    /// authorizes inclusion.
    pub fn match_open_element(
        &mut self,
        exec_level: usize,
        markup_level: usize,
        block_index: usize,
        name: &str,
        attributes: &[Attribute],
    ) -> bool {
        self.event_serial += 1;
        let last = self.nodes.len() - 1;
        let mut node = 0;
        let mut exec_level = exec_level;
        loop {
            if self.nodes[node].matched_level(exec_level) <= markup_level {
                // Already consumed for this subtree: delegate to the next
                // node; a fully consumed chain means we are inside a match.
                if node == last {
                    return true;
                }
                node += 1;
                continue;
            }
            if self.applicable(node, exec_level, markup_level)
                && self.eval_element(node, block_index, name, attributes)
            {
                self.nodes[node].record(exec_level, markup_level);
                return node == last;
            }
            if node == 0 {
                return false;
            }
            // Retry from the preceding node with a fresh execution slot, so
            // concurrent sibling candidates are tracked independently.
            node -= 1;
            exec_level += 1;
        }
    }

    /// Attempts to match a standalone element. A standalone element has no
    /// children to select within, so it can satisfy only the final path
    /// segment and never stores match state.
    pub fn match_standalone_element(
        &mut self,
        exec_level: usize,
        markup_level: usize,
        block_index: usize,
        name: &str,
        attributes: &[Attribute],
    ) -> bool {
        self.event_serial += 1;
        let last = self.nodes.len() - 1;
        let mut node = 0;
        let mut exec_level = exec_level;
        loop {
            if self.nodes[node].matched_level(exec_level) <= markup_level {
                if node == last {
                    return true;
                }
                node += 1;
                continue;
            }
            if node != last {
                return false;
            }
            if self.applicable(node, exec_level, markup_level)
                && self.eval_element(node, block_index, name, attributes)
            {
                return true;
            }
            if node == 0 {
                return false;
            }
            node -= 1;
            exec_level += 1;
        }
    }

    /// Attempts to match a text event against a final `text()` segment, with
    /// the same final-segment-only restriction as standalone elements.
    pub fn match_text(&mut self, exec_level: usize, markup_level: usize) -> bool {
        let last = self.nodes.len() - 1;
        let mut node = 0;
        let mut exec_level = exec_level;
        loop {
            if self.nodes[node].matched_level(exec_level) <= markup_level {
                if node == last {
                    return true;
                }
                node += 1;
                continue;
            }
            if node != last {
                return false;
            }
            if self.applicable(node, exec_level, markup_level) && self.nodes[node].item.text_selector
            {
                return true;
            }
            if node == 0 {
                return false;
            }
            node -= 1;
            exec_level += 1;
        }
    }

    /// Non-selectable events (comments, CDATA, processing instructions,
    /// declarations) pass only when the whole chain is already consumed at
    /// or above the given markup level.
    pub fn match_passthrough(&self, exec_level: usize, markup_level: usize) -> bool {
        let last = self.nodes.len() - 1;
        let mut node = 0;
        loop {
            if self.nodes[node].matched_level(exec_level) > markup_level {
                return false;
            }
            if node == last {
                return true;
            }
            node += 1;
        }
    }

    /// Clears every match recorded exactly at `markup_level`, across the
    /// whole chain. Invoked on element close; idempotent.
    pub fn remove_matches_for_level(&mut self, markup_level: usize) {
        for node in &mut self.nodes {
            for level in node.matching_levels.iter_mut() {
                if *level == markup_level {
                    *level = NO_MATCH;
                }
            }
        }
    }

    fn applicable(&self, node: usize, exec_level: usize, markup_level: usize) -> bool {
        self.nodes[node].item.any_level
            || markup_level == 0
            || (node > 0 && self.nodes[node - 1].matched_level(exec_level) == markup_level - 1)
    }

    fn eval_element(
        &mut self,
        node: usize,
        block_index: usize,
        name: &str,
        attributes: &[Attribute],
    ) -> bool {
        let case_sensitive = self.case_sensitive;
        let serial = self.event_serial;
        let node = &mut self.nodes[node];
        if let Some((memo_serial, result)) = node.memo {
            if memo_serial == serial {
                return result;
            }
        }
        let mut result = node.item.matches_element(case_sensitive, name, attributes);
        if result {
            if let Some(index) = node.item.index {
                let count = node.block_counts.entry(block_index).or_insert(0);
                *count += 1;
                result = index.matches(*count);
            }
        }
        node.memo = Some((serial, result));
        result
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node.item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::parse_selector;

    fn chain(selector: &str) -> FilterChain {
        FilterChain::new(parse_selector(selector, true).unwrap(), true)
    }

    fn open(chain: &mut FilterChain, level: usize, name: &str) -> bool {
        chain.match_open_element(0, level, 0, name, &[])
    }

    #[test]
    fn test_any_level_matches_every_depth() {
        let mut c = chain("//p");
        assert!(open(&mut c, 0, "p"));
        c.remove_matches_for_level(0);
        assert!(open(&mut c, 3, "p"));
        c.remove_matches_for_level(3);
        assert!(open(&mut c, 7, "p"));
    }

    #[test]
    fn test_immediate_child_requires_adjacency() {
        let mut c = chain("//div/p");
        // div matches at depth 0 but is only an intermediate segment.
        assert!(!open(&mut c, 0, "div"));
        // p at depth 1 is an immediate child of the matched div.
        assert!(open(&mut c, 1, "p"));
        c.remove_matches_for_level(1);
        // p at depth 2 is not adjacent to the div matched at depth 0.
        assert!(!open(&mut c, 2, "p"));
    }

    #[test]
    fn test_non_any_level_head_only_matches_root() {
        let mut c = chain("/div");
        assert!(!open(&mut c, 1, "div"));
        assert!(open(&mut c, 0, "div"));
    }

    #[test]
    fn test_remove_matches_is_an_idempotent_reset() {
        let mut c = chain("//div/p");
        assert!(!open(&mut c, 0, "div"));
        assert!(open(&mut c, 1, "p"));
        c.remove_matches_for_level(1);
        c.remove_matches_for_level(1);
        // The p match is gone, the div match remains.
        assert!(open(&mut c, 1, "p"));
        c.remove_matches_for_level(1);
        c.remove_matches_for_level(0);
        // Now even the div match is gone: p can no longer attach.
        assert!(!open(&mut c, 1, "p"));
    }

    #[test]
    fn test_sibling_candidates_use_fresh_execution_slots() {
        // <div><p>A</p><div><p>B</p></div></div> against //div/p: the inner
        // div must track its own candidacy without disturbing the outer one.
        let mut c = chain("//div/p");
        assert!(!open(&mut c, 0, "div"));
        assert!(open(&mut c, 1, "p"));
        c.remove_matches_for_level(1); // </p>
        assert!(!open(&mut c, 1, "div"));
        assert!(open(&mut c, 2, "p"));
        c.remove_matches_for_level(2); // </p>
        c.remove_matches_for_level(1); // </div> (inner)
        c.remove_matches_for_level(0); // </div> (outer)
        assert!(!open(&mut c, 1, "p"));
    }

    #[test]
    fn test_index_predicate_counts_within_block() {
        let mut c = chain("/h2[2]");
        assert!(!c.match_open_element(0, 0, 0, "h2", &[]));
        c.remove_matches_for_level(0);
        assert!(c.match_open_element(0, 0, 0, "h2", &[]));
        c.remove_matches_for_level(0);
        assert!(!c.match_open_element(0, 0, 0, "h2", &[]));
    }

    #[test]
    fn test_index_counter_is_per_block() {
        let mut c = chain("/section/h2[1]");
        assert!(!c.match_open_element(0, 0, 0, "section", &[]));
        assert!(c.match_open_element(0, 1, 1, "h2", &[]));
        c.remove_matches_for_level(1);
        // Same block: the first-index condition is spent.
        assert!(!c.match_open_element(0, 1, 1, "h2", &[]));
        c.remove_matches_for_level(1);
        c.remove_matches_for_level(0);
        // A second <section> is a different markup block, so its first h2
        // matches again.
        assert!(!c.match_open_element(0, 0, 0, "section", &[]));
        assert!(c.match_open_element(0, 1, 2, "h2", &[]));
    }

    #[test]
    fn test_attribute_conditions_gate_matching() {
        let mut c = FilterChain::new(
            parse_selector("//div[@class='note']", true).unwrap(),
            true,
        );
        assert!(!c.match_open_element(0, 0, 0, "div", &[Attribute::new("class", "plain")]));
        assert!(c.match_open_element(0, 0, 0, "div", &[Attribute::new("class", "note")]));
    }

    #[test]
    fn test_standalone_matches_only_final_segment() {
        let mut c = chain("//div/p");
        // A standalone div can never satisfy the intermediate segment, and
        // must not record any state while failing.
        assert!(!c.match_standalone_element(0, 0, 0, "div", &[]));
        assert!(!open(&mut c, 1, "p"));

        // After a real div matched, a standalone p at the right depth is a
        // complete match.
        assert!(!open(&mut c, 0, "div"));
        assert!(c.match_standalone_element(0, 1, 0, "p", &[]));
        // ...and still no recorded state for the standalone itself.
        assert!(c.match_standalone_element(0, 1, 0, "p", &[]));
    }

    #[test]
    fn test_text_selector_matches_final_segment() {
        let mut c = chain("//div/text()");
        assert!(!c.match_text(0, 0));
        assert!(!open(&mut c, 0, "div"));
        assert!(c.match_text(0, 1));
        c.remove_matches_for_level(0);
        assert!(!c.match_text(0, 1));
    }

    #[test]
    fn test_passthrough_requires_fully_consumed_chain() {
        let mut c = chain("//div");
        assert!(!c.match_passthrough(0, 0));
        assert!(open(&mut c, 0, "div"));
        assert!(c.match_passthrough(0, 1));
        c.remove_matches_for_level(0);
        assert!(!c.match_passthrough(0, 1));
    }

    #[test]
    fn test_wildcard_segment() {
        let mut c = chain("//section/*");
        assert!(!open(&mut c, 0, "section"));
        assert!(open(&mut c, 1, "anything"));
    }

    #[test]
    fn test_case_insensitive_chain() {
        let mut c = FilterChain::new(parse_selector("//DIV", false).unwrap(), false);
        assert!(c.match_open_element(0, 0, 0, "Div", &[]));
    }
}
