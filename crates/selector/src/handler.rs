//! The block-selector markup handler: a [`MarkupHandler`] wrapper that
//! forwards only the events falling inside blocks matched by its selector.

use crate::error::SelectorError;
use crate::filter::{FilterChain, NO_MATCH};
use crate::item::parse_selector;
use trellis_event::{MarkupEvent, MarkupHandler};

/// Wraps a downstream event consumer and suppresses every event outside the
/// blocks identified by the selector.
///
/// Depth accounting is interleaved precisely between the start and end
/// sub-events of element tags: the markup level grows *after* an open tag is
/// fully emitted and shrinks *before* a close tag starts, and the matching
/// state of a block root is cleared only after its own closing tag has been
/// forwarded. One instance per document; the struct holds all of its state,
/// so event delivery may pause and resume at any buffer boundary.
pub struct BlockSelector<H: MarkupHandler> {
    chain: FilterChain,
    downstream: H,
    markup_level: usize,
    matching: bool,
    matching_markup_level: usize,
    markup_blocks: Vec<usize>,
    markup_block_index: usize,
}

impl<H: MarkupHandler> BlockSelector<H> {
    pub fn new(selector: &str, case_sensitive: bool, downstream: H) -> Result<Self, SelectorError> {
        let items = parse_selector(selector, case_sensitive)?;
        Ok(BlockSelector {
            chain: FilterChain::new(items, case_sensitive),
            downstream,
            markup_level: 0,
            matching: false,
            matching_markup_level: NO_MATCH,
            markup_blocks: vec![0],
            markup_block_index: 0,
        })
    }

    /// Whether the handler is currently inside a matched block.
    pub fn is_matching(&self) -> bool {
        self.matching
    }

    pub fn downstream(&self) -> &H {
        &self.downstream
    }

    pub fn into_downstream(self) -> H {
        self.downstream
    }

    fn current_block(&self) -> usize {
        self.markup_blocks[self.markup_level]
    }

    fn enter_level(&mut self) {
        self.markup_level += 1;
        self.markup_block_index += 1;
        if self.markup_level == self.markup_blocks.len() {
            self.markup_blocks.push(self.markup_block_index);
        } else {
            self.markup_blocks[self.markup_level] = self.markup_block_index;
        }
    }
}

impl<H: MarkupHandler> MarkupHandler for BlockSelector<H> {
    fn handle(&mut self, event: MarkupEvent) {
        match event {
            MarkupEvent::DocumentStart | MarkupEvent::DocumentEnd => {
                self.downstream.handle(event);
            }

            // Declarations carry no nesting depth of their own and are
            // filtered independently of the matching flag's element scope.
            MarkupEvent::XmlDeclaration { .. } | MarkupEvent::DocType { .. } => {
                if self.matching || self.chain.match_passthrough(0, self.markup_level) {
                    self.downstream.handle(event);
                }
            }

            MarkupEvent::OpenElementStart {
                ref name,
                ref attributes,
                ..
            } => {
                if self.matching {
                    self.downstream.handle(event);
                    return;
                }
                let block = self.current_block();
                if self
                    .chain
                    .match_open_element(0, self.markup_level, block, name, attributes)
                {
                    self.matching = true;
                    self.matching_markup_level = self.markup_level;
                    self.downstream.handle(event);
                }
            }

            MarkupEvent::OpenElementEnd { .. } => {
                if self.matching {
                    self.downstream.handle(event);
                }
                self.enter_level();
            }

            MarkupEvent::CloseElementStart { .. } => {
                assert!(self.markup_level > 0, "unbalanced element close event");
                self.markup_level -= 1;
                self.chain.remove_matches_for_level(self.markup_level);
                if self.matching {
                    self.downstream.handle(event);
                }
            }

            MarkupEvent::CloseElementEnd { .. } => {
                if self.matching {
                    self.downstream.handle(event);
                    // The matched root's own closing tag has now been
                    // emitted; leave the block.
                    if self.matching_markup_level == self.markup_level {
                        self.matching = false;
                        self.matching_markup_level = NO_MATCH;
                    }
                }
            }

            MarkupEvent::StandaloneElementStart {
                ref name,
                ref attributes,
                ..
            } => {
                if self.matching {
                    self.downstream.handle(event);
                    return;
                }
                let block = self.current_block();
                if self
                    .chain
                    .match_standalone_element(0, self.markup_level, block, name, attributes)
                {
                    self.matching = true;
                    self.matching_markup_level = self.markup_level;
                    self.downstream.handle(event);
                }
            }

            MarkupEvent::StandaloneElementEnd { .. } => {
                if self.matching {
                    self.downstream.handle(event);
                    if self.matching_markup_level == self.markup_level {
                        self.matching = false;
                        self.matching_markup_level = NO_MATCH;
                    }
                }
            }

            MarkupEvent::Text { .. } => {
                if self.matching || self.chain.match_text(0, self.markup_level) {
                    self.downstream.handle(event);
                }
            }

            MarkupEvent::Comment { .. }
            | MarkupEvent::CData { .. }
            | MarkupEvent::ProcessingInstruction { .. } => {
                if self.matching || self.chain.match_passthrough(0, self.markup_level) {
                    self.downstream.handle(event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_event::{Attribute, EventCollector, Location};

    fn loc() -> Location {
        Location::default()
    }

    fn open(name: &str) -> Vec<MarkupEvent> {
        open_with(name, vec![])
    }

    fn open_with(name: &str, attributes: Vec<Attribute>) -> Vec<MarkupEvent> {
        vec![
            MarkupEvent::OpenElementStart {
                name: name.to_string(),
                attributes,
                location: loc(),
            },
            MarkupEvent::OpenElementEnd {
                name: name.to_string(),
                location: loc(),
            },
        ]
    }

    fn close(name: &str) -> Vec<MarkupEvent> {
        vec![
            MarkupEvent::CloseElementStart {
                name: name.to_string(),
                location: loc(),
            },
            MarkupEvent::CloseElementEnd {
                name: name.to_string(),
                location: loc(),
            },
        ]
    }

    fn text(content: &str) -> Vec<MarkupEvent> {
        vec![MarkupEvent::Text {
            content: content.to_string(),
            location: loc(),
        }]
    }

    fn standalone(name: &str) -> Vec<MarkupEvent> {
        vec![
            MarkupEvent::StandaloneElementStart {
                name: name.to_string(),
                attributes: vec![],
                location: loc(),
            },
            MarkupEvent::StandaloneElementEnd {
                name: name.to_string(),
                location: loc(),
            },
        ]
    }

    fn run(selector: &str, events: Vec<MarkupEvent>) -> Vec<String> {
        let mut handler = BlockSelector::new(selector, true, EventCollector::new()).unwrap();
        for event in events {
            handler.handle(event);
        }
        handler.into_downstream().summary()
    }

    fn document(body: Vec<Vec<MarkupEvent>>) -> Vec<MarkupEvent> {
        let mut events = vec![MarkupEvent::DocumentStart];
        events.extend(body.into_iter().flatten());
        events.push(MarkupEvent::DocumentEnd);
        events
    }

    #[test]
    fn test_nested_any_level_selection() {
        // <div><p>A</p><div><p>B</p></div></div> with //div/p: both <p>
        // blocks are included, at depth 1 and depth 2.
        let events = document(vec![
            open("div"),
            open("p"),
            text("A"),
            close("p"),
            open("div"),
            open("p"),
            text("B"),
            close("p"),
            close("div"),
            close("div"),
        ]);
        assert_eq!(
            run("//div/p", events),
            vec![
                "document-start",
                "open-start(p)",
                "open-end(p)",
                "text(A)",
                "close-start(p)",
                "close-end(p)",
                "open-start(p)",
                "open-end(p)",
                "text(B)",
                "close-start(p)",
                "close-end(p)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_indexed_sibling_selection() {
        // Three sibling <h2> blocks at depth 0: /h2[2] keeps only the
        // second, closing tag included.
        let events = document(vec![
            open("h2"),
            text("one"),
            close("h2"),
            open("h2"),
            text("two"),
            close("h2"),
            open("h2"),
            text("three"),
            close("h2"),
        ]);
        assert_eq!(
            run("/h2[2]", events),
            vec![
                "document-start",
                "open-start(h2)",
                "open-end(h2)",
                "text(two)",
                "close-start(h2)",
                "close-end(h2)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_whole_subtree_is_forwarded() {
        // Everything inside the matched block is forwarded, including
        // nested elements the selector says nothing about.
        let events = document(vec![
            open("article"),
            open("aside"),
            text("x"),
            close("aside"),
            close("article"),
            open("footer"),
            text("y"),
            close("footer"),
        ]);
        assert_eq!(
            run("//article", events),
            vec![
                "document-start",
                "open-start(article)",
                "open-end(article)",
                "open-start(aside)",
                "open-end(aside)",
                "text(x)",
                "close-start(aside)",
                "close-end(aside)",
                "close-start(article)",
                "close-end(article)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_attribute_predicate_selects_by_value() {
        let events = document(vec![
            open_with("div", vec![Attribute::new("class", "keep")]),
            text("in"),
            close("div"),
            open_with("div", vec![Attribute::new("class", "drop")]),
            text("out"),
            close("div"),
        ]);
        assert_eq!(
            run("//div[@class='keep']", events),
            vec![
                "document-start",
                "open-start(div)",
                "open-end(div)",
                "text(in)",
                "close-start(div)",
                "close-end(div)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_standalone_block_selection() {
        let events = document(vec![
            open("p"),
            standalone("img"),
            close("p"),
            standalone("img"),
        ]);
        // //img selects both standalone elements, each a single-event block.
        assert_eq!(
            run("//img", events),
            vec![
                "document-start",
                "standalone-start(img)",
                "standalone-end(img)",
                "standalone-start(img)",
                "standalone-end(img)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_text_node_selection() {
        let events = document(vec![
            text("outside"),
            open("div"),
            text("inside"),
            open("span"),
            text("deeper"),
            close("span"),
            close("div"),
        ]);
        assert_eq!(
            run("//div/text()", events),
            vec!["document-start", "text(inside)", "document-end"]
        );
    }

    #[test]
    fn test_declarations_are_suppressed_outside_blocks() {
        let events = vec![
            MarkupEvent::DocumentStart,
            MarkupEvent::XmlDeclaration {
                version: "1.0".to_string(),
                encoding: None,
                standalone: None,
                location: loc(),
            },
            MarkupEvent::DocType {
                content: "html".to_string(),
                location: loc(),
            },
        ]
        .into_iter()
        .chain(open("div"))
        .chain(text("x"))
        .chain(close("div"))
        .chain(std::iter::once(MarkupEvent::DocumentEnd))
        .collect();
        assert_eq!(
            run("//div", events),
            vec![
                "document-start",
                "open-start(div)",
                "open-end(div)",
                "text(x)",
                "close-start(div)",
                "close-end(div)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_comments_inside_block_are_forwarded() {
        let events = document(vec![
            vec![MarkupEvent::Comment {
                content: "outside".to_string(),
                location: loc(),
            }],
            open("div"),
            vec![MarkupEvent::Comment {
                content: "inside".to_string(),
                location: loc(),
            }],
            close("div"),
        ]);
        assert_eq!(
            run("//div", events),
            vec![
                "document-start",
                "open-start(div)",
                "open-end(div)",
                "comment",
                "close-start(div)",
                "close-end(div)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_buffered_delivery_resumes_mid_block() {
        // The external parser may pause between buffers; filter state must
        // survive the boundary, even mid-block.
        let mut handler = BlockSelector::new("//div/p", true, EventCollector::new()).unwrap();
        let events = document(vec![
            open("div"),
            open("p"),
            text("A"),
            close("p"),
            close("div"),
        ]);
        let (first, second) = events.split_at(5);
        for event in first.iter().cloned() {
            handler.handle(event);
        }
        assert!(handler.is_matching());
        for event in second.iter().cloned() {
            handler.handle(event);
        }
        assert_eq!(
            handler.into_downstream().summary(),
            vec![
                "document-start",
                "open-start(p)",
                "open-end(p)",
                "text(A)",
                "close-start(p)",
                "close-end(p)",
                "document-end",
            ]
        );
    }

    #[test]
    fn test_rejects_malformed_selector_up_front() {
        assert!(BlockSelector::new("///x", true, EventCollector::new()).is_err());
    }

    #[test]
    #[should_panic(expected = "unbalanced")]
    fn test_unbalanced_close_event_panics() {
        let mut handler = BlockSelector::new("//div", true, EventCollector::new()).unwrap();
        handler.handle(MarkupEvent::CloseElementStart {
            name: "div".to_string(),
            location: loc(),
        });
    }
}
