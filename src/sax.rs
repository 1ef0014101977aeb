//! SAX collaborator traits: the push-parsing interfaces this crate
//! consumes (spec.md §6: "the core declares and consumes these interfaces;
//! supplying a conforming XML parser is out of scope").
//!
//! Grounded on the `sax2_traits` file in the retrieval pack's
//! `other_examples/`: a `ContentHandler` at the center, with `Locator`,
//! `Attributes`, `LexicalHandler`, `ErrorHandler` and `EntityResolver` as
//! satellite traits a producer may or may not populate. Simplified here to
//! the subset [`crate::trigger`] and [`crate::document::Document::to_sax`]
//! actually drive; full DTD/entity plumbing is a declared Non-goal
//! (spec.md §9).

use crate::error::Result;

/// A single attribute as seen by [`ContentHandler::start_element`].
pub trait Attributes {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn local_name(&self, index: usize) -> Option<&str>;
    fn value(&self, index: usize) -> Option<&str>;
    fn value_by_name(&self, name: &str) -> Option<&str> {
        (0..self.len()).find_map(|i| {
            if self.local_name(i) == Some(name) {
                self.value(i)
            } else {
                None
            }
        })
    }
}

/// A minimal attribute list backing a single parse event, used by
/// [`crate::trigger::TriggerFilter`] and tests that don't need a full
/// parser.
#[derive(Debug, Default, Clone)]
pub struct SimpleAttributes {
    pairs: Vec<(String, String)>,
}

impl SimpleAttributes {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl Attributes for SimpleAttributes {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn local_name(&self, index: usize) -> Option<&str> {
        self.pairs.get(index).map(|(name, _)| name.as_str())
    }

    fn value(&self, index: usize) -> Option<&str> {
        self.pairs.get(index).map(|(_, value)| value.as_str())
    }
}

/// Document position of the event currently being reported, as a SAX
/// parser would supply via `setDocumentLocator`.
pub trait Locator {
    fn line_number(&self) -> Option<u64>;
    fn column_number(&self) -> Option<u64>;
    fn system_id(&self) -> Option<&str>;
}

/// The core push-parsing callback surface (spec.md §6.1).
pub trait ContentHandler {
    fn set_document_locator(&mut self, _locator: &dyn Locator) {}

    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_element(&mut self, qualified_name: &str, attributes: &dyn Attributes) -> Result<()>;

    fn end_element(&mut self, qualified_name: &str) -> Result<()>;

    fn characters(&mut self, text: &str) -> Result<()>;

    fn ignorable_whitespace(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn processing_instruction(&mut self, _target: &str, _data: &str) -> Result<()> {
        Ok(())
    }

    fn start_prefix_mapping(&mut self, _prefix: &str, _uri: &str) -> Result<()> {
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<()> {
        Ok(())
    }

    fn skipped_entity(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Reports comments and CDATA boundaries, declared alongside
/// `ContentHandler` the way the `sax2_traits` source splits "lexical" from
/// "content" events. No default-implementing producer exists in this
/// crate; it is here so a future ingest path has somewhere to plug in.
pub trait LexicalHandler {
    fn comment(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn start_cdata(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_cdata(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Parse error reporting, split by severity per the SAX convention.
pub trait ErrorHandler {
    fn warning(&mut self, message: &str) -> Result<()>;
    fn error(&mut self, message: &str) -> Result<()>;
    fn fatal_error(&mut self, message: &str) -> Result<()>;
}

/// External entity resolution; declared only (spec.md §9 Non-goal: "DTD
/// and external entity processing").
pub trait EntityResolver {
    fn resolve_entity(&mut self, public_id: Option<&str>, system_id: &str) -> Result<Option<String>>;
}

/// DTD declaration callbacks; declared only for the same reason as
/// [`EntityResolver`].
pub trait DtdHandler {
    fn notation_decl(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()>;
    fn unparsed_entity_decl(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: &str,
        notation_name: &str,
    ) -> Result<()>;
}
