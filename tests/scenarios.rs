//! Integration tests reproducing the literal worked scenarios in spec.md
//! §8, end to end through the public crate API (as opposed to the
//! module-internal unit tests, which check each component in isolation).

use xml_gid_store::document::{Document, DocumentMetadata, InMemoryBroker};
use xml_gid_store::error::Result;
use xml_gid_store::gid::{Gid, OrderTable};
use xml_gid_store::node::{DomRead, NodeFields};
use xml_gid_store::sax::{Attributes, ContentHandler, SimpleAttributes};
use xml_gid_store::trigger::{Extraction, Predicate, TriggerConfig, TriggerFilter};
use xml_gid_store::QName;

/// A downstream handler that records every re-emitted element and text
/// event, reconstructed here (rather than imported) since it is test-only
/// scaffolding, not part of the crate's public API.
#[derive(Default)]
struct RecordingHandler {
    events: Vec<String>,
}

impl ContentHandler for RecordingHandler {
    fn start_element(&mut self, qualified_name: &str, _attributes: &dyn Attributes) -> Result<()> {
        self.events.push(format!("start:{qualified_name}"));
        Ok(())
    }

    fn end_element(&mut self, qualified_name: &str) -> Result<()> {
        self.events.push(format!("end:{qualified_name}"));
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        self.events.push(format!("chars:{text}"));
        Ok(())
    }
}

/// Scenario 1: order `[2, 2, 2]`, GID 3's parent is 1, it has no next
/// sibling, and its previous sibling is GID 2.
#[test]
fn scenario_1_gid_arithmetic() {
    let table = OrderTable::new(vec![2, 2, 2]).unwrap();
    let g = Gid(3);
    assert_eq!(table.parent(g).unwrap(), Gid(1));
    assert_eq!(table.next_sibling(g).unwrap(), Gid::NONE);
    assert_eq!(table.previous_sibling(g).unwrap(), Gid(2));
}

/// Scenario 2: a text node carrying `"hello"` serializes to the exact byte
/// sequence `0x30 0x05 'h' 'e' 'l' 'l' 'o'`.
#[test]
fn scenario_2_text_node_byte_layout() {
    let bytes = xml_gid_store::codec::serialize(&NodeFields::Text {
        value: "hello".to_string(),
    });
    assert_eq!(bytes, vec![0x30, 0x05, b'h', b'e', b'l', b'l', b'o']);
}

/// Scenario 3: a trigger configured over `feed/rows/row`, gated on the
/// `type eq "product_model"` predicate, rewrites a matched row's CSV text
/// into reordered, named child elements.
#[test]
fn scenario_3_csv_trigger_extraction() {
    let config = TriggerConfig::new(
        "feed/rows/row",
        ";",
        Some(Predicate {
            key: "type".to_string(),
            value: "product_model".to_string(),
        }),
        vec![
            Extraction {
                source_column: 0,
                output_index: 1,
                element_name: "product_name".to_string(),
            },
            Extraction {
                source_column: 2,
                output_index: 0,
                element_name: "product_code".to_string(),
            },
        ],
    )
    .unwrap();
    let mut downstream = RecordingHandler::default();
    let mut filter = TriggerFilter::new(&config, &mut downstream);

    let matching_row = SimpleAttributes::new(vec![("type".to_string(), "product_model".to_string())]);

    filter.start_document().unwrap();
    filter.start_element("feed", &SimpleAttributes::default()).unwrap();
    filter.start_element("rows", &SimpleAttributes::default()).unwrap();

    filter.start_element("row", &matching_row).unwrap();
    filter.characters("alpha;beta;gamma").unwrap();
    filter.end_element("row").unwrap();

    filter.end_element("rows").unwrap();
    filter.end_element("feed").unwrap();
    filter.end_document().unwrap();

    assert_eq!(
        downstream.events,
        vec![
            "start:feed".to_string(),
            "start:rows".to_string(),
            "start:row".to_string(),
            "start:product_code".to_string(),
            "chars:gamma".to_string(),
            "end:product_code".to_string(),
            "start:product_name".to_string(),
            "chars:alpha".to_string(),
            "end:product_name".to_string(),
            "end:row".to_string(),
            "end:rows".to_string(),
            "end:feed".to_string(),
        ]
    );
}

/// Scenario 4: the same trigger leaves a row's text untouched when its
/// attributes don't satisfy the configured predicate.
#[test]
fn scenario_4_predicate_mismatch_passes_through_unchanged() {
    let config = TriggerConfig::new(
        "feed/rows/row",
        ";",
        Some(Predicate {
            key: "type".to_string(),
            value: "product_model".to_string(),
        }),
        vec![Extraction {
            source_column: 0,
            output_index: 0,
            element_name: "product_name".to_string(),
        }],
    )
    .unwrap();
    let mut downstream = RecordingHandler::default();
    let mut filter = TriggerFilter::new(&config, &mut downstream);

    let other_row = SimpleAttributes::new(vec![("type".to_string(), "warehouse".to_string())]);

    filter.start_element("feed", &SimpleAttributes::default()).unwrap();
    filter.start_element("rows", &SimpleAttributes::default()).unwrap();
    filter.start_element("row", &other_row).unwrap();
    filter.characters("alpha;beta;gamma").unwrap();
    filter.end_element("row").unwrap();
    filter.end_element("rows").unwrap();
    filter.end_element("feed").unwrap();

    assert_eq!(
        downstream.events,
        vec![
            "start:feed".to_string(),
            "start:rows".to_string(),
            "start:row".to_string(),
            "chars:alpha;beta;gamma".to_string(),
            "end:row".to_string(),
            "end:rows".to_string(),
            "end:feed".to_string(),
        ]
    );
}

/// Scenario 6: `getPath()` returns the `/`-joined sequence of ancestor
/// local names from the document root down to a node.
#[test]
fn scenario_6_get_path() {
    let metadata = DocumentMetadata {
        id: "scenario-6".to_string(),
        collection_path: "/db/scenario-6".to_string(),
        order: vec![2, 2],
    };
    let document = Document::new(metadata, Box::new(InMemoryBroker::new())).unwrap();

    let root_name = document.intern(&QName::local("root"));
    document
        .put_node(
            Gid(1),
            NodeFields::Element {
                name_ref: root_name,
                attribute_count: 0,
                child_count: 2,
            },
        )
        .unwrap();
    let child_name = document.intern(&QName::local("child"));
    document
        .put_node(
            Gid(2),
            NodeFields::Element {
                name_ref: child_name,
                attribute_count: 0,
                child_count: 2,
            },
        )
        .unwrap();
    let grandchild_name = document.intern(&QName::local("grandchild"));
    document
        .put_node(
            Gid(4),
            NodeFields::Element {
                name_ref: grandchild_name,
                attribute_count: 0,
                child_count: 0,
            },
        )
        .unwrap();

    assert_eq!(document.get_path(Gid(1)).unwrap(), "/root");
    assert_eq!(document.get_path(Gid(2)).unwrap(), "/root/child");
    let node = document.get_node(Gid(2)).unwrap();
    assert_eq!(DomRead::node_type(&node), 1);
    // Gid(4) is the first child of Gid(2) (root's first child).
    assert_eq!(document.get_path(Gid(4)).unwrap(), "/root/child/grandchild");
}
