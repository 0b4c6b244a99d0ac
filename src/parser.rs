mod loader;
mod models;
mod writer;
mod xml_parser;

pub use self::{
    loader::{build_tree_from_xml, load_document, verify_document, TreeDocument},
    models::{collect_models_from_document, parse_custom_model},
    writer::{
        canonicalize, document_to_element, models_to_element, scene_to_element, tree_to_element,
        write_document, write_element, XmlWriter,
    },
    xml_parser::{parse_document, Element},
};
