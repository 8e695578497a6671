//! XML parameter substitution.
//!
//! Rewrites parameter files such as:
//!
//! ```xml
//! <root>
//!   <workflow name="Customer_Workflow">
//!     <parameter name="TEST_PARAM">100</parameter>
//!   </workflow>
//! </root>
//! ```
//!
//! With `transformer.parameter.TEST_PARAM=VALUE` configured, the text of every
//! `parameter` element named `TEST_PARAM` becomes `VALUE`.

use crate::config::{Configurable, Configuration};
use crate::error::Result;
use crate::transformer::ContentTransformer;
use log::debug;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{PoisonError, RwLock};
use xml::attribute::Attribute;
use xml::common::XmlVersion;
use xml::name::Name;
use xml::namespace::Namespace;
use xml::writer::{EventWriter, XmlEvent};
use xmltree::{Element, EmitterConfig, XMLNode};

/// Tag of the elements whose text is substituted.
pub const PARAMETER_TAG_NAME: &str = "parameter";

/// Attribute holding the parameter name.
pub const PARAMETER_NAME_ATTR: &str = "name";

/// Encoding named in the declaration of every written document.
pub const OUTPUT_ENCODING: &str = "UTF-8";

/// Configuration prefix for parameter values.
pub const PARAMETER_PREFIX: &str = "transformer.parameter.";

/// Replaces the text content of `parameter` elements by name.
///
/// The parameter map is filled by [`Configurable::configure`], which only adds
/// or overwrites entries, so several configuration sources can be applied one
/// after another.
#[derive(Debug, Default)]
pub struct DefaultParameterSubstitutionTransformer {
    parameters: RwLock<HashMap<String, String>>,
}

impl DefaultParameterSubstitutionTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transformer with a fixed set of parameters.
    pub fn with_parameters<I, K, V>(parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let parameters = parameters.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { parameters: RwLock::new(parameters) }
    }

    /// Snapshot of the configured parameters.
    pub fn parameters(&self) -> HashMap<String, String> {
        self.parameters.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Applies the configured parameters to a parsed document and returns how
    /// many elements were rewritten.
    pub fn substitute(&self, root: &mut Element) -> usize {
        let parameters = self.parameters.read().unwrap_or_else(PoisonError::into_inner);
        let mut replaced = 0;
        for (name, value) in parameters.iter() {
            replaced += replace_parameter(root, name, value);
        }
        replaced
    }
}

impl Configurable for DefaultParameterSubstitutionTransformer {
    fn configure(&self, conf: &Configuration) -> Result<()> {
        let mut parameters = self.parameters.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in conf.with_prefix(PARAMETER_PREFIX) {
            debug!("Will apply value '{value}' on parameter '{name}'");
            parameters.insert(name.to_string(), value.to_string());
        }
        Ok(())
    }
}

impl ContentTransformer for DefaultParameterSubstitutionTransformer {
    /// Parses `input` as XML, substitutes parameters and writes the indented
    /// document to `output`. Comments and processing instructions around the
    /// root element are kept.
    ///
    /// Nothing is written to `output` unless the whole document was parsed
    /// and serialized.
    fn apply(&self, input: &mut dyn Read, output: &mut dyn Write) -> Result<()> {
        let mut nodes = Element::parse_all(input)?;

        let mut replaced = 0;
        for node in nodes.iter_mut() {
            if let XMLNode::Element(root) = node {
                replaced += self.substitute(root);
            }
        }
        debug!("Substituted {replaced} parameter element(s)");

        let mut buffer = Vec::new();
        write_document(&nodes, &mut buffer)?;

        output.write_all(&buffer)?;
        output.flush()?;
        Ok(())
    }
}

/// Writes the declaration and every top-level node through one indenting
/// writer.
fn write_document<W: Write>(nodes: &[XMLNode], sink: W) -> Result<()> {
    let config = EmitterConfig::new().perform_indent(true).write_document_declaration(false);
    let mut writer = EventWriter::new_with_config(sink, config);

    writer.write(XmlEvent::StartDocument {
        version: XmlVersion::Version10,
        encoding: Some(OUTPUT_ENCODING),
        standalone: None,
    })?;
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    Ok(())
}

fn write_node<W: Write>(writer: &mut EventWriter<W>, node: &XMLNode) -> Result<()> {
    match node {
        XMLNode::Element(element) => write_element(writer, element)?,
        XMLNode::Text(text) => writer.write(XmlEvent::Characters(text))?,
        XMLNode::CData(data) => writer.write(XmlEvent::CData(data))?,
        XMLNode::Comment(comment) => writer.write(XmlEvent::Comment(comment))?,
        XMLNode::ProcessingInstruction(name, data) => {
            writer.write(XmlEvent::ProcessingInstruction { name, data: data.as_deref() })?
        }
    }
    Ok(())
}

fn write_element<W: Write>(writer: &mut EventWriter<W>, element: &Element) -> Result<()> {
    let mut name = Name::local(&element.name);
    name.namespace = element.namespace.as_deref();
    name.prefix = element.prefix.as_deref();

    let attributes: Vec<Attribute> = element
        .attributes
        .iter()
        .map(|(key, value)| Attribute { name: Name::local(key), value })
        .collect();

    let empty = Namespace::empty();
    let namespace = element.namespaces.as_ref().unwrap_or(&empty);

    writer.write(XmlEvent::StartElement {
        name,
        attributes: Cow::Owned(attributes),
        namespace: Cow::Borrowed(namespace),
    })?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write(XmlEvent::EndElement { name: Some(name) })?;
    Ok(())
}

fn is_parameter_named(element: &Element, name: &str) -> bool {
    element.prefix.is_none()
        && element.name == PARAMETER_TAG_NAME
        && element.attributes.get(PARAMETER_NAME_ATTR).map(String::as_str) == Some(name)
}

/// Rewrites every matching element below and including `element`, in
/// document order.
fn replace_parameter(element: &mut Element, name: &str, value: &str) -> usize {
    if is_parameter_named(element, name) {
        set_text_content(element, value);
        return 1;
    }

    element
        .children
        .iter_mut()
        .filter_map(|child| match child {
            XMLNode::Element(child) => Some(replace_parameter(child, name, value)),
            _ => None,
        })
        .sum()
}

fn set_text_content(element: &mut Element, value: &str) {
    element.children.clear();
    if !value.is_empty() {
        element.children.push(XMLNode::Text(value.to_string()));
    }
}
